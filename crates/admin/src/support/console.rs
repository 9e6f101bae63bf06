//! Admin side of a live-support session.
//!
//! The console watches the waiting list, claims one session at a time and
//! chats in it until the admin ends it. A claim is one compare-and-set of the
//! whole session record from its `waiting` snapshot to the same record with
//! `status: active` and `adminId`, so two admins accepting the same session
//! cannot both win and no reader sees `active` without an admin.

use chrono::Utc;
use icyxr_core::models::{
    ADMIN_DISPLAY_NAME, ChatMessage, ChatSession, MessageText, decode_sessions,
};
use icyxr_core::ordering::ordered_messages;
use icyxr_core::store::path::{chat_messages, chat_session, chat_status, live_support_chats};
use icyxr_core::{
    MessageKey, Query, RealtimeStore, SessionId, SessionStatus, StoreError, StorePath,
    Subscription, SupportError, UserId,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::view::ConsoleView;

/// Live list of sessions with `status == waiting`, oldest first.
///
/// Stops for good once [`WaitingSessions::stop`] is called or the listener
/// ends; subscribe again to restart.
pub struct WaitingSessions {
    subscription: Subscription<Option<Value>>,
}

impl WaitingSessions {
    /// Wait for the next version of the list.
    ///
    /// Returns `None` once the listener has ended. Malformed waiting records
    /// are logged and left out.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` when the snapshot is not a collection.
    pub async fn next(&mut self) -> Option<Result<Vec<ChatSession>, StoreError>> {
        let snapshot = self.subscription.next().await?;
        Some(decode_sessions(&live_support_chats(), snapshot).map(|decoded| {
            for error in &decoded.rejected {
                warn!(error = %error, "skipping malformed waiting session");
            }
            decoded.sessions
        }))
    }

    /// Stop listening.
    pub fn stop(&mut self) {
        self.subscription.stop();
    }
}

/// The session this console claimed and is chatting in.
struct ClaimedSession {
    id: SessionId,
    path: StorePath,
    status: SessionStatus,
    subscription: Option<Subscription<Option<Value>>>,
}

impl ClaimedSession {
    fn detach(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.stop();
        }
    }
}

/// Drives one admin's support work against the store and a view.
pub struct SupportConsole<S, V> {
    store: S,
    view: V,
    admin_id: UserId,
    claimed: Option<ClaimedSession>,
}

impl<S: RealtimeStore, V: ConsoleView> SupportConsole<S, V> {
    /// Create a console for `admin_id` with no claimed session.
    pub const fn new(store: S, view: V, admin_id: UserId) -> Self {
        Self {
            store,
            view,
            admin_id,
            claimed: None,
        }
    }

    /// Listen to the waiting list.
    ///
    /// # Errors
    ///
    /// Returns `SupportError::StoreUnavailable` if the listener cannot be
    /// attached.
    pub async fn subscribe_waiting_sessions(&self) -> Result<WaitingSessions, SupportError> {
        let subscription = self
            .store
            .subscribe_query(
                &live_support_chats(),
                Query::child_equals("status", SessionStatus::Waiting.as_str()),
            )
            .await?;
        Ok(WaitingSessions { subscription })
    }

    /// Show a version of the waiting list.
    pub fn on_waiting_list(&mut self, sessions: &[ChatSession]) {
        self.view.show_waiting_list(sessions);
    }

    /// Claim a waiting session and start listening to it.
    ///
    /// A session this console already holds is detached first (not ended).
    ///
    /// # Errors
    ///
    /// - `SupportError::NotFound` if the record is gone
    /// - `SupportError::SessionNoLongerAvailable` if it is not `waiting`, or
    ///   another admin claimed it first
    /// - `SupportError::StoreUnavailable` if a read or write fails; a claim
    ///   that cannot be listened to is released back to `waiting`
    #[instrument(skip(self, session_id), fields(session_id = %session_id, admin_id = %self.admin_id))]
    pub async fn accept_session(&mut self, session_id: &SessionId) -> Result<ChatSession, SupportError> {
        let path = chat_session(session_id)?;
        let value = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| SupportError::NotFound(session_id.clone()))?;
        let session = ChatSession::from_value(session_id.clone(), &path, value.clone())?;
        if session.status != SessionStatus::Waiting {
            return Err(SupportError::SessionNoLongerAvailable);
        }

        // A waiting record takes no writes, so the snapshot just read is the
        // expected value and status flips together with adminId.
        let Value::Object(mut record) = value.clone() else {
            return Err(StoreError::decode(&path, "expected a session object").into());
        };
        record.insert(
            "status".to_owned(),
            Value::from(SessionStatus::Active.as_str()),
        );
        record.insert("adminId".to_owned(), Value::from(self.admin_id.as_str()));
        let record = Value::Object(record);
        let claimed = self
            .store
            .compare_and_set(&path, Some(value.clone()), record.clone())
            .await?;
        if !claimed {
            info!("session claimed by another admin");
            return Err(SupportError::SessionNoLongerAvailable);
        }

        let subscription = match self.store.subscribe_value(&path).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(error = %e, "cannot listen to claimed session; releasing it");
                match self.store.compare_and_set(&path, Some(record), value).await {
                    Ok(true) => {}
                    Ok(false) => warn!("claimed session changed before release"),
                    Err(release_error) => {
                        warn!(error = %release_error, "claimed session left active");
                    }
                }
                return Err(e.into());
            }
        };
        if let Some(mut previous) = self.claimed.take() {
            previous.detach();
        }

        let session = ChatSession {
            status: SessionStatus::Active,
            admin_id: Some(self.admin_id.clone()),
            ..session
        };
        info!("session accepted");
        self.view.show_session(&session);
        self.claimed = Some(ClaimedSession {
            id: session.id.clone(),
            path,
            status: SessionStatus::Active,
            subscription: Some(subscription),
        });
        Ok(session)
    }

    /// Append an admin message to the claimed session.
    ///
    /// # Errors
    ///
    /// - `SupportError::EmptyMessage` if the text is blank (nothing is written)
    /// - `SupportError::NoActiveSession` unless `session_id` is the claimed,
    ///   still active session
    /// - `SupportError::StoreUnavailable` if the append fails
    #[instrument(skip(self, session_id, text), fields(session_id = %session_id))]
    pub async fn send_admin_message(
        &self,
        session_id: &SessionId,
        text: &str,
    ) -> Result<MessageKey, SupportError> {
        let text = MessageText::parse(text)?;
        let claimed = self
            .claimed
            .as_ref()
            .filter(|claimed| &claimed.id == session_id && claimed.status == SessionStatus::Active)
            .ok_or(SupportError::NoActiveSession)?;

        let message = ChatMessage::new(self.admin_id.clone(), ADMIN_DISPLAY_NAME, text, Utc::now());
        let messages = chat_messages(&claimed.id)?;
        let key = self
            .store
            .push(&messages, message.to_value(&messages)?)
            .await?;
        debug!(key = %key, "admin message sent");
        Ok(MessageKey::new(key))
    }

    /// Close a session: `active → closed`.
    ///
    /// Ending a session that is already closed does nothing. The console
    /// detaches and the view goes back to the waiting list.
    ///
    /// # Errors
    ///
    /// - `SupportError::NotFound` if the record is gone
    /// - `SupportError::InvalidTransition` if the session is still `waiting`
    /// - `SupportError::StoreUnavailable` if a read or write fails
    #[instrument(skip(self, session_id), fields(session_id = %session_id))]
    pub async fn end_session(&mut self, session_id: &SessionId) -> Result<(), SupportError> {
        let status_path = chat_status(session_id)?;
        let mut current = self.read_status(session_id, &status_path).await?;

        if current == SessionStatus::Active {
            let closed = self
                .store
                .compare_and_set(
                    &status_path,
                    Some(Value::from(SessionStatus::Active.as_str())),
                    Value::from(SessionStatus::Closed.as_str()),
                )
                .await?;
            if closed {
                info!("session closed");
                current = SessionStatus::Closed;
            } else {
                current = self.read_status(session_id, &status_path).await?;
            }
        }

        if current != SessionStatus::Closed {
            return Err(SupportError::InvalidTransition {
                from: current,
                to: SessionStatus::Closed,
            });
        }

        if let Some(mut claimed) = self.claimed.take_if(|claimed| &claimed.id == session_id) {
            claimed.detach();
            self.view.show_ended();
        }
        Ok(())
    }

    async fn read_status(
        &self,
        session_id: &SessionId,
        path: &StorePath,
    ) -> Result<SessionStatus, SupportError> {
        let value = self
            .store
            .get(path)
            .await?
            .ok_or_else(|| SupportError::NotFound(session_id.clone()))?;
        serde_json::from_value(value).map_err(|e| StoreError::decode(path, e).into())
    }

    /// Apply a snapshot of the claimed session.
    ///
    /// `None` means the record disappeared, which ends the session locally.
    /// Snapshots for other sessions are ignored.
    pub fn on_session_update(&mut self, snapshot: Option<ChatSession>) {
        let Some(claimed) = self.claimed.as_mut() else {
            debug!("session update after teardown ignored");
            return;
        };

        let Some(session) = snapshot else {
            info!(session_id = %claimed.id, "claimed session removed");
            claimed.detach();
            self.claimed = None;
            self.view.show_ended();
            return;
        };
        if session.id != claimed.id {
            return;
        }
        if session.status != claimed.status && !claimed.status.can_transition_to(session.status) {
            warn!(
                session_id = %claimed.id,
                from = %claimed.status,
                to = %session.status,
                "ignoring backwards status change"
            );
        } else {
            claimed.status = session.status;
        }

        if !session.messages.is_empty() {
            self.view
                .render_messages(&ordered_messages(&session.messages, &self.admin_id));
        }

        if claimed.status.is_terminal() {
            info!(session_id = %claimed.id, "claimed session closed");
            claimed.detach();
            self.claimed = None;
            self.view.show_ended();
        }
    }

    /// Wait for the next snapshot of the claimed session and apply it.
    ///
    /// Returns `Ok(false)` without waiting when nothing is claimed.
    ///
    /// # Errors
    ///
    /// Returns `SupportError::StoreUnavailable` when the snapshot is malformed
    /// or the listener ended on the store side.
    pub async fn next_update(&mut self) -> Result<bool, SupportError> {
        let Some(claimed) = self.claimed.as_mut() else {
            return Ok(false);
        };
        let Some(subscription) = claimed.subscription.as_mut() else {
            return Ok(false);
        };

        let next = subscription.next().await;
        match next {
            Some(snapshot) => {
                let session = snapshot
                    .map(|value| ChatSession::from_value(claimed.id.clone(), &claimed.path, value))
                    .transpose()?;
                self.on_session_update(session);
                Ok(true)
            }
            None => {
                claimed.subscription = None;
                Err(StoreError::Unavailable(format!("listener on {} ended", claimed.path)).into())
            }
        }
    }

    /// The session being chatted in.
    #[must_use]
    pub fn claimed_session(&self) -> Option<&SessionId> {
        self.claimed.as_ref().map(|claimed| &claimed.id)
    }

    /// Whether a claimed session is being listened to.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.claimed
            .as_ref()
            .is_some_and(|claimed| claimed.subscription.is_some())
    }

    /// The acting admin.
    #[must_use]
    pub const fn admin_id(&self) -> &UserId {
        &self.admin_id
    }

    #[must_use]
    pub const fn view(&self) -> &V {
        &self.view
    }

    pub const fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use icyxr_core::models::NewChatSession;
    use icyxr_realtime::{MemoryStore, RecordedWrite, RecordingStore, WriteKind};
    use serde_json::json;

    use super::*;
    use crate::support::view::{ConsoleEvent, RecordingConsoleView};

    async fn waiting_session(store: &MemoryStore, contact: &str) -> SessionId {
        let chats = live_support_chats();
        let request = NewChatSession {
            customer_id: UserId::new("u1"),
            customer_display_name: "Brooke".into(),
            customer_contact: contact.into(),
            created_at: Utc::now(),
        };
        let key = store
            .push(&chats, request.to_value(&chats).unwrap())
            .await
            .unwrap();
        SessionId::new(key)
    }

    fn console(store: &MemoryStore, admin: &str) -> SupportConsole<MemoryStore, RecordingConsoleView> {
        SupportConsole::new(store.clone(), RecordingConsoleView::new(), UserId::new(admin))
    }

    async fn status(store: &MemoryStore, id: &SessionId) -> Option<Value> {
        store.get(&chat_status(id).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_waiting_list_tracks_status() {
        let store = MemoryStore::new();
        let id = waiting_session(&store, "a@x.com").await;
        let mut admin = console(&store, "admin-1");
        let mut waiting = admin.subscribe_waiting_sessions().await.unwrap();

        let list = waiting.next().await.unwrap().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.first().unwrap().customer_contact, "a@x.com");

        admin.accept_session(&id).await.unwrap();
        let list = waiting.next().await.unwrap().unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_waiting_list_skips_malformed_record() {
        let store = MemoryStore::with_data(json!({
            "LiveSupportChats": {
                "-A": { "userId": "x", "userName": "X", "userEmail": "x@x.com", "status": "waiting" }
            }
        }));
        let admin = console(&store, "admin-1");
        let mut waiting = admin.subscribe_waiting_sessions().await.unwrap();
        assert!(waiting.next().await.unwrap().unwrap().is_empty());

        let id = waiting_session(&store, "a@x.com").await;
        let list = waiting.next().await.unwrap().unwrap();
        let ids: Vec<&SessionId> = list.iter().map(|session| &session.id).collect();
        assert_eq!(ids, [&id]);
    }

    #[tokio::test]
    async fn test_accept_writes_status_and_admin() {
        let store = MemoryStore::new();
        let id = waiting_session(&store, "a@x.com").await;
        let mut admin = console(&store, "admin-1");

        let session = admin.accept_session(&id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(status(&store, &id).await, Some(json!("active")));
        let record = store.get(&chat_session(&id).unwrap()).await.unwrap().unwrap();
        assert_eq!(record["adminId"], "admin-1");
        assert_eq!(admin.claimed_session(), Some(&id));
        assert_eq!(admin.view().events(), [ConsoleEvent::Session(id.to_string())]);
    }

    #[tokio::test]
    async fn test_claim_is_one_write_with_admin() {
        let store = RecordingStore::new(MemoryStore::new());
        let id = waiting_session(store.inner(), "a@x.com").await;
        let path = chat_session(&id).unwrap();
        let mut watcher = store.subscribe_value(&path).await.unwrap();
        watcher.next().await.unwrap();

        let mut admin = SupportConsole::new(store.clone(), RecordingConsoleView::new(), UserId::new("admin-1"));
        admin.accept_session(&id).await.unwrap();

        assert_eq!(
            store.writes(),
            [RecordedWrite {
                kind: WriteKind::CompareAndSet,
                path,
            }]
        );
        let seen = watcher.next().await.unwrap().unwrap();
        assert_eq!(seen["status"], "active");
        assert_eq!(seen["adminId"], "admin-1");
        assert_eq!(seen["userEmail"], "a@x.com");
    }

    #[tokio::test]
    async fn test_failed_claim_leaves_session_waiting() {
        let store = MemoryStore::new();
        let id = waiting_session(&store, "a@x.com").await;
        let mut admin = console(&store, "admin-1");

        store.set_read_only(true);
        assert!(matches!(
            admin.accept_session(&id).await,
            Err(SupportError::StoreUnavailable(_))
        ));
        assert_eq!(status(&store, &id).await, Some(json!("waiting")));
        let record = store.get(&chat_session(&id).unwrap()).await.unwrap().unwrap();
        assert!(record.get("adminId").is_none());
        assert!(admin.claimed_session().is_none());

        store.set_read_only(false);
        let mut other = console(&store, "admin-2");
        other.accept_session(&id).await.unwrap();
        assert_eq!(other.claimed_session(), Some(&id));
    }

    #[tokio::test]
    async fn test_second_admin_loses_claim() {
        let store = MemoryStore::new();
        let id = waiting_session(&store, "a@x.com").await;
        let mut first = console(&store, "admin-1");
        let mut second = console(&store, "admin-2");

        first.accept_session(&id).await.unwrap();
        assert_eq!(
            second.accept_session(&id).await,
            Err(SupportError::SessionNoLongerAvailable)
        );
        let record = store.get(&chat_session(&id).unwrap()).await.unwrap().unwrap();
        assert_eq!(record["adminId"], "admin-1");
        assert!(second.claimed_session().is_none());
    }

    #[tokio::test]
    async fn test_accept_missing_session() {
        let store = MemoryStore::new();
        let mut admin = console(&store, "admin-1");
        let id = SessionId::new("-gone");
        assert_eq!(
            admin.accept_session(&id).await,
            Err(SupportError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn test_admin_messages_carry_admin_name() {
        let store = MemoryStore::new();
        let id = waiting_session(&store, "a@x.com").await;
        let mut admin = console(&store, "admin-1");
        admin.accept_session(&id).await.unwrap();

        admin.send_admin_message(&id, "hi").await.unwrap();
        admin.next_update().await.unwrap();
        admin.next_update().await.unwrap();

        let messages = store.get(&chat_messages(&id).unwrap()).await.unwrap().unwrap();
        let message = messages.as_object().unwrap().values().next().unwrap();
        assert_eq!(message["name"], ADMIN_DISPLAY_NAME);
        assert_eq!(message["sender"], "admin-1");
        assert_eq!(admin.view().rendered_texts(), ["hi"]);
    }

    #[tokio::test]
    async fn test_send_requires_claimed_session() {
        let store = MemoryStore::new();
        let id = waiting_session(&store, "a@x.com").await;
        let admin = console(&store, "admin-1");
        assert_eq!(
            admin.send_admin_message(&id, "hi").await,
            Err(SupportError::NoActiveSession)
        );
        assert_eq!(
            admin.send_admin_message(&id, "  ").await,
            Err(SupportError::EmptyMessage)
        );
    }

    #[tokio::test]
    async fn test_end_session() {
        let store = MemoryStore::new();
        let id = waiting_session(&store, "a@x.com").await;
        let mut admin = console(&store, "admin-1");
        admin.accept_session(&id).await.unwrap();

        admin.end_session(&id).await.unwrap();
        assert_eq!(status(&store, &id).await, Some(json!("closed")));
        assert!(admin.claimed_session().is_none());
        assert!(!admin.is_listening());
        assert_eq!(admin.view().ended_count(), 1);

        // Already closed: nothing more happens.
        admin.end_session(&id).await.unwrap();
        assert_eq!(admin.view().ended_count(), 1);
        assert_eq!(
            admin.send_admin_message(&id, "hello?").await,
            Err(SupportError::NoActiveSession)
        );
    }

    #[tokio::test]
    async fn test_end_waiting_session_is_invalid() {
        let store = MemoryStore::new();
        let id = waiting_session(&store, "a@x.com").await;
        let mut admin = console(&store, "admin-1");
        assert_eq!(
            admin.end_session(&id).await,
            Err(SupportError::InvalidTransition {
                from: SessionStatus::Waiting,
                to: SessionStatus::Closed,
            })
        );
        assert_eq!(status(&store, &id).await, Some(json!("waiting")));
    }

    #[tokio::test]
    async fn test_removed_record_ends_claim() {
        let store = MemoryStore::new();
        let id = waiting_session(&store, "a@x.com").await;
        let mut admin = console(&store, "admin-1");
        admin.accept_session(&id).await.unwrap();
        admin.next_update().await.unwrap();

        store.remove(&chat_session(&id).unwrap()).await.unwrap();
        admin.next_update().await.unwrap();
        assert!(admin.claimed_session().is_none());
        assert_eq!(admin.view().ended_count(), 1);
    }
}
