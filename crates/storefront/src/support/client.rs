//! Customer side of a live-support session.
//!
//! The client pushes a `waiting` session record, listens to it, and moves the
//! view from the bot prelude to live chat when an admin claims it. Liveness is
//! tracked locally: once a session is seen `closed` (or vanishes) nothing more
//! is written and later deliveries are ignored.

use chrono::Utc;
use icyxr_core::models::{ChatMessage, ChatSession, MessageText, NewChatSession};
use icyxr_core::ordering::ordered_messages;
use icyxr_core::store::path::{chat_messages, chat_session, live_support_chats};
use icyxr_core::{
    MessageKey, RealtimeStore, SessionId, SessionStatus, StoreError, StorePath, Subscription,
    SupportError, UserId,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::view::{CONNECTED, CONNECTING, ENDED_BY_ADMIN, GREETING, OFFER_REPRESENTATIVE, SupportView};

/// The session this client created and is still attached to.
struct LiveSession {
    id: SessionId,
    path: StorePath,
    customer_id: UserId,
    display_name: String,
    status: SessionStatus,
    connected_shown: bool,
    subscription: Option<Subscription<Option<Value>>>,
}

impl LiveSession {
    fn detach(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.stop();
        }
    }
}

/// Drives one customer's support chat against the store and a view.
pub struct SupportClient<S, V> {
    store: S,
    view: V,
    live: Option<LiveSession>,
}

impl<S: RealtimeStore, V: SupportView> SupportClient<S, V> {
    /// Create a client with no session.
    pub const fn new(store: S, view: V) -> Self {
        Self {
            store,
            view,
            live: None,
        }
    }

    /// Show the bot greeting and the offer to talk to a person.
    pub fn open(&mut self) {
        self.view.show_bot_message(GREETING);
        self.view.show_bot_message(OFFER_REPRESENTATIVE);
    }

    /// Ask for a person: create a `waiting` session and start listening to it.
    ///
    /// Any session this client was attached to is closed locally first.
    ///
    /// # Errors
    ///
    /// Returns `SupportError::StoreUnavailable` if the record cannot be
    /// created or listened to. Nothing is retried; the view goes back to the
    /// bot prelude and a record nobody listens to is removed.
    #[instrument(skip(self, customer_id, display_name, contact), fields(customer_id = %customer_id))]
    pub async fn request_session(
        &mut self,
        customer_id: UserId,
        display_name: &str,
        contact: &str,
    ) -> Result<SessionId, SupportError> {
        if self.live.is_some() {
            self.close_local_session();
        }

        self.view.show_bot_message(CONNECTING);
        self.view.show_waiting();

        let chats = live_support_chats();
        let request = NewChatSession {
            customer_id: customer_id.clone(),
            customer_display_name: display_name.to_owned(),
            customer_contact: contact.to_owned(),
            created_at: Utc::now(),
        };
        let key = match self.store.push(&chats, request.to_value(&chats)?).await {
            Ok(key) => key,
            Err(e) => {
                self.back_to_prelude();
                return Err(e.into());
            }
        };
        let id = SessionId::new(key);
        let path = chat_session(&id)?;
        let subscription = match self.store.subscribe_value(&path).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(session_id = %id, error = %e, "cannot listen to new session; withdrawing it");
                if let Err(remove_error) = self.store.remove(&path).await {
                    warn!(session_id = %id, error = %remove_error, "orphaned waiting session left in store");
                }
                self.back_to_prelude();
                return Err(e.into());
            }
        };

        info!(session_id = %id, "support session requested");
        self.live = Some(LiveSession {
            id: id.clone(),
            path,
            customer_id,
            display_name: display_name.to_owned(),
            status: SessionStatus::Waiting,
            connected_shown: false,
            subscription: Some(subscription),
        });
        Ok(id)
    }

    /// Undo the waiting prelude so the customer can ask again.
    fn back_to_prelude(&mut self) {
        self.view.reset();
        self.open();
    }

    /// Append a message to the live session.
    ///
    /// # Errors
    ///
    /// - `SupportError::EmptyMessage` if the text is blank (checked first;
    ///   nothing reaches the store)
    /// - `SupportError::NoActiveSession` if there is no session, `session_id`
    ///   is not it, or it is not `active`
    /// - `SupportError::StoreUnavailable` if the append fails
    #[instrument(skip(self, session_id, text), fields(session_id = %session_id))]
    pub async fn send_message(
        &self,
        session_id: &SessionId,
        text: &str,
    ) -> Result<MessageKey, SupportError> {
        let text = MessageText::parse(text)?;
        let live = self
            .live
            .as_ref()
            .filter(|live| &live.id == session_id && live.status == SessionStatus::Active)
            .ok_or(SupportError::NoActiveSession)?;

        let message = ChatMessage::new(
            live.customer_id.clone(),
            live.display_name.clone(),
            text,
            Utc::now(),
        );
        let messages = chat_messages(&live.id)?;
        let key = self
            .store
            .push(&messages, message.to_value(&messages)?)
            .await?;
        debug!(key = %key, "message sent");
        Ok(MessageKey::new(key))
    }

    /// Apply a snapshot of the session record.
    ///
    /// `None` means the record disappeared, which is treated as `closed`.
    /// Snapshots for other sessions, and anything arriving after the session
    /// ended or was closed locally, are ignored.
    pub fn on_session_update(&mut self, snapshot: Option<ChatSession>) {
        let Some(live) = self.live.as_mut() else {
            debug!("session update after teardown ignored");
            return;
        };
        if live.status.is_terminal() {
            debug!(session_id = %live.id, "session update after close ignored");
            return;
        }

        let Some(session) = snapshot else {
            info!(session_id = %live.id, "session record removed");
            live.status = SessionStatus::Closed;
            live.detach();
            self.view.show_bot_message(ENDED_BY_ADMIN);
            self.view.show_ended();
            return;
        };
        if session.id != live.id {
            return;
        }

        if session.status.is_terminal() || live.status.can_transition_to(session.status) {
            live.status = session.status;
        } else if session.status != live.status {
            warn!(
                session_id = %live.id,
                from = %live.status,
                to = %session.status,
                "ignoring backwards status change"
            );
        }

        if live.status == SessionStatus::Active && !live.connected_shown {
            live.connected_shown = true;
            self.view.show_connected();
            self.view.show_bot_message(CONNECTED);
        }

        if !session.messages.is_empty() {
            self.view
                .render_messages(&ordered_messages(&session.messages, &live.customer_id));
        }

        if live.status == SessionStatus::Closed {
            info!(session_id = %live.id, "support session ended");
            live.detach();
            self.view.show_bot_message(ENDED_BY_ADMIN);
            self.view.show_ended();
        }
    }

    /// Wait for the next snapshot of the session and apply it.
    ///
    /// Returns `Ok(false)` without waiting when nothing is being listened to.
    ///
    /// # Errors
    ///
    /// Returns `SupportError::StoreUnavailable` when the snapshot is malformed
    /// (it is not applied) or the listener ended on the store side.
    pub async fn next_update(&mut self) -> Result<bool, SupportError> {
        let Some(live) = self.live.as_mut() else {
            return Ok(false);
        };
        let Some(subscription) = live.subscription.as_mut() else {
            return Ok(false);
        };

        let next = subscription.next().await;
        match next {
            Some(snapshot) => {
                let session = snapshot
                    .map(|value| ChatSession::from_value(live.id.clone(), &live.path, value))
                    .transpose()?;
                self.on_session_update(session);
                Ok(true)
            }
            None => {
                live.subscription = None;
                Err(StoreError::Unavailable(format!("listener on {} ended", live.path)).into())
            }
        }
    }

    /// Detach from the session and clear the view. Writes nothing.
    pub fn close_local_session(&mut self) {
        if let Some(mut live) = self.live.take() {
            debug!(session_id = %live.id, "closing support session locally");
            live.detach();
        }
        self.view.reset();
    }

    /// ID of the attached session.
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.live.as_ref().map(|live| &live.id)
    }

    /// Last status observed for the attached session.
    #[must_use]
    pub fn status(&self) -> Option<SessionStatus> {
        self.live.as_ref().map(|live| live.status)
    }

    /// Whether the customer may type: the session is `active`.
    #[must_use]
    pub fn input_enabled(&self) -> bool {
        self.status() == Some(SessionStatus::Active)
    }

    /// Whether a listener is still attached.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.live
            .as_ref()
            .is_some_and(|live| live.subscription.is_some())
    }

    /// The view being driven.
    pub const fn view(&self) -> &V {
        &self.view
    }

    /// Mutable access to the view.
    pub const fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }
}
