//! Live-support session and message records.
//!
//! Snapshots from the store are decoded here, at the boundary, into typed
//! records. A record that does not decode is reported as
//! [`StoreError::Decode`] and never used.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SupportError;
use crate::store::{StoreError, StorePath};
use crate::types::{MessageKey, SessionId, SessionStatus, UserId};

/// Display name attached to every message an admin sends.
pub const ADMIN_DISPLAY_NAME: &str = "Admin";

/// Message text that is non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageText(String);

impl MessageText {
    /// Trim `text` and reject it if nothing is left.
    ///
    /// # Errors
    ///
    /// Returns `SupportError::EmptyMessage` for empty or whitespace-only text.
    pub fn parse(text: &str) -> Result<Self, SupportError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SupportError::EmptyMessage);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// The trimmed text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One chat line. Append-only: never edited or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Customer ID or the claiming admin's ID.
    #[serde(rename = "sender")]
    pub sender_id: UserId,
    /// Name shown next to the message.
    #[serde(rename = "name")]
    pub sender_display_name: String,
    /// Message body, non-empty after trimming.
    pub text: String,
    /// When the sender created the message.
    #[serde(rename = "timestamp")]
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message from validated text.
    #[must_use]
    pub fn new(
        sender_id: UserId,
        sender_display_name: impl Into<String>,
        text: MessageText,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sender_id,
            sender_display_name: sender_display_name.into(),
            text: text.0,
            sent_at,
        }
    }

    /// Document written to the store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if serialization fails.
    pub fn to_value(&self, path: &StorePath) -> Result<Value, StoreError> {
        serde_json::to_value(self).map_err(|e| StoreError::decode(path, e))
    }
}

/// One customer-support conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    /// Store-assigned key.
    pub id: SessionId,
    /// Signed-in user ID or generated guest ID.
    pub customer_id: UserId,
    /// Name the customer is shown under.
    pub customer_display_name: String,
    /// Email address, or `Guest`.
    pub customer_contact: String,
    /// When the customer asked for a person.
    pub created_at: DateTime<Utc>,
    /// Lifecycle position.
    pub status: SessionStatus,
    /// Admin who claimed the session; set once, on `waiting → active`.
    pub admin_id: Option<UserId>,
    /// Messages keyed by store-assigned key.
    pub messages: BTreeMap<MessageKey, ChatMessage>,
}

/// Stored shape of a session document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    user_id: UserId,
    user_name: String,
    user_email: String,
    created_at: DateTime<Utc>,
    status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admin_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    messages: BTreeMap<MessageKey, ChatMessage>,
}

impl ChatSession {
    /// Decode a session snapshot read from `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if a field is missing, the status is not
    /// one of the known values, or a message has empty text.
    pub fn from_value(id: SessionId, path: &StorePath, value: Value) -> Result<Self, StoreError> {
        let record: SessionRecord =
            serde_json::from_value(value).map_err(|e| StoreError::decode(path, e))?;

        if let Some((key, _)) = record
            .messages
            .iter()
            .find(|(_, message)| message.text.trim().is_empty())
        {
            return Err(StoreError::decode(path, format!("message {key} has empty text")));
        }

        Ok(Self {
            id,
            customer_id: record.user_id,
            customer_display_name: record.user_name,
            customer_contact: record.user_email,
            created_at: record.created_at,
            status: record.status,
            admin_id: record.admin_id,
            messages: record.messages,
        })
    }

    /// Whether the session has ended.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Whether `session` has ended.
#[must_use]
pub const fn is_terminal(session: &ChatSession) -> bool {
    session.is_terminal()
}

/// A session about to be created by a customer.
#[derive(Debug, Clone)]
pub struct NewChatSession {
    /// Signed-in user ID or generated guest ID.
    pub customer_id: UserId,
    /// Name the customer is shown under.
    pub customer_display_name: String,
    /// Email address, or `Guest`.
    pub customer_contact: String,
    /// Request time.
    pub created_at: DateTime<Utc>,
}

impl NewChatSession {
    /// Document written to the store; always starts `waiting`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if serialization fails.
    pub fn to_value(&self, path: &StorePath) -> Result<Value, StoreError> {
        let record = SessionRecord {
            user_id: self.customer_id.clone(),
            user_name: self.customer_display_name.clone(),
            user_email: self.customer_contact.clone(),
            created_at: self.created_at,
            status: SessionStatus::Waiting,
            admin_id: None,
            messages: BTreeMap::new(),
        };
        serde_json::to_value(record).map_err(|e| StoreError::decode(path, e))
    }
}

/// A decoded collection snapshot.
#[derive(Debug, Default)]
pub struct DecodedSessions {
    /// Sessions that decoded, oldest first.
    pub sessions: Vec<ChatSession>,
    /// One error per child that did not decode.
    pub rejected: Vec<StoreError>,
}

/// Decode a collection snapshot (`sessionId → session`).
///
/// A malformed child is set aside in `rejected` and the rest still decode.
///
/// # Errors
///
/// Returns `StoreError::Decode` if the snapshot is not a collection.
pub fn decode_sessions(path: &StorePath, value: Option<Value>) -> Result<DecodedSessions, StoreError> {
    let Some(value) = value else {
        return Ok(DecodedSessions::default());
    };
    let Value::Object(children) = value else {
        return Err(StoreError::decode(path, "expected a collection of sessions"));
    };

    let mut decoded = DecodedSessions::default();
    for (key, child) in children {
        let session = path
            .child(&key)
            .and_then(|child_path| ChatSession::from_value(SessionId::new(key), &child_path, child));
        match session {
            Ok(session) => decoded.sessions.push(session),
            Err(e) => decoded.rejected.push(e),
        }
    }
    decoded
        .sessions
        .sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(decoded)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path() -> StorePath {
        StorePath::parse("LiveSupportChats/-N1").unwrap()
    }

    #[test]
    fn test_message_text_trims() {
        assert_eq!(MessageText::parse("  hello \n").unwrap().as_str(), "hello");
        assert_eq!(MessageText::parse(" \t\n"), Err(SupportError::EmptyMessage));
        assert_eq!(MessageText::parse(""), Err(SupportError::EmptyMessage));
    }

    #[test]
    fn test_new_session_is_waiting() {
        let new = NewChatSession {
            customer_id: UserId::new("guest-1"),
            customer_display_name: "Guest".into(),
            customer_contact: "Guest".into(),
            created_at: Utc::now(),
        };
        let value = new.to_value(&path()).unwrap();
        assert_eq!(value["status"], "waiting");
        assert_eq!(value["userId"], "guest-1");
        assert!(value.get("adminId").is_none());
        assert!(value.get("messages").is_none());
    }

    #[test]
    fn test_decode_session_with_messages() {
        let value = json!({
            "userId": "u1",
            "userName": "Brooke",
            "userEmail": "a@x.com",
            "createdAt": "2025-12-01T10:00:00.000Z",
            "status": "active",
            "adminId": "admin-1",
            "messages": {
                "-M1": {
                    "sender": "u1",
                    "name": "Brooke",
                    "text": "hello",
                    "timestamp": "2025-12-01T10:01:00.000Z"
                }
            }
        });

        let session = ChatSession::from_value(SessionId::new("-N1"), &path(), value).unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.admin_id, Some(UserId::new("admin-1")));
        assert_eq!(session.customer_contact, "a@x.com");
        assert_eq!(session.messages[&MessageKey::new("-M1")].text, "hello");
        assert!(!is_terminal(&session));
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let value = json!({
            "userId": "u1",
            "userName": "Brooke",
            "userEmail": "a@x.com",
            "createdAt": "2025-12-01T10:00:00Z",
            "status": "paused"
        });
        let err = ChatSession::from_value(SessionId::new("-N1"), &path(), value).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn test_decode_rejects_blank_message() {
        let value = json!({
            "userId": "u1",
            "userName": "Brooke",
            "userEmail": "a@x.com",
            "createdAt": "2025-12-01T10:00:00Z",
            "status": "active",
            "messages": {
                "-M1": { "sender": "u1", "name": "B", "text": "   ", "timestamp": "2025-12-01T10:00:00Z" }
            }
        });
        assert!(ChatSession::from_value(SessionId::new("-N1"), &path(), value).is_err());
    }

    #[test]
    fn test_decode_sessions_sorted_oldest_first() {
        let collection = json!({
            "-N2": { "userId": "b", "userName": "B", "userEmail": "b@x.com",
                     "createdAt": "2025-12-01T10:05:00Z", "status": "waiting" },
            "-N1": { "userId": "a", "userName": "A", "userEmail": "a@x.com",
                     "createdAt": "2025-12-01T10:00:00Z", "status": "waiting" },
        });
        let root = StorePath::parse("LiveSupportChats").unwrap();
        let decoded = decode_sessions(&root, Some(collection)).unwrap();
        let ids: Vec<&str> = decoded.sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["-N1", "-N2"]);
        assert!(decoded.rejected.is_empty());
        assert!(decode_sessions(&root, None).unwrap().sessions.is_empty());
    }

    #[test]
    fn test_decode_sessions_sets_aside_malformed_child() {
        let collection = json!({
            "-A": { "userId": "a", "userName": "A", "userEmail": "a@x.com", "status": "waiting" },
            "-B": { "userId": "b", "userName": "B", "userEmail": "b@x.com",
                    "createdAt": "2025-12-01T10:05:00Z", "status": "waiting" },
        });
        let root = StorePath::parse("LiveSupportChats").unwrap();
        let decoded = decode_sessions(&root, Some(collection)).unwrap();

        assert_eq!(decoded.sessions.len(), 1);
        assert_eq!(decoded.sessions.first().unwrap().id.as_str(), "-B");
        assert!(matches!(
            decoded.rejected.as_slice(),
            [StoreError::Decode { path, .. }] if path == "LiveSupportChats/-A"
        ));
        assert!(decode_sessions(&root, Some(json!("oops"))).is_err());
    }
}
