//! One-shot per-user notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{StoreError, StorePath};
use crate::types::{NotificationKey, UserId};

/// A notification waiting in a user's queue.
///
/// Consumed once: the recipient's client displays it and then deletes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Store-assigned key within the recipient's queue.
    pub key: NotificationKey,
    /// Owner of the queue.
    pub recipient_id: UserId,
    /// Text to show; may contain simple inline markup.
    pub message: String,
    /// When it was sent, if the sender recorded it.
    pub created_at: Option<DateTime<Utc>>,
}

/// Stored shape of a notification document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    /// Text to show.
    pub message: String,
    /// When it was sent.
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewNotification {
    /// A notification created now.
    #[must_use]
    pub fn new(message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            created_at: Some(now),
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

impl Notification {
    /// Decode a queued child read from `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if the document has no `message`.
    pub fn from_value(
        recipient_id: UserId,
        key: NotificationKey,
        path: &StorePath,
        value: Value,
    ) -> Result<Self, StoreError> {
        let stored: NewNotification =
            serde_json::from_value(value).map_err(|e| StoreError::decode(path, e))?;
        Ok(Self {
            key,
            recipient_id,
            message: stored.message,
            created_at: stored.created_at,
        })
    }
}
