//! Display order and attribution for chat messages.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::ChatMessage;
use crate::types::{MessageKey, UserId};

/// Which side of the conversation a message is drawn on.
///
/// Purely presentational; it grants nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribution {
    /// Sent by the viewing client.
    Own,
    /// Sent by the other party.
    Other,
}

/// A message ready to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Store key of the message.
    pub key: MessageKey,
    /// Name shown next to the message.
    pub sender_display_name: String,
    /// Message body.
    pub text: String,
    /// When it was sent.
    pub sent_at: DateTime<Utc>,
    /// Own or other.
    pub attribution: Attribution,
}

impl RenderedMessage {
    /// First letter of the sender's name, upper-cased, for the avatar.
    #[must_use]
    pub fn initial(&self) -> char {
        self.sender_display_name
            .chars()
            .next()
            .map_or('U', |c| c.to_uppercase().next().unwrap_or(c))
    }
}

/// Order a session's messages for display as seen by `viewer`.
///
/// Sorted by `sent_at`, ties broken by store key. Push keys grow with
/// insertion time, so the result is a total order that is identical on every
/// render of the same data.
#[must_use]
pub fn ordered_messages(
    messages: &BTreeMap<MessageKey, ChatMessage>,
    viewer: &UserId,
) -> Vec<RenderedMessage> {
    let mut entries: Vec<(&MessageKey, &ChatMessage)> = messages.iter().collect();
    entries.sort_by(|(ka, a), (kb, b)| a.sent_at.cmp(&b.sent_at).then_with(|| ka.cmp(kb)));

    entries
        .into_iter()
        .map(|(key, message)| RenderedMessage {
            key: key.clone(),
            sender_display_name: message.sender_display_name.clone(),
            text: message.text.clone(),
            sent_at: message.sent_at,
            attribution: if &message.sender_id == viewer {
                Attribution::Own
            } else {
                Attribution::Other
            },
        })
        .collect()
}
