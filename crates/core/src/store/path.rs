//! Validated locations in the realtime document tree.

use core::fmt;

use crate::types::{NotificationKey, OrderId, SessionId, UserId};

use super::StoreError;

/// Characters the hosted database refuses in keys.
const FORBIDDEN: &[char] = &['.', '$', '#', '[', ']'];

/// A `/`-separated location in the document tree.
///
/// The root is the empty path. Segments are never empty and never contain
/// characters the hosted database rejects in keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root of the tree.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a path such as `LiveSupportChats/-Nabc/messages`.
    ///
    /// Leading, trailing and repeated slashes are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if any segment contains a forbidden
    /// character.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(Self::root(), |acc, segment| acc.child(segment))
    }

    /// Append one segment.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if the segment is empty or contains
    /// `/` or a forbidden character.
    pub fn child(&self, segment: &str) -> Result<Self, StoreError> {
        if segment.is_empty() || segment.contains('/') || segment.contains(FORBIDDEN) {
            return Err(StoreError::InvalidPath(format!("{self}/{segment}")));
        }
        let mut segments = self.segments.clone();
        segments.push(segment.to_owned());
        Ok(Self { segments })
    }

    /// The path segments, root first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment, or `None` at the root.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Whether this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `other` is this path or lies underneath it.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Whether a write at `written` can change the value observed at `self`.
    ///
    /// That is the case when either path is a prefix of the other.
    #[must_use]
    pub fn overlaps(&self, written: &Self) -> bool {
        self.contains(written) || written.contains(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Root collection of live-support sessions.
pub const LIVE_SUPPORT_CHATS: &str = "LiveSupportChats";
/// Root collection of per-user notification queues.
pub const NOTIFICATIONS: &str = "notifications";
/// Root collection of user profiles.
pub const USERS: &str = "users";
/// Root collection of placed orders.
pub const ORDERS: &str = "Orders";
/// Single document holding the announcement banner.
pub const ANNOUNCEMENT: &str = "announcement";
/// Single document holding the store open/closed flag.
pub const SITE_STATUS: &str = "siteStatus";

fn collection(name: &str) -> StorePath {
    StorePath {
        segments: vec![name.to_owned()],
    }
}

fn document(name: &str, key: &str) -> Result<StorePath, StoreError> {
    collection(name).child(key)
}

/// `LiveSupportChats`
#[must_use]
pub fn live_support_chats() -> StorePath {
    collection(LIVE_SUPPORT_CHATS)
}

/// `LiveSupportChats/{sessionId}`
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` for keys the store would reject.
pub fn chat_session(id: &SessionId) -> Result<StorePath, StoreError> {
    document(LIVE_SUPPORT_CHATS, id.as_str())
}

/// `LiveSupportChats/{sessionId}/status`
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` for keys the store would reject.
pub fn chat_status(id: &SessionId) -> Result<StorePath, StoreError> {
    chat_session(id)?.child("status")
}

/// `LiveSupportChats/{sessionId}/messages`
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` for keys the store would reject.
pub fn chat_messages(id: &SessionId) -> Result<StorePath, StoreError> {
    chat_session(id)?.child("messages")
}

/// `notifications/{userId}`
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` for keys the store would reject.
pub fn notifications(user: &UserId) -> Result<StorePath, StoreError> {
    document(NOTIFICATIONS, user.as_str())
}

/// `notifications/{userId}/{key}`
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` for keys the store would reject.
pub fn notification(user: &UserId, key: &NotificationKey) -> Result<StorePath, StoreError> {
    notifications(user)?.child(key.as_str())
}

/// `users`
#[must_use]
pub fn users() -> StorePath {
    collection(USERS)
}

/// `users/{userId}`
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` for keys the store would reject.
pub fn user(id: &UserId) -> Result<StorePath, StoreError> {
    document(USERS, id.as_str())
}

/// `Orders`
#[must_use]
pub fn orders() -> StorePath {
    collection(ORDERS)
}

/// `Orders/{orderId}`
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` for keys the store would reject.
pub fn order(id: &OrderId) -> Result<StorePath, StoreError> {
    document(ORDERS, id.as_str())
}

/// `announcement`
#[must_use]
pub fn announcement() -> StorePath {
    collection(ANNOUNCEMENT)
}

/// `siteStatus`
#[must_use]
pub fn site_status() -> StorePath {
    collection(SITE_STATUS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_slashes() {
        let path = StorePath::parse("/LiveSupportChats//-Nabc/messages/").unwrap();
        assert_eq!(path.to_string(), "LiveSupportChats/-Nabc/messages");
        assert_eq!(path.key(), Some("messages"));
        assert!(StorePath::parse("/").unwrap().is_root());
    }

    #[test]
    fn test_rejects_forbidden_characters() {
        assert!(matches!(
            StorePath::parse("users/a.b"),
            Err(StoreError::InvalidPath(_))
        ));
        assert!(chat_session(&SessionId::new("bad#key")).is_err());
        assert!(StorePath::root().child("").is_err());
        assert!(StorePath::root().child("a/b").is_err());
    }

    #[test]
    fn test_overlaps() {
        let chat = chat_session(&SessionId::new("-N1")).unwrap();
        let messages = chat_messages(&SessionId::new("-N1")).unwrap();
        let other = chat_session(&SessionId::new("-N2")).unwrap();

        assert!(chat.overlaps(&messages));
        assert!(messages.overlaps(&chat));
        assert!(live_support_chats().overlaps(&messages));
        assert!(!chat.overlaps(&other));
        assert!(StorePath::root().overlaps(&other));
    }

    #[test]
    fn test_well_known_paths() {
        let uid = UserId::new("u1");
        assert_eq!(notifications(&uid).unwrap().to_string(), "notifications/u1");
        assert_eq!(
            notification(&uid, &NotificationKey::new("-K")).unwrap().to_string(),
            "notifications/u1/-K"
        );
        assert_eq!(user(&uid).unwrap().to_string(), "users/u1");
        assert_eq!(
            order(&OrderId::new("-O")).unwrap().to_string(),
            "Orders/-O"
        );
        assert_eq!(
            chat_status(&SessionId::new("-N")).unwrap().to_string(),
            "LiveSupportChats/-N/status"
        );
        assert_eq!(site_status().to_string(), "siteStatus");
        assert_eq!(announcement().to_string(), "announcement");
    }
}
