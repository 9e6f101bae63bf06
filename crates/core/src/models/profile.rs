//! User profiles and bans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{StoreError, StorePath};
use crate::types::{Email, UserId};

/// Reason shown when a ban was recorded without one.
pub const NO_BAN_REASON: &str = "No reason provided.";

/// Base used when an email yields nothing usable for a default name.
const FALLBACK_NAME: &str = "User";

/// Longest base kept from the email local part.
const MAX_NAME_BASE: usize = 12;

/// Stored shape of a user profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Sign-in email, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Ban record, when an admin has banned the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banned: Option<BanRecord>,
    /// Shown with a check mark in search results.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub verified: bool,
}

/// Ban details stored under `users/{uid}/banned`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanRecord {
    /// Whether the ban is in force.
    pub status: bool,
    /// Why the user was banned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the ban was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Decode a profile read from `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if the document is malformed.
    pub fn from_value(path: &StorePath, value: Value) -> Result<Self, StoreError> {
        serde_json::from_value(value).map_err(|e| StoreError::decode(path, e))
    }

    /// Reason for an active ban, or `None` when the user is not banned.
    #[must_use]
    pub fn ban_reason(&self) -> Option<&str> {
        let ban = self.banned.as_ref().filter(|ban| ban.status)?;
        Some(
            ban.reason
                .as_deref()
                .map(str::trim)
                .filter(|reason| !reason.is_empty())
                .unwrap_or(NO_BAN_REASON),
        )
    }

    /// The stored name, if it has any visible characters.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    /// Whether `needle` (already lowercased) occurs in the name or email,
    /// ignoring case.
    #[must_use]
    pub fn matches_search(&self, needle: &str) -> bool {
        [self.name.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// A user profile together with its account ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    /// Account ID.
    pub id: UserId,
    /// Stored profile.
    pub profile: UserProfile,
}

/// Decode the `users` collection in key order.
///
/// # Errors
///
/// Returns `StoreError::Decode` if any profile is malformed.
pub fn decode_users(path: &StorePath, value: Option<Value>) -> Result<Vec<UserEntry>, StoreError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let Value::Object(children) = value else {
        return Err(StoreError::decode(path, "expected a collection of users"));
    };

    children
        .into_iter()
        .map(|(key, child)| {
            let child_path = path.child(&key)?;
            Ok(UserEntry {
                id: UserId::new(key),
                profile: UserProfile::from_value(&child_path, child)?,
            })
        })
        .collect()
}

/// Build a default display name from an email address.
///
/// Keeps only `[A-Za-z0-9_]` from the local part, at most 12 characters,
/// falls back to `User` when nothing is left (or the base is `user`), and
/// appends the 4-digit `suffix`.
#[must_use]
pub fn default_username(email: Option<&Email>, suffix: u16) -> String {
    let cleaned: String = email
        .map(Email::local_part)
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(MAX_NAME_BASE)
        .collect();

    let base = if cleaned.is_empty() || cleaned.eq_ignore_ascii_case(FALLBACK_NAME) {
        FALLBACK_NAME
    } else {
        cleaned.as_str()
    };
    format!("{base}{suffix}")
}
