//! Bans, the user list and promotion notices.

use chrono::Utc;
use icyxr_core::models::{UserEntry, decode_users};
use icyxr_core::store::path::{user, users};
use icyxr_core::{Email, EmailError, RealtimeStore, StoreError, UserId};
use serde_json::{Map, json};
use thiserror::Error;
use tracing::{info, instrument};

use super::notify::push_notification;

/// Errors that can occur during moderation.
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("A ban reason is required")]
    ReasonRequired,

    #[error("You cannot ban yourself")]
    CannotBanSelf,

    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Ban `target`, recording `reason` and the time.
///
/// # Errors
///
/// Returns `ModerationError::ReasonRequired` for a blank reason,
/// `CannotBanSelf` when `target` is the acting admin, `UserNotFound` when the
/// profile does not exist, and `Store` if a read or write fails.
#[instrument(skip(store, reason), fields(admin = %admin, target = %target))]
pub async fn ban_user<S: RealtimeStore>(
    store: &S,
    admin: &UserId,
    target: &UserId,
    reason: &str,
) -> Result<(), ModerationError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ModerationError::ReasonRequired);
    }
    if target == admin {
        return Err(ModerationError::CannotBanSelf);
    }

    let path = user(target)?;
    if store.get(&path).await?.is_none() {
        return Err(ModerationError::UserNotFound(target.to_string()));
    }

    let mut fields = Map::new();
    fields.insert(
        "banned".to_owned(),
        json!({
            "status": true,
            "reason": reason,
            "timestamp": Utc::now(),
        }),
    );
    store.update(&path, fields).await?;
    info!("user banned");
    Ok(())
}

/// Every user except the acting admin, in key order.
///
/// # Errors
///
/// Returns `StoreError` if the read fails or a profile is malformed.
pub async fn list_users<S: RealtimeStore>(store: &S, admin: &UserId) -> Result<Vec<UserEntry>, StoreError> {
    let path = users();
    let mut entries = decode_users(&path, store.get(&path).await?)?;
    entries.retain(|entry| &entry.id != admin);
    Ok(entries)
}

/// Users whose name or email contains `query`, ignoring case, in key order.
///
/// A blank query matches nobody.
///
/// # Errors
///
/// Returns `StoreError` if the read fails or a profile is malformed.
pub async fn search_users<S: RealtimeStore>(store: &S, query: &str) -> Result<Vec<UserEntry>, StoreError> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(Vec::new());
    }
    let path = users();
    let mut entries = decode_users(&path, store.get(&path).await?)?;
    entries.retain(|entry| entry.profile.matches_search(&needle));
    Ok(entries)
}

/// Find the account registered with `email` and queue `message` for it.
///
/// # Errors
///
/// Returns `ModerationError::EmptyMessage` for a blank message,
/// `InvalidEmail` for a malformed address, `UserNotFound` when no profile
/// has that email, and `Store` if a read or write fails.
#[instrument(skip(store, message))]
pub async fn send_promotion<S: RealtimeStore>(
    store: &S,
    email: &str,
    message: &str,
) -> Result<UserId, ModerationError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ModerationError::EmptyMessage);
    }
    let email = Email::parse(email)?;

    let path = users();
    let recipient = decode_users(&path, store.get(&path).await?)?
        .into_iter()
        .find(|entry| {
            entry
                .profile
                .email
                .as_deref()
                .is_some_and(|stored| email.matches(stored))
        })
        .map(|entry| entry.id)
        .ok_or_else(|| ModerationError::UserNotFound(email.to_string()))?;

    push_notification(store, &recipient, message).await?;
    info!(recipient = %recipient, "promotion sent");
    Ok(recipient)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use icyxr_core::store::path::notifications;
    use icyxr_realtime::MemoryStore;

    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::with_data(json!({
            "users": {
                "admin-1": { "name": "Brooke", "email": "icyxrr@gmail.com" },
                "u1": { "name": "Sam", "email": "Sam@Example.com", "verified": true },
                "u2": { "name": "Alex" },
            }
        }))
    }

    #[tokio::test]
    async fn test_ban_writes_record() {
        let store = store();
        let admin = UserId::new("admin-1");
        ban_user(&store, &admin, &UserId::new("u1"), " spam ").await.unwrap();

        let profile = store.get(&user(&UserId::new("u1")).unwrap()).await.unwrap().unwrap();
        assert_eq!(profile["banned"]["status"], true);
        assert_eq!(profile["banned"]["reason"], "spam");
        assert!(profile["banned"]["timestamp"].is_string());
        assert_eq!(profile["name"], "Sam");
    }

    #[tokio::test]
    async fn test_ban_rules() {
        let store = store();
        let admin = UserId::new("admin-1");
        assert!(matches!(
            ban_user(&store, &admin, &UserId::new("u1"), "  ").await,
            Err(ModerationError::ReasonRequired)
        ));
        assert!(matches!(
            ban_user(&store, &admin, &admin, "oops").await,
            Err(ModerationError::CannotBanSelf)
        ));
        assert!(matches!(
            ban_user(&store, &admin, &UserId::new("ghost"), "spam").await,
            Err(ModerationError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_users_excludes_admin() {
        let store = store();
        let listed = list_users(&store, &UserId::new("admin-1")).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, ["u1", "u2"]);
    }

    #[tokio::test]
    async fn test_search_users_by_name_or_email() {
        let store = store();
        let found = search_users(&store, " EXAMPLE ").await.unwrap();
        assert_eq!(found.len(), 1);
        let sam = found.first().unwrap();
        assert_eq!(sam.id.as_str(), "u1");
        assert!(sam.profile.verified);

        let found = search_users(&store, "al").await.unwrap();
        let ids: Vec<&str> = found.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, ["u2"]);

        assert!(search_users(&store, "  ").await.unwrap().is_empty());
        assert!(search_users(&store, "nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_promotion_finds_user_by_email() {
        let store = store();
        let recipient = send_promotion(&store, "sam@example.com", "10% off this week")
            .await
            .unwrap();
        assert_eq!(recipient, UserId::new("u1"));

        let queue = store.get(&notifications(&recipient).unwrap()).await.unwrap().unwrap();
        let first = queue.as_object().unwrap().values().next().unwrap();
        assert_eq!(first["message"], "10% off this week");
    }

    #[tokio::test]
    async fn test_promotion_unknown_email() {
        let store = store();
        assert!(matches!(
            send_promotion(&store, "nobody@example.com", "hi").await,
            Err(ModerationError::UserNotFound(_))
        ));
        assert!(matches!(
            send_promotion(&store, "sam@example.com", " ").await,
            Err(ModerationError::EmptyMessage)
        ));
    }
}
