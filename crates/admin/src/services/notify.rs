//! Per-user notification queue, admin side.

use chrono::Utc;
use icyxr_core::models::NewNotification;
use icyxr_core::store::path::notifications;
use icyxr_core::{NotificationKey, RealtimeStore, StoreError, UserId};
use tracing::{debug, instrument};

/// Append `message` to `recipient`'s queue.
///
/// The recipient shows it next time their inbox is open; nothing here waits
/// for that.
///
/// # Errors
///
/// Returns `StoreError` if the append fails.
#[instrument(skip(store, message), fields(recipient = %recipient))]
pub async fn push_notification<S: RealtimeStore>(
    store: &S,
    recipient: &UserId,
    message: &str,
) -> Result<NotificationKey, StoreError> {
    let path = notifications(recipient)?;
    let value = NewNotification::new(message, Utc::now()).to_value(&path)?;
    let key = store.push(&path, value).await?;
    debug!(key = %key, "notification queued");
    Ok(NotificationKey::new(key))
}
