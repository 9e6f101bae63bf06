//! Announcement banner and store open/closed switch.

use icyxr_core::models::{Announcement, SiteStatus};
use icyxr_core::store::path::{announcement, site_status};
use icyxr_core::{RealtimeStore, StoreError};
use thiserror::Error;
use tracing::{info, instrument};

/// Errors that can occur when changing site flags.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Announcement cannot be empty")]
    EmptyAnnouncement,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Replace the announcement banner text.
///
/// # Errors
///
/// Returns `SiteError::EmptyAnnouncement` for blank text and `Store` if the
/// write fails.
#[instrument(skip(store, text))]
pub async fn set_announcement<S: RealtimeStore>(store: &S, text: &str) -> Result<Announcement, SiteError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SiteError::EmptyAnnouncement);
    }
    let value = Announcement {
        text: text.to_owned(),
    };
    let path = announcement();
    store
        .set(
            &path,
            serde_json::to_value(&value).map_err(|e| StoreError::decode(&path, e))?,
        )
        .await?;
    info!("announcement updated");
    Ok(value)
}

/// Open the store if it is closed, close it if it is open.
///
/// # Errors
///
/// Returns `StoreError` if the read or write fails.
#[instrument(skip(store))]
pub async fn toggle_site_status<S: RealtimeStore>(store: &S) -> Result<SiteStatus, StoreError> {
    let path = site_status();
    let next = SiteStatus::from_snapshot(&path, store.get(&path).await?)?.toggled();
    store
        .set(
            &path,
            serde_json::to_value(next).map_err(|e| StoreError::decode(&path, e))?,
        )
        .await?;
    info!(is_active = next.is_active, "site status toggled");
    Ok(next)
}
