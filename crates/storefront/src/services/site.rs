//! Store open/closed flag, the announcement banner and the member count, as
//! the customer sees them.

use icyxr_core::models::{Announcement, SiteStatus, banner_text};
use icyxr_core::store::path::{announcement, site_status, users};
use icyxr_core::{RealtimeStore, StoreError, Subscription};
use serde_json::{Map, Value};
use tracing::debug;

/// Which flag changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteChange {
    Status,
    Announcement,
}

/// Read the open/closed flag once.
///
/// # Errors
///
/// Returns `StoreError` if the read fails or the document is malformed.
pub async fn current_site_status<S: RealtimeStore>(store: &S) -> Result<SiteStatus, StoreError> {
    let path = site_status();
    SiteStatus::from_snapshot(&path, store.get(&path).await?)
}

/// Live copy of `siteStatus` and `announcement`.
pub struct SiteWatcher {
    status_sub: Subscription<Option<Value>>,
    announcement_sub: Subscription<Option<Value>>,
    status: SiteStatus,
    announcement: Option<Announcement>,
}

impl SiteWatcher {
    /// Attach listeners to both documents.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if either listener cannot be attached.
    pub async fn subscribe<S: RealtimeStore>(store: &S) -> Result<Self, StoreError> {
        Ok(Self {
            status_sub: store.subscribe_value(&site_status()).await?,
            announcement_sub: store.subscribe_value(&announcement()).await?,
            status: SiteStatus::default(),
            announcement: None,
        })
    }

    /// Wait for either document to change and apply it.
    ///
    /// Returns `None` once a listener has ended.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` for a malformed document; the previous
    /// value is kept.
    pub async fn next_change(&mut self) -> Option<Result<SiteChange, StoreError>> {
        tokio::select! {
            snapshot = self.status_sub.next() => {
                let snapshot = snapshot?;
                Some(SiteStatus::from_snapshot(&site_status(), snapshot).map(|status| {
                    debug!(is_active = status.is_active, "site status changed");
                    self.status = status;
                    SiteChange::Status
                }))
            }
            snapshot = self.announcement_sub.next() => {
                let snapshot = snapshot?;
                Some(Announcement::from_snapshot(&announcement(), snapshot).map(|text| {
                    self.announcement = text;
                    SiteChange::Announcement
                }))
            }
        }
    }

    /// Whether orders are being accepted.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active
    }

    /// Text for the top banner.
    #[must_use]
    pub fn banner(&self) -> &str {
        banner_text(self.status, self.announcement.as_ref())
    }
}

/// Live number of accounts under `users`.
pub struct UserCountWatcher {
    subscription: Subscription<Option<Value>>,
}

impl UserCountWatcher {
    /// Attach a listener to the user collection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the listener cannot be attached.
    pub async fn subscribe<S: RealtimeStore>(store: &S) -> Result<Self, StoreError> {
        Ok(Self {
            subscription: store.subscribe_value(&users()).await?,
        })
    }

    /// Wait for the next count. The first call returns the current one.
    ///
    /// Returns `None` once the listener has ended.
    pub async fn next_count(&mut self) -> Option<usize> {
        let snapshot = self.subscription.next().await?;
        Some(snapshot.as_ref().and_then(Value::as_object).map_or(0, Map::len))
    }

    /// Stop listening.
    pub fn stop(&mut self) {
        self.subscription.stop();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use icyxr_core::models::site::{CLOSED_BANNER, DEFAULT_ANNOUNCEMENT};
    use icyxr_core::StorePath;
    use icyxr_realtime::MemoryStore;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_missing_status_means_open() {
        let store = MemoryStore::new();
        assert!(current_site_status(&store).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_banner_follows_flags() {
        let store = MemoryStore::new();
        let mut watcher = SiteWatcher::subscribe(&store).await.unwrap();
        // Initial deliveries for both documents.
        watcher.next_change().await.unwrap().unwrap();
        watcher.next_change().await.unwrap().unwrap();
        assert_eq!(watcher.banner(), DEFAULT_ANNOUNCEMENT);

        store
            .set(&announcement(), json!({"text": "Halloween prints!"}))
            .await
            .unwrap();
        assert_eq!(
            watcher.next_change().await.unwrap().unwrap(),
            SiteChange::Announcement
        );
        assert_eq!(watcher.banner(), "Halloween prints!");

        store
            .set(&site_status(), json!({"isActive": false}))
            .await
            .unwrap();
        assert_eq!(watcher.next_change().await.unwrap().unwrap(), SiteChange::Status);
        assert!(!watcher.is_active());
        assert_eq!(watcher.banner(), CLOSED_BANNER);
    }

    #[tokio::test]
    async fn test_user_count_follows_collection() {
        let store = MemoryStore::new();
        let mut watcher = UserCountWatcher::subscribe(&store).await.unwrap();
        assert_eq!(watcher.next_count().await, Some(0));

        store
            .set(&users(), json!({"u1": {"name": "Sam"}, "u2": {"name": "Alex"}}))
            .await
            .unwrap();
        assert_eq!(watcher.next_count().await, Some(2));

        store
            .set(&StorePath::parse("users/u3/name").unwrap(), json!("Kim"))
            .await
            .unwrap();
        assert_eq!(watcher.next_count().await, Some(3));

        watcher.stop();
        assert_eq!(watcher.next_count().await, None);
    }

    #[tokio::test]
    async fn test_malformed_status_keeps_previous() {
        let store = MemoryStore::new();
        let mut watcher = SiteWatcher::subscribe(&store).await.unwrap();
        watcher.next_change().await.unwrap().unwrap();
        watcher.next_change().await.unwrap().unwrap();

        store.set(&site_status(), json!("broken")).await.unwrap();
        assert!(watcher.next_change().await.unwrap().is_err());
        assert!(watcher.is_active());
    }
}
