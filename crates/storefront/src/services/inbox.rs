//! The customer's notification mailbox.
//!
//! Notifications are shown, then deleted. A crash between the two shows the
//! notification again next time.

use icyxr_core::models::Notification;
use icyxr_core::store::path::{notification, notifications};
use icyxr_core::{Child, NotificationKey, RealtimeStore, Subscription, SupportError, UserId};
use tracing::{debug, warn};

/// Live view of one user's notification queue.
pub struct NotificationInbox<S> {
    store: S,
    recipient: UserId,
    subscription: Subscription<Child>,
}

impl<S: RealtimeStore> NotificationInbox<S> {
    /// Start listening to `recipient`'s queue. Notifications already queued
    /// are delivered first, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `SupportError::StoreUnavailable` if the listener cannot be
    /// attached.
    pub async fn subscribe(store: S, recipient: UserId) -> Result<Self, SupportError> {
        let subscription = store
            .subscribe_children_added(&notifications(&recipient)?)
            .await?;
        Ok(Self {
            store,
            recipient,
            subscription,
        })
    }

    /// Wait for the next notification, pass it to `on_show`, then delete it.
    ///
    /// Malformed entries are skipped and left in place. Returns `Ok(None)`
    /// once the listener has ended.
    ///
    /// # Errors
    ///
    /// Returns `SupportError::StoreUnavailable` if the delete fails; the
    /// notification has already been shown by then.
    pub async fn consume_next<F>(&mut self, on_show: F) -> Result<Option<Notification>, SupportError>
    where
        F: FnOnce(&Notification),
    {
        loop {
            let Some(child) = self.subscription.next().await else {
                return Ok(None);
            };
            let key = NotificationKey::new(child.key);
            let path = notification(&self.recipient, &key)?;

            let shown = match Notification::from_value(self.recipient.clone(), key, &path, child.value) {
                Ok(shown) => shown,
                Err(e) => {
                    warn!(error = %e, "skipping malformed notification");
                    continue;
                }
            };

            on_show(&shown);
            self.store.remove(&path).await?;
            debug!(key = %shown.key, "notification consumed");
            return Ok(Some(shown));
        }
    }

    /// Stop listening. Queued deliveries are still returned.
    pub fn stop(&mut self) {
        self.subscription.stop();
    }
}

/// Show and delete each notification for `recipient` as it arrives, in
/// insertion order, until the listener ends.
///
/// # Errors
///
/// Returns `SupportError::StoreUnavailable` if listening or deleting fails.
pub async fn subscribe_and_consume<S, F>(
    store: S,
    recipient: UserId,
    mut on_show: F,
) -> Result<(), SupportError>
where
    S: RealtimeStore,
    F: FnMut(&Notification),
{
    let mut inbox = NotificationInbox::subscribe(store, recipient).await?;
    while inbox.consume_next(&mut on_show).await?.is_some() {}
    Ok(())
}
