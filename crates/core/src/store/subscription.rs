//! Explicit handles for live store listeners.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A live listener on some part of the store.
///
/// Items arrive in the order the store delivered them. [`Subscription::stop`]
/// only affects future deliveries: anything already queued is still returned
/// by [`Subscription::next`], so consumers must check their own liveness before
/// acting on a late item. Dropping the handle stops it.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
    cancel: CancellationToken,
}

impl<T> Subscription<T> {
    /// Create a subscription fed by `rx`.
    ///
    /// The producer must stop sending once `cancel` fires.
    #[must_use]
    pub const fn new(rx: mpsc::UnboundedReceiver<T>, cancel: CancellationToken) -> Self {
        Self { rx, cancel }
    }

    /// Create a subscription together with the sender that feeds it.
    #[must_use]
    pub fn channel() -> (SubscriptionSender<T>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        (
            SubscriptionSender {
                tx,
                cancel: cancel.clone(),
            },
            Self::new(rx, cancel),
        )
    }

    /// Wait for the next delivery.
    ///
    /// Returns `None` once the subscription is stopped and drained, or when
    /// the producer has gone away.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Stop listening. Idempotent.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.rx.close();
    }

    /// Whether [`Subscription::stop`] has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The token producers watch to know when to stop.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Producer half of a [`Subscription`].
#[derive(Debug)]
pub struct SubscriptionSender<T> {
    tx: mpsc::UnboundedSender<T>,
    cancel: CancellationToken,
}

impl<T> Clone for SubscriptionSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<T> SubscriptionSender<T> {
    /// Deliver an item. Returns `false` once the consumer stopped listening.
    pub fn send(&self, item: T) -> bool {
        !self.cancel.is_cancelled() && self.tx.send(item).is_ok()
    }

    /// Whether the consumer has stopped or dropped its handle.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// Resolves once the consumer stops listening.
    pub async fn closed(&self) {
        tokio::select! {
            () = self.cancel.cancelled() => {}
            () = self.tx.closed() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delivers_in_order() {
        let (tx, mut sub) = Subscription::channel();
        assert!(tx.send(1));
        assert!(tx.send(2));
        assert_eq!(sub.next().await, Some(1));
        assert_eq!(sub.next().await, Some(2));
    }

    #[tokio::test]
    async fn test_stop_keeps_queued_items_but_refuses_new_ones() {
        let (tx, mut sub) = Subscription::channel();
        assert!(tx.send("queued"));
        sub.stop();

        assert!(sub.is_stopped());
        assert!(tx.is_closed());
        assert!(!tx.send("late"));
        assert_eq!(sub.next().await, Some("queued"));
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn test_drop_cancels_producer() {
        let (tx, sub) = Subscription::<u8>::channel();
        drop(sub);
        tx.closed().await;
        assert!(tx.is_closed());
    }
}
