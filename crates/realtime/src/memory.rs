//! In-process store used by tests and local demos.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use icyxr_core::store::SubscriptionSender;
use icyxr_core::{Child, Query, RealtimeStore, StoreError, StorePath, Subscription};
use serde_json::{Map, Value};
use tracing::trace;

use crate::push_key::PushKeyGenerator;
use crate::tree::{self, ChildTracker};

/// A [`RealtimeStore`] holding the whole tree in memory.
///
/// Clones share the same tree, so a test can hand one clone to the customer
/// client and another to the admin console. Listeners are notified
/// synchronously inside the write that affects them, and only when the value
/// they observe actually changed.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    state: Mutex<TreeState>,
    keys: PushKeyGenerator,
    offline: AtomicBool,
    read_only: AtomicBool,
}

#[derive(Default)]
struct TreeState {
    root: Value,
    listeners: Vec<Listener>,
}

enum Listener {
    Value {
        path: StorePath,
        last: Option<Option<Value>>,
        tx: SubscriptionSender<Option<Value>>,
    },
    Query {
        path: StorePath,
        query: Query,
        last: Option<Option<Value>>,
        tx: SubscriptionSender<Option<Value>>,
    },
    Children {
        path: StorePath,
        tracker: ChildTracker,
        tx: SubscriptionSender<Child>,
    },
}

impl Listener {
    fn path(&self) -> &StorePath {
        match self {
            Self::Value { path, .. } | Self::Query { path, .. } | Self::Children { path, .. } => {
                path
            }
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            Self::Value { tx, .. } | Self::Query { tx, .. } => tx.is_closed(),
            Self::Children { tx, .. } => tx.is_closed(),
        }
    }

    /// Deliver whatever changed at this listener's path. Returns `false` once
    /// the consumer has gone away.
    fn refresh(&mut self, root: &Value) -> bool {
        match self {
            Self::Value { path, last, tx } => {
                let current = tree::value_at(root, path.segments()).cloned();
                deliver_if_changed(last, current, tx)
            }
            Self::Query {
                path,
                query,
                last,
                tx,
            } => {
                let current = query.filter(tree::value_at(root, path.segments()));
                deliver_if_changed(last, current, tx)
            }
            Self::Children { path, tracker, tx } => tracker
                .added(tree::value_at(root, path.segments()))
                .into_iter()
                .all(|child| tx.send(child)),
        }
    }
}

/// `last` is `None` until the first delivery, so the initial state is always
/// sent, even when nothing is stored.
fn deliver_if_changed(
    last: &mut Option<Option<Value>>,
    current: Option<Value>,
    tx: &SubscriptionSender<Option<Value>>,
) -> bool {
    if last.as_ref() == Some(&current) {
        return true;
    }
    *last = Some(current.clone());
    tx.send(current)
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `root`.
    #[must_use]
    pub fn with_data(root: Value) -> Self {
        let store = Self::default();
        store.lock().root = tree::normalize(root).unwrap_or(Value::Null);
        store
    }

    /// The whole tree as it stands.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.lock().root.clone()
    }

    /// Simulate losing the connection: while offline every operation fails
    /// with `StoreError::Unavailable`. Existing listeners stay attached.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Simulate rejected writes: while read-only, reads and listeners work
    /// but every write fails with `StoreError::Unavailable`.
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Number of listeners still attached.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        let mut state = self.lock();
        state.listeners.retain(|listener| !listener.is_closed());
        state.listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, TreeState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection lost".to_owned()));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        self.ensure_online()?;
        if self.inner.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write rejected".to_owned()));
        }
        Ok(())
    }

    /// Apply `write` to the tree, then notify every listener whose path
    /// overlaps `written`.
    fn write_with(&self, written: &StorePath, write: impl FnOnce(&mut Value)) {
        let mut state = self.lock();
        let TreeState { root, listeners } = &mut *state;
        write(root);
        trace!(path = %written, "memory store write");
        listeners.retain_mut(|listener| {
            if listener.is_closed() {
                return false;
            }
            if !listener.path().overlaps(written) {
                return true;
            }
            listener.refresh(root)
        });
    }

    fn attach(&self, mut listener: Listener) {
        let mut state = self.lock();
        if listener.refresh(&state.root) {
            state.listeners.push(listener);
        }
    }
}

impl RealtimeStore for MemoryStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.ensure_online()?;
        Ok(tree::value_at(&self.lock().root, path.segments()).cloned())
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.write_with(path, |root| {
            tree::write_at(root, path.segments(), Some(value));
        });
        Ok(())
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.write_with(path, |root| tree::merge_at(root, path.segments(), fields));
        Ok(())
    }

    async fn push(&self, path: &StorePath, value: Value) -> Result<String, StoreError> {
        self.ensure_writable()?;
        let key = self.inner.keys.next_key(Utc::now().timestamp_millis());
        let child = path.child(&key)?;
        self.write_with(&child, |root| {
            tree::write_at(root, child.segments(), Some(value));
        });
        Ok(key)
    }

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        self.ensure_writable()?;
        self.write_with(path, |root| tree::write_at(root, path.segments(), None));
        Ok(())
    }

    async fn compare_and_set(
        &self,
        path: &StorePath,
        expected: Option<Value>,
        new: Value,
    ) -> Result<bool, StoreError> {
        self.ensure_writable()?;
        let expected = expected.and_then(tree::normalize);
        let mut swapped = false;
        self.write_with(path, |root| {
            if tree::value_at(root, path.segments()) == expected.as_ref() {
                tree::write_at(root, path.segments(), Some(new));
                swapped = true;
            }
        });
        Ok(swapped)
    }

    async fn subscribe_value(
        &self,
        path: &StorePath,
    ) -> Result<Subscription<Option<Value>>, StoreError> {
        self.ensure_online()?;
        let (tx, subscription) = Subscription::channel();
        self.attach(Listener::Value {
            path: path.clone(),
            last: None,
            tx,
        });
        Ok(subscription)
    }

    async fn subscribe_children_added(
        &self,
        path: &StorePath,
    ) -> Result<Subscription<Child>, StoreError> {
        self.ensure_online()?;
        let (tx, subscription) = Subscription::channel();
        self.attach(Listener::Children {
            path: path.clone(),
            tracker: ChildTracker::default(),
            tx,
        });
        Ok(subscription)
    }

    async fn subscribe_query(
        &self,
        path: &StorePath,
        query: Query,
    ) -> Result<Subscription<Option<Value>>, StoreError> {
        self.ensure_online()?;
        let (tx, subscription) = Subscription::channel();
        self.attach(Listener::Query {
            path: path.clone(),
            query,
            last: None,
            tx,
        });
        Ok(subscription)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path(p: &str) -> StorePath {
        StorePath::parse(p).unwrap()
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set(&path("a/b"), json!("x")).await.unwrap();
        assert_eq!(store.get(&path("a/b")).await.unwrap(), Some(json!("x")));
        assert_eq!(store.get(&path("a")).await.unwrap(), Some(json!({"b": "x"})));

        store.remove(&path("a/b")).await.unwrap();
        assert_eq!(store.get(&path("a")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_push_keys_are_ordered() {
        let store = MemoryStore::new();
        let first = store.push(&path("list"), json!(1)).await.unwrap();
        let second = store.push(&path("list"), json!(2)).await.unwrap();
        assert!(second > first);

        let list = store.get(&path("list")).await.unwrap().unwrap();
        let values: Vec<&Value> = list.as_object().unwrap().values().collect();
        assert_eq!(values, [&json!(1), &json!(2)]);
    }

    #[tokio::test]
    async fn test_compare_and_set_only_one_winner() {
        let store = MemoryStore::with_data(json!({"chat": {"status": "waiting"}}));
        let status = path("chat/status");

        let first = store
            .compare_and_set(&status, Some(json!("waiting")), json!("active"))
            .await
            .unwrap();
        let second = store
            .compare_and_set(&status, Some(json!("waiting")), json!("active"))
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(store.get(&status).await.unwrap(), Some(json!("active")));
    }

    #[tokio::test]
    async fn test_compare_and_set_absent() {
        let store = MemoryStore::new();
        assert!(
            store
                .compare_and_set(&path("lock"), None, json!(true))
                .await
                .unwrap()
        );
        assert!(
            !store
                .compare_and_set(&path("lock"), None, json!(true))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_value_listener_sees_initial_and_changes() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe_value(&path("doc")).await.unwrap();
        assert_eq!(sub.next().await, Some(None));

        store.set(&path("doc/a"), json!(1)).await.unwrap();
        store.set(&path("other"), json!(1)).await.unwrap();
        store.set(&path("doc/a"), json!(1)).await.unwrap();
        store.remove(&path("doc")).await.unwrap();

        assert_eq!(sub.next().await, Some(Some(json!({"a": 1}))));
        assert_eq!(sub.next().await, Some(None));
        sub.stop();
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn test_children_added_delivers_existing_then_new() {
        let store = MemoryStore::with_data(json!({"q": {"k1": "a"}}));
        let mut sub = store.subscribe_children_added(&path("q")).await.unwrap();
        assert_eq!(sub.next().await.unwrap().key, "k1");

        store.set(&path("q/k2"), json!("b")).await.unwrap();
        store.set(&path("q/k1"), json!("changed")).await.unwrap();
        store.remove(&path("q/k2")).await.unwrap();
        store.set(&path("q/k3"), json!("c")).await.unwrap();

        let next = sub.next().await.unwrap();
        assert_eq!((next.key.as_str(), next.value), ("k2", json!("b")));
        assert_eq!(sub.next().await.unwrap().key, "k3");
    }

    #[tokio::test]
    async fn test_query_listener_filters() {
        let store = MemoryStore::new();
        let query = Query::child_equals("status", "waiting");
        let mut sub = store.subscribe_query(&path("chats"), query).await.unwrap();
        assert_eq!(sub.next().await, Some(None));

        store
            .set(&path("chats/c1"), json!({"status": "waiting"}))
            .await
            .unwrap();
        assert_eq!(
            sub.next().await,
            Some(Some(json!({"c1": {"status": "waiting"}})))
        );

        store
            .set(&path("chats/c1/status"), json!("active"))
            .await
            .unwrap();
        assert_eq!(sub.next().await, Some(None));
    }

    #[tokio::test]
    async fn test_stopped_listeners_are_dropped() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe_value(&path("doc")).await.unwrap();
        assert_eq!(store.listener_count(), 1);
        sub.stop();
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_offline_fails_every_operation() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.get(&path("a")).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.push(&path("a"), json!(1)).await.is_err());
        store.set_offline(false);
        assert!(store.push(&path("a"), json!(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_read_only_rejects_writes() {
        let store = MemoryStore::with_data(json!({"doc": {"n": 1}}));
        let mut sub = store.subscribe_value(&path("doc")).await.unwrap();
        assert_eq!(sub.next().await, Some(Some(json!({"n": 1}))));

        store.set_read_only(true);
        assert_eq!(store.get(&path("doc/n")).await.unwrap(), Some(json!(1)));
        assert!(matches!(
            store.set(&path("doc/n"), json!(2)).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(
            store
                .compare_and_set(&path("doc/n"), Some(json!(1)), json!(2))
                .await
                .is_err()
        );

        store.set_read_only(false);
        store.set(&path("doc/n"), json!(2)).await.unwrap();
        assert_eq!(sub.next().await, Some(Some(json!({"n": 2}))));
    }
}
