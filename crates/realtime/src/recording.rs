//! A store wrapper that records every write, for asserting on side effects.

use std::sync::{Arc, Mutex, PoisonError};

use icyxr_core::{Child, Query, RealtimeStore, StoreError, StorePath, Subscription};
use serde_json::{Map, Value};

/// Kind of write that reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Set,
    Update,
    Push,
    Remove,
    CompareAndSet,
}

/// One recorded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub kind: WriteKind,
    pub path: StorePath,
}

/// Wraps a store and records each write before forwarding it.
///
/// Reads and listeners pass straight through. Writes are recorded even when
/// the inner store then fails them.
#[derive(Clone, Default)]
pub struct RecordingStore<S> {
    inner: S,
    writes: Arc<Mutex<Vec<RecordedWrite>>>,
}

impl<S: RealtimeStore> RecordingStore<S> {
    /// Wrap `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            writes: Arc::default(),
        }
    }

    /// The wrapped store.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Every write so far, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of writes at or below `path`.
    #[must_use]
    pub fn writes_under(&self, path: &StorePath) -> usize {
        self.writes()
            .iter()
            .filter(|write| path.contains(&write.path))
            .count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, kind: WriteKind, path: &StorePath) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedWrite {
                kind,
                path: path.clone(),
            });
    }
}

impl<S: RealtimeStore> RealtimeStore for RecordingStore<S> {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.inner.get(path).await
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.record(WriteKind::Set, path);
        self.inner.set(path, value).await
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.record(WriteKind::Update, path);
        self.inner.update(path, fields).await
    }

    async fn push(&self, path: &StorePath, value: Value) -> Result<String, StoreError> {
        self.record(WriteKind::Push, path);
        self.inner.push(path, value).await
    }

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        self.record(WriteKind::Remove, path);
        self.inner.remove(path).await
    }

    async fn compare_and_set(
        &self,
        path: &StorePath,
        expected: Option<Value>,
        new: Value,
    ) -> Result<bool, StoreError> {
        self.record(WriteKind::CompareAndSet, path);
        self.inner.compare_and_set(path, expected, new).await
    }

    async fn subscribe_value(
        &self,
        path: &StorePath,
    ) -> Result<Subscription<Option<Value>>, StoreError> {
        self.inner.subscribe_value(path).await
    }

    async fn subscribe_children_added(
        &self,
        path: &StorePath,
    ) -> Result<Subscription<Child>, StoreError> {
        self.inner.subscribe_children_added(path).await
    }

    async fn subscribe_query(
        &self,
        path: &StorePath,
        query: Query,
    ) -> Result<Subscription<Option<Value>>, StoreError> {
        self.inner.subscribe_query(path, query).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn test_records_writes_not_reads() {
        let store = RecordingStore::new(MemoryStore::new());
        let chats = StorePath::parse("LiveSupportChats").unwrap();

        store.push(&chats, json!({"status": "waiting"})).await.unwrap();
        store.get(&chats).await.unwrap();
        store
            .set(&StorePath::parse("users/u1/name").unwrap(), json!("B"))
            .await
            .unwrap();

        assert_eq!(store.writes().len(), 2);
        assert_eq!(store.writes_under(&chats), 1);
        assert_eq!(store.writes()[0].kind, WriteKind::Push);

        store.clear();
        assert!(store.writes().is_empty());
    }
}
