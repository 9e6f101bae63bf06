//! Contract for the hosted realtime document store.
//!
//! The store is a JSON tree addressed by [`StorePath`]. It offers one-shot
//! reads and writes plus live listeners; change notifications are delivered
//! at least once and concurrent field writes resolve last-write-wins. The
//! only conditional write is [`RealtimeStore::compare_and_set`].
//!
//! Adapters live in `icyxr-realtime`: an in-process tree for tests and a
//! client for the hosted database's REST API.

pub mod path;
mod subscription;

use std::future::Future;

use serde_json::{Map, Value};
use thiserror::Error;

pub use path::StorePath;
pub use subscription::{Subscription, SubscriptionSender};

/// Errors that can occur when talking to the store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or rejected the request.
    ///
    /// Network failures and permission denials are not distinguished.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored document does not have the expected shape.
    #[error("malformed record at {path}: {message}")]
    Decode {
        /// Where the record was read from.
        path: String,
        /// What was wrong with it.
        message: String,
    },

    /// A path contains characters the store does not accept.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl StoreError {
    /// Build a decode error for a record read from `path`.
    pub fn decode(path: &StorePath, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

/// A child that appeared under a listened-to location.
#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    /// Key of the new child.
    pub key: String,
    /// Value of the child when it was first observed.
    pub value: Value,
}

/// Filter for listening to a subset of a collection's children.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Child field to compare.
    pub order_by_child: String,
    /// Value the field must equal.
    pub equal_to: Value,
}

impl Query {
    /// Children whose `field` equals `value`.
    pub fn child_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            order_by_child: field.into(),
            equal_to: value.into(),
        }
    }

    /// Whether a child document matches the filter.
    #[must_use]
    pub fn matches(&self, child: &Value) -> bool {
        child.get(&self.order_by_child) == Some(&self.equal_to)
    }

    /// Keep only the matching children of a collection value.
    ///
    /// Returns `None` when nothing matches, mirroring how the store reports
    /// an empty result.
    #[must_use]
    pub fn filter(&self, collection: Option<&Value>) -> Option<Value> {
        let children = collection?.as_object()?;
        let matched: Map<String, Value> = children
            .iter()
            .filter(|(_, child)| self.matches(child))
            .map(|(key, child)| (key.clone(), child.clone()))
            .collect();
        (!matched.is_empty()).then_some(Value::Object(matched))
    }
}

/// Path-addressed document store with live listeners.
///
/// A `None` value means nothing is stored at the path. Writing `null` (or an
/// empty object) removes the location. Listeners deliver the current state
/// immediately, then one item per change that affects them.
pub trait RealtimeStore: Clone + Send + Sync + 'static {
    /// Read the value at `path` once.
    fn get(&self, path: &StorePath)
    -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Replace the value at `path`.
    fn set(&self, path: &StorePath, value: Value)
    -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Merge `fields` into the object at `path`. A `null` field removes it.
    fn update(
        &self,
        path: &StorePath,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Append `value` under a new, time-ordered key and return that key.
    fn push(&self, path: &StorePath, value: Value)
    -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Delete whatever is stored at `path`.
    fn remove(&self, path: &StorePath) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Write `new` only if the current value equals `expected`.
    ///
    /// Returns `false`, without writing, when another writer got there first.
    fn compare_and_set(
        &self,
        path: &StorePath,
        expected: Option<Value>,
        new: Value,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Listen to the whole value at `path`.
    fn subscribe_value(
        &self,
        path: &StorePath,
    ) -> impl Future<Output = Result<Subscription<Option<Value>>, StoreError>> + Send;

    /// Listen for children added under `path`, in key order.
    ///
    /// Children already present are delivered first.
    fn subscribe_children_added(
        &self,
        path: &StorePath,
    ) -> impl Future<Output = Result<Subscription<Child>, StoreError>> + Send;

    /// Listen to the children of `path` that match `query`.
    fn subscribe_query(
        &self,
        path: &StorePath,
        query: Query,
    ) -> impl Future<Output = Result<Subscription<Option<Value>>, StoreError>> + Send;
}
