//! Helpers for reading and writing a JSON document tree.
//!
//! Both adapters keep the store's semantics: `null` and empty objects are
//! absent, and removing the last child of an object removes the object.

use std::collections::BTreeSet;

use icyxr_core::Child;
use serde_json::{Map, Value};

/// The value stored at `segments`, if any.
pub(crate) fn value_at<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let value = segments
        .iter()
        .try_fold(root, |node, segment| node.get(segment.as_str()))?;
    (!value.is_null()).then_some(value)
}

/// Write `value` at `segments`, removing the location when it is `None`.
pub(crate) fn write_at(node: &mut Value, segments: &[String], value: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value.and_then(normalize).unwrap_or(Value::Null);
        return;
    };

    if !node.is_object() {
        if value.is_none() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    let emptied = match node {
        Value::Object(map) => {
            let child = map.entry(head.clone()).or_insert(Value::Null);
            write_at(child, rest, value);
            if child.is_null() {
                map.remove(head);
            }
            map.is_empty()
        }
        _ => false,
    };
    if emptied {
        *node = Value::Null;
    }
}

/// Merge `fields` into the object at `segments`.
///
/// Field names may themselves be `/`-separated paths.
pub(crate) fn merge_at(root: &mut Value, segments: &[String], fields: Map<String, Value>) {
    for (field, value) in fields {
        let mut target = segments.to_vec();
        target.extend(
            field
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        );
        write_at(root, &target, Some(value));
    }
}

/// Strip `null` leaves and empty objects; `None` if nothing is left.
pub(crate) fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let kept: Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, child)| normalize(child).map(|child| (key, child)))
                .collect();
            (!kept.is_empty()).then_some(Value::Object(kept))
        }
        other => Some(other),
    }
}

/// Split a `/`-separated path into owned segments.
pub(crate) fn segments_of(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Turns successive snapshots of a collection into child-added events.
///
/// A child whose key disappears and later reappears is reported again.
#[derive(Debug, Default)]
pub(crate) struct ChildTracker {
    seen: BTreeSet<String>,
}

impl ChildTracker {
    /// Children in `snapshot` not present in the previous one, in key order.
    pub(crate) fn added(&mut self, snapshot: Option<&Value>) -> Vec<Child> {
        let children = snapshot.and_then(Value::as_object);
        let added: Vec<Child> = children
            .into_iter()
            .flatten()
            .filter(|(key, _)| !self.seen.contains(*key))
            .map(|(key, value)| Child {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        self.seen = children
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        added
    }
}
