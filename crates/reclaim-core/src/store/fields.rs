//! Dotted field-path application over JSON documents.
//!
//! `"<conversationId>.lastMessage"` addresses the `lastMessage` key inside
//! the object stored under the conversation id. Intermediate objects are
//! created on demand; sibling fields are never touched.

use serde_json::{Map, Value};

/// A resolved write at one field path (server timestamps already assigned).
#[derive(Debug, Clone)]
pub enum FieldWrite {
    Set(Value),
    ArrayUnion(Value),
}

/// Apply one write at `path` inside `root`, which must be a JSON object.
/// A non-object intermediate or leaf is replaced, matching the last-write-wins
/// per-field policy of the store contract.
pub fn apply_field(root: &mut Value, path: &str, write: FieldWrite) {
    if !root.is_object() {
        *root = Value::Object(Map::new());
    }

    let mut current = root;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let map = current
            .as_object_mut()
            .expect("current is always an object here");

        if segments.peek().is_none() {
            let slot = map.entry(segment.to_string()).or_insert(Value::Null);
            match write {
                FieldWrite::Set(value) => *slot = value,
                FieldWrite::ArrayUnion(element) => array_union(slot, element),
            }
            return;
        }

        let next = map.entry(segment.to_string()).or_insert(Value::Null);
        if !next.is_object() {
            *next = Value::Object(Map::new());
        }
        current = next;
    }
}

/// Append `element` to the array at `slot`, skipping structural duplicates.
/// A missing or non-array slot becomes a fresh single-element array.
fn array_union(slot: &mut Value, element: Value) {
    match slot {
        Value::Array(items) => {
            if !items.iter().any(|existing| existing == &element) {
                items.push(element);
            }
        }
        _ => *slot = Value::Array(vec![element]),
    }
}
