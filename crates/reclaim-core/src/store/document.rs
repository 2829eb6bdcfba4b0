//! The document-store contract the messaging layer is written against.
//!
//! This is the minimum surface any document-store-with-live-query backend
//! must provide: point reads, atomic create-if-absent, field-path-addressed
//! partial updates with server-assigned timestamps, and live full-snapshot
//! subscriptions to a single document. Deletes, edits and collection-level
//! queries are deliberately absent; nothing in the chat layer needs them.

use serde_json::Value;
use tokio::sync::watch;

use crate::error::StoreError;

/// A partial-update operand addressed to one dotted field path.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Replace the addressed leaf with the given value.
    Set(Value),
    /// Replace the addressed leaf with a store-assigned monotonic
    /// non-decreasing millisecond timestamp.
    ServerTimestamp,
    /// Append to the array at the addressed leaf, skipping an element that is
    /// already present by structural equality.
    ArrayUnion(Value),
}

/// Live view of one document.
///
/// Carries the current full document (or `None` while it does not exist)
/// immediately on creation, then a full replacement snapshot for every
/// committed write, in commit order. Consumers must treat every notification
/// as a replacement, never a diff. The stream never ends on its own; dropping
/// the watch cancels it.
#[derive(Debug)]
pub struct DocumentWatch {
    rx: watch::Receiver<Option<Value>>,
}

impl DocumentWatch {
    pub fn new(rx: watch::Receiver<Option<Value>>) -> Self {
        Self { rx }
    }

    /// The most recently committed state of the document.
    pub fn snapshot(&self) -> Option<Value> {
        self.rx.borrow().clone()
    }

    /// Waits for the next committed write. Returns `Unavailable` if the
    /// backend tore the subscription down (store dropped).
    pub async fn changed(&mut self) -> Result<(), StoreError> {
        self.rx
            .changed()
            .await
            .map_err(|_| StoreError::Unavailable("subscription closed by backend".to_string()))
    }

    /// The raw receiver, for callers that drive their own delivery loop.
    pub fn into_receiver(self) -> watch::Receiver<Option<Value>> {
        self.rx
    }
}

/// Backend contract: point reads/writes keyed by collection + document id,
/// dotted-path partial updates, and live document subscriptions.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// Point read. A missing document is `Ok(None)`, not an error.
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>, StoreError>;

    /// Atomically create the document with `data` unless it already exists.
    /// Returns `true` iff this call created it. This is the primitive that
    /// makes concurrent conversation creation idempotent: of two racing
    /// callers exactly one observes `true` and the loser's payload is
    /// discarded, never merged over existing state.
    async fn create_if_absent(
        &self,
        collection: &str,
        doc_id: &str,
        data: Value,
    ) -> Result<bool, StoreError>;

    /// Apply field-path-addressed partial updates to an existing document.
    /// Paths use dotted keys (`"<conversationId>.lastMessage"`); each update
    /// touches exactly the addressed leaf, creating intermediate objects and
    /// leaving siblings untouched. Fails with `NotFound` when the document
    /// does not exist.
    async fn update(
        &self,
        collection: &str,
        doc_id: &str,
        updates: Vec<(String, FieldValue)>,
    ) -> Result<(), StoreError>;

    /// Open a live subscription to one document.
    async fn subscribe(&self, collection: &str, doc_id: &str)
        -> Result<DocumentWatch, StoreError>;
}
