//! In-memory reference backend.
//!
//! Every operation commits under one write lock, so notification order always
//! matches commit order. Watch channels give subscribers full-snapshot
//! replacement semantics: a subscriber that falls behind observes the latest
//! committed state, never a partial diff.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::StoreError;
use crate::store::document::{DocumentStore, DocumentWatch, FieldValue};
use crate::store::fields::{apply_field, FieldWrite};

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

type DocKey = (String, String);

#[derive(Default)]
struct Shared {
    /// collection -> doc id -> document
    documents: HashMap<String, HashMap<String, Value>>,
    /// Lazily created broadcast point per subscribed document. Senders live
    /// for the lifetime of the store so a watch never ends on its own.
    watchers: HashMap<DocKey, watch::Sender<Option<Value>>>,
}

/// In-process [`DocumentStore`] with live subscriptions and a monotonic
/// server clock.
#[derive(Default)]
pub struct MemoryStore {
    shared: RwLock<Shared>,
    clock: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Millisecond timestamp that is strictly increasing across calls, even
    /// when the wall clock stalls within one millisecond.
    fn server_timestamp(&self) -> u64 {
        let now = now_millis();
        let mut last = self.clock.load(Ordering::SeqCst);
        loop {
            let next = if now > last { now } else { last + 1 };
            match self
                .clock
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }

    fn resolve(&self, value: FieldValue) -> FieldWrite {
        match value {
            FieldValue::Set(v) => FieldWrite::Set(v),
            FieldValue::ServerTimestamp => FieldWrite::Set(Value::from(self.server_timestamp())),
            FieldValue::ArrayUnion(v) => FieldWrite::ArrayUnion(v),
        }
    }

    fn notify(shared: &mut Shared, collection: &str, doc_id: &str) {
        let snapshot = shared
            .documents
            .get(collection)
            .and_then(|docs| docs.get(doc_id))
            .cloned();
        let key = (collection.to_string(), doc_id.to_string());
        if let Some(tx) = shared.watchers.get(&key) {
            tx.send_replace(snapshot);
        }
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>, StoreError> {
        let shared = self.shared.read();
        Ok(shared
            .documents
            .get(collection)
            .and_then(|docs| docs.get(doc_id))
            .cloned())
    }

    async fn create_if_absent(
        &self,
        collection: &str,
        doc_id: &str,
        data: Value,
    ) -> Result<bool, StoreError> {
        let mut shared = self.shared.write();
        let docs = shared.documents.entry(collection.to_string()).or_default();
        if docs.contains_key(doc_id) {
            return Ok(false);
        }
        docs.insert(doc_id.to_string(), data);
        Self::notify(&mut shared, collection, doc_id);
        Ok(true)
    }

    async fn update(
        &self,
        collection: &str,
        doc_id: &str,
        updates: Vec<(String, FieldValue)>,
    ) -> Result<(), StoreError> {
        let mut shared = self.shared.write();
        // Timestamps are resolved under the commit lock so assignment order
        // always matches commit (and therefore notification) order.
        let resolved: Vec<(String, FieldWrite)> = updates
            .into_iter()
            .map(|(path, value)| (path, self.resolve(value)))
            .collect();

        let doc = shared
            .documents
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(doc_id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                doc_id: doc_id.to_string(),
            })?;

        for (path, write) in resolved {
            apply_field(doc, &path, write);
        }
        Self::notify(&mut shared, collection, doc_id);
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> Result<DocumentWatch, StoreError> {
        let mut shared = self.shared.write();
        let snapshot = shared
            .documents
            .get(collection)
            .and_then(|docs| docs.get(doc_id))
            .cloned();
        let key = (collection.to_string(), doc_id.to_string());
        let tx = shared.watchers.entry(key).or_insert_with(|| {
            let (tx, _rx) = watch::channel(snapshot.clone());
            tx
        });
        // A watcher created by an earlier subscriber already carries the
        // latest committed state; a fresh one was seeded with it above.
        Ok(DocumentWatch::new(tx.subscribe()))
    }
}
