//! Conversation directory: per-user index of conversations.
//!
//! Directory documents are shared mutably by exactly two users. All writes go
//! through dotted field paths so concurrent updates from both composers merge
//! at field granularity instead of clobbering the whole entry.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::chat::identity::ConversationId;
use crate::config::CoreConfig;
use crate::constants::fields;
use crate::error::{ChatError, StoreError};
use crate::models::{Directory, ItemRef, UserRef};
use crate::store::{DocumentStore, DocumentWatch, FieldValue};

/// Live view of one user's directory document.
#[derive(Debug)]
pub struct DirectoryWatch {
    inner: DocumentWatch,
}

impl DirectoryWatch {
    /// Current full directory snapshot.
    pub fn snapshot(&self) -> Directory {
        Directory::from_document(self.inner.snapshot().as_ref())
    }

    /// Waits for the next committed change to the directory.
    pub async fn changed(&mut self) -> Result<(), StoreError> {
        self.inner.changed().await
    }

    pub(crate) fn into_receiver(self) -> tokio::sync::watch::Receiver<Option<Value>> {
        self.inner.into_receiver()
    }
}

pub struct ConversationDirectory<S> {
    store: Arc<S>,
    config: CoreConfig,
}

impl<S> Clone for ConversationDirectory<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: DocumentStore> ConversationDirectory<S> {
    pub fn new(store: Arc<S>, config: CoreConfig) -> Self {
        Self { store, config }
    }

    /// Make sure the conversation between `a` and `b` exists: create the
    /// empty message log if absent, then merge a directory entry into both
    /// participants' directories (each pointing at the other, optionally
    /// carrying the linked item).
    ///
    /// Idempotent under concurrent duplicate calls: log creation is an atomic
    /// create-if-absent, and the directory writes are field-level merges that
    /// never remove previously set fields (an existing preview survives).
    pub async fn ensure_conversation(
        &self,
        a: &UserRef,
        b: &UserRef,
        item: Option<&ItemRef>,
    ) -> Result<ConversationId, ChatError> {
        let conversation = ConversationId::derive(&a.id, &b.id)?;

        let created = self
            .store
            .create_if_absent(
                &self.config.chats_collection,
                conversation.as_str(),
                crate::chat::log::empty_log(),
            )
            .await?;
        if created {
            debug!(conversation = %conversation, "created conversation log");
        }

        self.merge_entry(&conversation, a, b, None, item).await?;
        self.merge_entry(&conversation, b, a, None, item).await?;
        Ok(conversation)
    }

    /// Update the calling user's directory entry after activity in the
    /// conversation. Only `for_user`'s document is touched; the other
    /// participant's entry is written by the symmetric call from the
    /// composer, never inferred here.
    pub async fn record_activity(
        &self,
        conversation: &ConversationId,
        for_user: &str,
        counterpart: &UserRef,
        preview: &str,
        item: Option<&ItemRef>,
    ) -> Result<(), StoreError> {
        let owner = UserRef::new(for_user, "");
        self.merge_entry(conversation, &owner, counterpart, Some(preview), item)
            .await
    }

    /// Live subscription to one user's directory. Never terminates on its
    /// own; drop the watch to cancel.
    pub async fn subscribe(&self, user_id: &str) -> Result<DirectoryWatch, StoreError> {
        let inner = self
            .store
            .subscribe(&self.config.user_chats_collection, user_id)
            .await?;
        debug!(user = user_id, "directory subscription opened");
        Ok(DirectoryWatch { inner })
    }

    /// Merge the supplied fields of `owner`'s entry for `conversation`.
    /// Fields not supplied are left untouched.
    async fn merge_entry(
        &self,
        conversation: &ConversationId,
        owner: &UserRef,
        counterpart: &UserRef,
        preview: Option<&str>,
        item: Option<&ItemRef>,
    ) -> Result<(), StoreError> {
        // Directory documents are created lazily on first contact.
        self.store
            .create_if_absent(&self.config.user_chats_collection, &owner.id, json!({}))
            .await?;

        let mut updates: Vec<(String, FieldValue)> = vec![
            (
                format!("{}.{}", conversation, fields::USER_INFO),
                FieldValue::Set(serde_json::to_value(counterpart)?),
            ),
            (
                format!("{}.{}", conversation, fields::DATE),
                FieldValue::ServerTimestamp,
            ),
        ];
        if let Some(text) = preview {
            updates.push((
                format!("{}.{}", conversation, fields::LAST_MESSAGE),
                FieldValue::Set(json!({ "text": text })),
            ));
        }
        if let Some(item) = item {
            updates.push((
                format!("{}.{}", conversation, fields::ITEM),
                FieldValue::Set(serde_json::to_value(item)?),
            ));
        }

        self.store
            .update(&self.config.user_chats_collection, &owner.id, updates)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn directory_service() -> ConversationDirectory<MemoryStore> {
        ConversationDirectory::new(Arc::new(MemoryStore::new()), CoreConfig::default())
    }

    fn u(id: &str, name: &str) -> UserRef {
        UserRef::new(id, name)
    }

    #[tokio::test]
    async fn test_ensure_creates_log_and_both_entries() {
        let service = directory_service();
        let conversation = service
            .ensure_conversation(&u("u1", "Robin"), &u("u2", "Sam"), None)
            .await
            .unwrap();

        let log = service
            .store
            .get("chats", conversation.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log["messages"].as_array().unwrap().len(), 0);

        let side_a = service.subscribe("u1").await.unwrap().snapshot();
        let side_b = service.subscribe("u2").await.unwrap().snapshot();
        assert_eq!(
            side_a.get(conversation.as_str()).unwrap().counterpart.id,
            "u2"
        );
        assert_eq!(
            side_b.get(conversation.as_str()).unwrap().counterpart.id,
            "u1"
        );
    }

    #[tokio::test]
    async fn test_ensure_seeds_item_metadata_on_both_sides() {
        let service = directory_service();
        let item = ItemRef {
            id: "it1".into(),
            title: "Blue Backpack".into(),
        };
        let conversation = service
            .ensure_conversation(&u("u1", "Robin"), &u("u2", "Sam"), Some(&item))
            .await
            .unwrap();

        for user in ["u1", "u2"] {
            let snapshot = service.subscribe(user).await.unwrap().snapshot();
            let entry = snapshot.get(conversation.as_str()).unwrap();
            assert_eq!(entry.item.as_ref().unwrap().title, "Blue Backpack");
        }
    }

    #[tokio::test]
    async fn test_concurrent_ensure_is_idempotent() {
        let service = directory_service();
        let a = u("u1", "Robin");
        let b = u("u2", "Sam");

        let (first, second) = tokio::join!(
            service.ensure_conversation(&a, &b, None),
            service.ensure_conversation(&b, &a, None),
        );
        let conversation = first.unwrap();
        assert_eq!(conversation, second.unwrap());

        let snapshot = service.subscribe("u1").await.unwrap().snapshot();
        assert_eq!(snapshot.len(), 1, "exactly one entry per conversation");
    }

    #[tokio::test]
    async fn test_redundant_ensure_preserves_preview() {
        let service = directory_service();
        let a = u("u1", "Robin");
        let b = u("u2", "Sam");
        let conversation = service.ensure_conversation(&a, &b, None).await.unwrap();

        service
            .record_activity(&conversation, "u1", &b, "see you at 5", None)
            .await
            .unwrap();
        service.ensure_conversation(&a, &b, None).await.unwrap();

        let snapshot = service.subscribe("u1").await.unwrap().snapshot();
        assert_eq!(
            snapshot.get(conversation.as_str()).unwrap().preview(),
            Some("see you at 5"),
            "re-ensuring must not clobber the existing preview"
        );
    }

    #[tokio::test]
    async fn test_record_activity_touches_only_one_side() {
        let service = directory_service();
        let a = u("u1", "Robin");
        let b = u("u2", "Sam");
        let conversation = service.ensure_conversation(&a, &b, None).await.unwrap();

        let before_b = service.subscribe("u2").await.unwrap().snapshot();
        service
            .record_activity(&conversation, "u1", &b, "only my side", None)
            .await
            .unwrap();

        let after_a = service.subscribe("u1").await.unwrap().snapshot();
        let after_b = service.subscribe("u2").await.unwrap().snapshot();
        assert_eq!(
            after_a.get(conversation.as_str()).unwrap().preview(),
            Some("only my side")
        );
        assert_eq!(
            after_b.get(conversation.as_str()).unwrap().preview(),
            before_b.get(conversation.as_str()).unwrap().preview(),
            "the other participant's entry must be untouched"
        );
    }

    #[tokio::test]
    async fn test_activity_timestamps_are_monotonic() {
        let service = directory_service();
        let a = u("u1", "Robin");
        let b = u("u2", "Sam");
        let conversation = service.ensure_conversation(&a, &b, None).await.unwrap();

        service
            .record_activity(&conversation, "u1", &b, "first", None)
            .await
            .unwrap();
        let t1 = service
            .subscribe("u1")
            .await
            .unwrap()
            .snapshot()
            .get(conversation.as_str())
            .unwrap()
            .last_activity;

        service
            .record_activity(&conversation, "u1", &b, "second", None)
            .await
            .unwrap();
        let t2 = service
            .subscribe("u1")
            .await
            .unwrap()
            .snapshot()
            .get(conversation.as_str())
            .unwrap()
            .last_activity;

        assert!(t2 > t1, "last-activity must be monotonic non-decreasing");
    }

    #[tokio::test]
    async fn test_directory_watch_sees_new_conversations() {
        let service = directory_service();
        let mut watch = service.subscribe("u1").await.unwrap();
        assert!(watch.snapshot().is_empty());

        let conversation = service
            .ensure_conversation(&u("u1", "Robin"), &u("u2", "Sam"), None)
            .await
            .unwrap();

        watch.changed().await.unwrap();
        // Coalescing may fold the create and the entry merge into one
        // notification; drain until the entry is visible.
        loop {
            if watch.snapshot().get(conversation.as_str()).is_some() {
                break;
            }
            watch.changed().await.unwrap();
        }
    }
}
