//! Message composer: validates and submits outgoing messages, keeping both
//! participants' directory entries in step with the log.

use tracing::warn;

use crate::auth::Session;
use crate::chat::directory::ConversationDirectory;
use crate::chat::identity::ConversationId;
use crate::chat::log::MessageLog;
use crate::error::ChatError;
use crate::models::{ItemRecord, Message, UserRef};
use crate::store::DocumentStore;

pub struct Composer<S> {
    log: MessageLog<S>,
    directory: ConversationDirectory<S>,
    session: Session,
}

impl<S: DocumentStore> Composer<S> {
    pub fn new(log: MessageLog<S>, directory: ConversationDirectory<S>, session: Session) -> Self {
        Self {
            log,
            directory,
            session,
        }
    }

    /// Send a message from the signed-in user to `recipient`.
    ///
    /// Step order: validate, ensure the log exists, append, update the
    /// sender's directory entry, update the recipient's. The append and the
    /// two directory updates are not one transaction: a failure after the
    /// append leaves the message delivered with one or both previews stale,
    /// surfaced as [`ChatError::PartialUpdate`]. The stale side heals on the
    /// next successful send in either direction.
    pub async fn send(
        &self,
        conversation: &ConversationId,
        recipient: &UserRef,
        text: &str,
    ) -> Result<Message, ChatError> {
        let sender = self.session.current().ok_or(ChatError::NotAuthenticated)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ChatError::Validation(
                "message text must not be empty".to_string(),
            ));
        }
        if sender.id == recipient.id {
            return Err(ChatError::Validation(
                "cannot send a message to yourself".to_string(),
            ));
        }

        let message = Message::new(&sender.id, trimmed);
        self.log.append(conversation, message.clone()).await?;

        let sender_ref = sender.user_ref();
        if let Err(source) = self
            .directory
            .record_activity(conversation, &sender_ref.id, recipient, trimmed, None)
            .await
        {
            warn!(conversation = %conversation, user = %sender_ref.id, error = %source,
                "sender directory update failed after message delivery");
            return Err(ChatError::PartialUpdate {
                conversation: conversation.to_string(),
                source,
            });
        }
        if let Err(source) = self
            .directory
            .record_activity(conversation, &recipient.id, &sender_ref, trimmed, None)
            .await
        {
            warn!(conversation = %conversation, user = %recipient.id, error = %source,
                "recipient directory update failed after message delivery");
            return Err(ChatError::PartialUpdate {
                conversation: conversation.to_string(),
                source,
            });
        }

        Ok(message)
    }

    /// The "chat with owner" action from an item page: ensures the
    /// conversation between the signed-in user and the item's owner, with the
    /// item linked on both directory entries, and returns the id plus the
    /// counterpart to select. No message is sent.
    pub async fn start_from_item(
        &self,
        item: &ItemRecord,
    ) -> Result<(ConversationId, UserRef), ChatError> {
        let me = self.session.current().ok_or(ChatError::NotAuthenticated)?;
        if me.id == item.owner.id {
            return Err(ChatError::Validation(
                "cannot open a conversation about your own item".to_string(),
            ));
        }

        let conversation = self
            .directory
            .ensure_conversation(&me.user_ref(), &item.owner, Some(&item.link()))
            .await?;
        Ok((conversation, item.owner.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::Value;

    use super::*;
    use crate::auth::UserProfile;
    use crate::config::CoreConfig;
    use crate::error::StoreError;
    use crate::store::{DocumentWatch, FieldValue, MemoryStore};

    /// Delegating store that fails `update` calls for configured documents.
    struct FaultyStore {
        inner: MemoryStore,
        fail_updates_for: Mutex<Vec<(String, String)>>,
    }

    impl FaultyStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_updates_for: Mutex::new(Vec::new()),
            }
        }

        fn fail_update(&self, collection: &str, doc_id: &str) {
            self.fail_updates_for
                .lock()
                .push((collection.to_string(), doc_id.to_string()));
        }

        fn heal(&self) {
            self.fail_updates_for.lock().clear();
        }
    }

    impl DocumentStore for FaultyStore {
        async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get(collection, doc_id).await
        }

        async fn create_if_absent(
            &self,
            collection: &str,
            doc_id: &str,
            data: Value,
        ) -> Result<bool, StoreError> {
            self.inner.create_if_absent(collection, doc_id, data).await
        }

        async fn update(
            &self,
            collection: &str,
            doc_id: &str,
            updates: Vec<(String, FieldValue)>,
        ) -> Result<(), StoreError> {
            let should_fail = self
                .fail_updates_for
                .lock()
                .iter()
                .any(|(c, d)| c == collection && d == doc_id);
            if should_fail {
                return Err(StoreError::Unavailable("injected failure".to_string()));
            }
            self.inner.update(collection, doc_id, updates).await
        }

        async fn subscribe(
            &self,
            collection: &str,
            doc_id: &str,
        ) -> Result<DocumentWatch, StoreError> {
            self.inner.subscribe(collection, doc_id).await
        }
    }

    fn profile(id: &str, name: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{id}@example.com"),
        }
    }

    fn composer_over<S: DocumentStore>(
        store: Arc<S>,
        session: Session,
    ) -> (Composer<S>, MessageLog<S>, ConversationDirectory<S>) {
        let config = CoreConfig::default();
        let log = MessageLog::new(store.clone(), config.clone());
        let directory = ConversationDirectory::new(store, config);
        (
            Composer::new(log.clone(), directory.clone(), session),
            log,
            directory,
        )
    }

    #[tokio::test]
    async fn test_send_appends_and_updates_both_previews() {
        let session = Session::signed_in(profile("u1", "Robin"));
        let (composer, log, directory) =
            composer_over(Arc::new(MemoryStore::new()), session);

        let recipient = UserRef::new("u2", "Sam");
        let conversation = directory
            .ensure_conversation(&UserRef::new("u1", "Robin"), &recipient, None)
            .await
            .unwrap();

        let sent = composer
            .send(&conversation, &recipient, "hello")
            .await
            .unwrap();
        assert_eq!(sent.sender_id, "u1");

        let messages = log.subscribe(&conversation).await.unwrap().snapshot();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hello");

        for user in ["u1", "u2"] {
            let snapshot = directory.subscribe(user).await.unwrap().snapshot();
            assert_eq!(
                snapshot.get(conversation.as_str()).unwrap().preview(),
                Some("hello")
            );
        }
    }

    #[tokio::test]
    async fn test_send_requires_signed_in_user() {
        let (composer, _, _) =
            composer_over(Arc::new(MemoryStore::new()), Session::signed_out());
        let conversation = ConversationId::derive("u1", "u2").unwrap();
        let err = composer
            .send(&conversation, &UserRef::new("u2", "Sam"), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_send_rejects_whitespace_text_before_any_write() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::signed_in(profile("u1", "Robin"));
        let (composer, _, _) = composer_over(store.clone(), session);
        let conversation = ConversationId::derive("u1", "u2").unwrap();

        let err = composer
            .send(&conversation, &UserRef::new("u2", "Sam"), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
        assert!(store
            .get("chats", conversation.as_str())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_send_rejects_self_recipient() {
        let session = Session::signed_in(profile("u1", "Robin"));
        let (composer, _, _) = composer_over(Arc::new(MemoryStore::new()), session);
        let conversation = ConversationId::derive("u1", "u2").unwrap();
        let err = composer
            .send(&conversation, &UserRef::new("u1", "Robin"), "hi me")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_message_delivered_and_heals() {
        let store = Arc::new(FaultyStore::new());
        let session = Session::signed_in(profile("u1", "Robin"));
        let (composer, log, directory) = composer_over(store.clone(), session);

        let recipient = UserRef::new("u2", "Sam");
        let conversation = directory
            .ensure_conversation(&UserRef::new("u1", "Robin"), &recipient, None)
            .await
            .unwrap();

        // Recipient's directory update fails after the append.
        store.fail_update("userChats", "u2");
        let err = composer
            .send(&conversation, &recipient, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::PartialUpdate { .. }));
        assert!(!err.message_not_delivered());

        // The message is in the log; the recipient's preview is stale.
        let messages = log.subscribe(&conversation).await.unwrap().snapshot();
        assert_eq!(messages.len(), 1);
        let stale = directory.subscribe("u2").await.unwrap().snapshot();
        assert!(stale.get(conversation.as_str()).unwrap().preview().is_none());

        // Next successful send heals the stale side.
        store.heal();
        composer
            .send(&conversation, &recipient, "are you there?")
            .await
            .unwrap();
        let healed = directory.subscribe("u2").await.unwrap().snapshot();
        assert_eq!(
            healed.get(conversation.as_str()).unwrap().preview(),
            Some("are you there?")
        );
    }

    #[tokio::test]
    async fn test_start_from_item_links_item_and_returns_counterpart() {
        let session = Session::signed_in(profile("u1", "Robin"));
        let (composer, log, directory) =
            composer_over(Arc::new(MemoryStore::new()), session);

        let item = ItemRecord {
            id: "it1".into(),
            title: "Blue Backpack".into(),
            owner: UserRef::new("u2", "Sam"),
        };
        let (conversation, counterpart) = composer.start_from_item(&item).await.unwrap();
        assert_eq!(counterpart.id, "u2");
        assert_eq!(
            conversation,
            ConversationId::derive("u1", "u2").unwrap(),
            "conversation id must be the deterministic combination of the pair"
        );

        // Both sides carry the linked item; the log is still empty.
        for user in ["u1", "u2"] {
            let snapshot = directory.subscribe(user).await.unwrap().snapshot();
            let entry = snapshot.get(conversation.as_str()).unwrap();
            assert_eq!(entry.item.as_ref().unwrap().id, "it1");
        }
        assert!(log.subscribe(&conversation).await.unwrap().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_start_from_item_rejects_own_item() {
        let session = Session::signed_in(profile("u1", "Robin"));
        let (composer, _, _) = composer_over(Arc::new(MemoryStore::new()), session);
        let item = ItemRecord {
            id: "it1".into(),
            title: "Blue Backpack".into(),
            owner: UserRef::new("u1", "Robin"),
        };
        let err = composer.start_from_item(&item).await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }
}
