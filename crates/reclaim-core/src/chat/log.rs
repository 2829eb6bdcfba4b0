//! Append-only message log, one document per conversation.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::chat::identity::ConversationId;
use crate::config::CoreConfig;
use crate::constants::fields;
use crate::error::{ChatError, StoreError};
use crate::models::Message;
use crate::store::{DocumentStore, DocumentWatch, FieldValue};

/// Document shape of a fresh conversation log.
pub(crate) fn empty_log() -> Value {
    let mut doc = serde_json::Map::new();
    doc.insert(fields::MESSAGES.to_string(), Value::Array(Vec::new()));
    Value::Object(doc)
}

/// Live view of one conversation's ordered message log.
#[derive(Debug)]
pub struct MessageWatch {
    inner: DocumentWatch,
}

impl MessageWatch {
    /// Current full log snapshot in append order. A log that does not exist
    /// yet is indistinguishable from an empty one.
    pub fn snapshot(&self) -> Vec<Message> {
        Message::log_from_document(self.inner.snapshot().as_ref())
    }

    /// Waits for the next committed append.
    pub async fn changed(&mut self) -> Result<(), StoreError> {
        self.inner.changed().await
    }

    pub(crate) fn into_receiver(self) -> tokio::sync::watch::Receiver<Option<Value>> {
        self.inner.into_receiver()
    }
}

pub struct MessageLog<S> {
    store: Arc<S>,
    config: CoreConfig,
}

impl<S> Clone for MessageLog<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: DocumentStore> MessageLog<S> {
    pub fn new(store: Arc<S>, config: CoreConfig) -> Self {
        Self { store, config }
    }

    /// Live subscription to the conversation's log.
    pub async fn subscribe(
        &self,
        conversation: &ConversationId,
    ) -> Result<MessageWatch, StoreError> {
        let inner = self
            .store
            .subscribe(&self.config.chats_collection, conversation.as_str())
            .await?;
        debug!(conversation = %conversation, "message subscription opened");
        Ok(MessageWatch { inner })
    }

    /// Append one message to the conversation's log, creating the log if it
    /// does not exist yet. Validation happens before any store call; the
    /// append itself is attempted exactly once per logical call.
    pub async fn append(
        &self,
        conversation: &ConversationId,
        message: Message,
    ) -> Result<(), ChatError> {
        if message.text.trim().is_empty() {
            return Err(ChatError::Validation(
                "message text must not be empty".to_string(),
            ));
        }

        self.store
            .create_if_absent(
                &self.config.chats_collection,
                conversation.as_str(),
                empty_log(),
            )
            .await?;

        let entry = serde_json::to_value(&message).map_err(StoreError::from)?;
        self.store
            .update(
                &self.config.chats_collection,
                conversation.as_str(),
                vec![(fields::MESSAGES.to_string(), FieldValue::ArrayUnion(entry))],
            )
            .await?;
        Ok(())
    }
}
