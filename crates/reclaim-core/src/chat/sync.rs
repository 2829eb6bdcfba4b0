//! Live sync engine: bridges document subscriptions into view callbacks.
//!
//! Each attached feed owns one forwarding task that delivers the current
//! snapshot immediately and then every committed change, one notification at
//! a time, in commit order. Every notification carries the full state, never
//! a diff. Cancelling a feed removes its callback synchronously, so a torn
//! down view can never observe a late notification.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::chat::directory::ConversationDirectory;
use crate::chat::identity::ConversationId;
use crate::chat::log::MessageLog;
use crate::chat::selector::{Selection, SelectorAction};
use crate::chat::ChatService;
use crate::error::{ChatError, StoreError};
use crate::models::{Directory, ItemRecord, Message, UserRef};
use crate::store::DocumentStore;

/// Owning handle for one live feed.
///
/// `cancel` is idempotent and takes effect before it returns: it removes the
/// registered callback under the same lock the forwarding task delivers
/// under, then aborts the task. Dropping the handle cancels. Cancellation
/// belongs to the owning view; calling `cancel` from inside the feed's own
/// callback deadlocks.
pub struct FeedHandle {
    detach: Box<dyn Fn() + Send + Sync>,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    pub fn cancel(&mut self) {
        (self.detach)();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Spawn the forwarding task for one subscription.
fn spawn_feed<T, P, C>(mut rx: watch::Receiver<Option<Value>>, parse: P, on_change: C) -> FeedHandle
where
    T: Send + 'static,
    P: Fn(Option<&Value>) -> T + Send + 'static,
    C: Fn(T) + Send + 'static,
{
    type Slot<T> = Arc<Mutex<Option<Box<dyn Fn(T) + Send>>>>;
    let slot: Slot<T> = Arc::new(Mutex::new(Some(Box::new(on_change))));

    let task_slot = slot.clone();
    let task = tokio::spawn(async move {
        loop {
            let snapshot = parse(rx.borrow_and_update().clone().as_ref());
            {
                // Delivery happens under the slot lock; cancel() takes the
                // callback under the same lock, so after cancel() returns no
                // further invocation is possible.
                let guard = task_slot.lock();
                match guard.as_ref() {
                    Some(callback) => callback(snapshot),
                    None => break,
                }
            }
            if rx.changed().await.is_err() {
                debug!("feed closed by backend");
                break;
            }
        }
    });

    FeedHandle {
        detach: Box::new(move || {
            slot.lock().take();
        }),
        task: Some(task),
    }
}

/// Attaches live feeds for the messaging page: the signed-in user's
/// directory, and one conversation's message log at a time.
pub struct LiveSync<S> {
    directory: ConversationDirectory<S>,
    log: MessageLog<S>,
}

impl<S: DocumentStore> LiveSync<S> {
    pub fn new(directory: ConversationDirectory<S>, log: MessageLog<S>) -> Self {
        Self { directory, log }
    }

    /// Subscribe to `user_id`'s directory; `on_change` receives the full
    /// directory snapshot immediately and after every change.
    pub async fn attach_directory(
        &self,
        user_id: &str,
        on_change: impl Fn(Directory) + Send + 'static,
    ) -> Result<FeedHandle, StoreError> {
        let watch = self.directory.subscribe(user_id).await?;
        Ok(spawn_feed(
            watch.into_receiver(),
            |doc| Directory::from_document(doc),
            on_change,
        ))
    }

    /// Subscribe to one conversation's log; `on_change` receives the full
    /// ordered message sequence immediately and after every append. A log
    /// that does not exist yet is delivered as an empty sequence.
    pub async fn attach_messages(
        &self,
        conversation: &ConversationId,
        on_change: impl Fn(Vec<Message>) + Send + 'static,
    ) -> Result<FeedHandle, StoreError> {
        let watch = self.log.subscribe(conversation).await?;
        Ok(spawn_feed(
            watch.into_receiver(),
            |doc| Message::log_from_document(doc),
            on_change,
        ))
    }
}

/// Page-level glue for the messaging view: one directory feed, a selection
/// state machine, at most one message feed, and per-conversation draft text.
///
/// The view walks `NoConversationSelected -> ConversationSelected -> ...`
/// via [`ChatView::select`] / [`ChatView::clear_selection`]; there is no
/// pending-creation state, `select` returns only once the conversation
/// concretely exists.
pub struct ChatView<S> {
    service: Arc<ChatService<S>>,
    sync: LiveSync<S>,
    selection: Selection,
    directory_feed: Option<FeedHandle>,
    message_feed: Option<FeedHandle>,
    drafts: HashMap<String, String>,
}

impl<S: DocumentStore> ChatView<S> {
    pub fn new(service: Arc<ChatService<S>>) -> Self {
        let sync = LiveSync::new(service.directory().clone(), service.log().clone());
        Self {
            service,
            sync,
            selection: Selection::None,
            directory_feed: None,
            message_feed: None,
            drafts: HashMap::new(),
        }
    }

    /// Open the messaging page: attach the signed-in user's directory feed.
    pub async fn open(
        &mut self,
        on_directory: impl Fn(Directory) + Send + 'static,
    ) -> Result<(), ChatError> {
        let user = self
            .service
            .session()
            .current()
            .ok_or(ChatError::NotAuthenticated)?;
        if let Some(mut feed) = self.directory_feed.take() {
            feed.cancel();
        }
        let feed = self.sync.attach_directory(&user.id, on_directory).await?;
        self.directory_feed = Some(feed);
        Ok(())
    }

    /// Select the conversation with `counterpart`: derives the id, ensures
    /// the conversation exists on both sides, and swaps the message feed.
    /// The previous feed is cancelled before the new one attaches, so there
    /// is never more than one active message subscription.
    pub async fn select(
        &mut self,
        counterpart: UserRef,
        on_messages: impl Fn(Vec<Message>) + Send + 'static,
    ) -> Result<&ConversationId, ChatError> {
        let me = self
            .service
            .session()
            .current()
            .ok_or(ChatError::NotAuthenticated)?
            .user_ref();
        let next = self
            .selection
            .reduce(SelectorAction::Select { counterpart }, &me)?;

        self.drop_message_feed();
        self.selection = Selection::None;

        let (conversation, counterpart) = match &next {
            Selection::Active {
                conversation,
                counterpart,
            } => (conversation.clone(), counterpart.clone()),
            Selection::None => unreachable!("Select always yields an active state"),
        };

        self.service
            .directory()
            .ensure_conversation(&me, &counterpart, None)
            .await?;
        let feed = self.sync.attach_messages(&conversation, on_messages).await?;

        self.message_feed = Some(feed);
        self.selection = next;
        match &self.selection {
            Selection::Active { conversation, .. } => Ok(conversation),
            Selection::None => unreachable!(),
        }
    }

    /// The chat-with-owner action from an item page: ensures the conversation
    /// with the item linked on both sides, then selects it.
    pub async fn open_item_chat(
        &mut self,
        item: &ItemRecord,
        on_messages: impl Fn(Vec<Message>) + Send + 'static,
    ) -> Result<ConversationId, ChatError> {
        let (conversation, counterpart) = self.service.composer().start_from_item(item).await?;

        self.drop_message_feed();
        let feed = self.sync.attach_messages(&conversation, on_messages).await?;
        self.message_feed = Some(feed);
        self.selection = Selection::Active {
            conversation: conversation.clone(),
            counterpart,
        };
        Ok(conversation)
    }

    /// Deselect: cancel the message feed and return to no-selection.
    pub fn clear_selection(&mut self) {
        self.drop_message_feed();
        self.selection = Selection::None;
    }

    /// Tear the whole view down (navigation away from the messaging page).
    pub fn close(&mut self) {
        self.clear_selection();
        if let Some(mut feed) = self.directory_feed.take() {
            feed.cancel();
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// In-progress text for the active conversation.
    pub fn draft(&self) -> &str {
        self.selection
            .conversation()
            .and_then(|c| self.drafts.get(c.as_str()))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        if let Some(conversation) = self.selection.conversation() {
            self.drafts.insert(conversation.as_str().to_string(), text.into());
        }
    }

    /// Submit the active conversation's draft. The draft is cleared only when
    /// the message was delivered (success or partial directory update); on
    /// validation, authentication or store failure it is kept so the user can
    /// resubmit without retyping.
    pub async fn send_draft(&mut self) -> Result<Message, ChatError> {
        let (conversation, counterpart) = match &self.selection {
            Selection::Active {
                conversation,
                counterpart,
            } => (conversation.clone(), counterpart.clone()),
            Selection::None => {
                return Err(ChatError::Validation(
                    "no conversation selected".to_string(),
                ))
            }
        };
        let text = self
            .drafts
            .get(conversation.as_str())
            .cloned()
            .unwrap_or_default();

        let result = self
            .service
            .composer()
            .send(&conversation, &counterpart, &text)
            .await;
        match &result {
            Ok(_) => {
                self.drafts.remove(conversation.as_str());
            }
            Err(err) if !err.message_not_delivered() => {
                // Delivered despite the stale preview; keeping the draft
                // would invite a duplicate send.
                self.drafts.remove(conversation.as_str());
            }
            Err(_) => {}
        }
        result
    }

    fn drop_message_feed(&mut self) {
        if let Some(mut feed) = self.message_feed.take() {
            feed.cancel();
        }
    }
}
