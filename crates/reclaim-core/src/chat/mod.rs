//! The messaging subsystem: conversation identity, per-user directories,
//! append-only logs, composition, and live synchronization.

pub mod composer;
pub mod directory;
pub mod identity;
pub mod log;
pub mod selector;
pub mod sync;

use std::sync::Arc;

use crate::auth::Session;
use crate::config::CoreConfig;
use crate::models::ItemRecord;
use crate::store::DocumentStore;

pub use composer::Composer;
pub use directory::{ConversationDirectory, DirectoryWatch};
pub use identity::ConversationId;
pub use log::{MessageLog, MessageWatch};
pub use selector::{Selection, SelectorAction};
pub use sync::{ChatView, FeedHandle, LiveSync};

/// Handler the item/map views invoke to launch a chat for an item.
///
/// Constructed by the embedding page and passed to each collaborator at
/// construction time. Multiple item views can carry their own handler
/// simultaneously; there is deliberately no process-wide registration point.
pub type ChatStartHandler = Arc<dyn Fn(ItemRecord) + Send + Sync>;

/// Entry point wiring the four messaging contracts over one store.
pub struct ChatService<S> {
    directory: ConversationDirectory<S>,
    log: MessageLog<S>,
    composer: Composer<S>,
    session: Session,
}

impl<S: DocumentStore> ChatService<S> {
    pub fn new(store: Arc<S>, session: Session) -> Self {
        Self::with_config(store, session, CoreConfig::default())
    }

    pub fn with_config(store: Arc<S>, session: Session, config: CoreConfig) -> Self {
        let directory = ConversationDirectory::new(store.clone(), config.clone());
        let log = MessageLog::new(store, config);
        let composer = Composer::new(log.clone(), directory.clone(), session.clone());
        Self {
            directory,
            log,
            composer,
            session,
        }
    }

    pub fn directory(&self) -> &ConversationDirectory<S> {
        &self.directory
    }

    pub fn log(&self) -> &MessageLog<S> {
        &self.log
    }

    pub fn composer(&self) -> &Composer<S> {
        &self.composer
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Build the chat-start handler for an item view, routing selected items
    /// into the given sink (typically the page's action channel).
    pub fn chat_start_handler(
        sink: impl Fn(ItemRecord) + Send + Sync + 'static,
    ) -> ChatStartHandler {
        Arc::new(sink)
    }
}
