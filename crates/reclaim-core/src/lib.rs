//! Messaging core for the Reclaim lost & found marketplace.
//!
//! This crate is the real-time chat layer consumed by page-level views:
//! deterministic conversation identity, per-user conversation directories,
//! append-only message logs, and a live sync engine that bridges document
//! subscriptions into view callbacks. The backing store is abstracted behind
//! [`store::DocumentStore`]; [`store::MemoryStore`] is the in-process
//! reference backend used by tests and local mode.

pub mod auth;
pub mod chat;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod store;
pub mod tracing_setup;

pub use auth::{Session, UserProfile};
pub use chat::identity::ConversationId;
pub use chat::sync::{ChatView, FeedHandle, LiveSync};
pub use chat::{ChatService, ChatStartHandler};
pub use config::CoreConfig;
pub use error::{ChatError, StoreError};
pub use models::{Directory, DirectoryEntry, ItemRecord, ItemRef, Message, UserRef};
pub use store::{DocumentStore, FieldValue, MemoryStore};
