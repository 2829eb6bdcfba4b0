//! Application-wide constants
//!
//! Centralized location for the collection and field names that make up the
//! stored document shape. These match the deployed data, so changing them is
//! a data migration, not a refactor.

/// Collection holding one message-log document per conversation.
pub const CHATS_COLLECTION: &str = "chats";

/// Collection holding one directory document per user, keyed by user id.
/// Each directory document maps conversation id -> directory entry.
pub const USER_CHATS_COLLECTION: &str = "userChats";

/// Field names inside stored documents.
pub mod fields {
    /// Ordered message array inside a chat document.
    pub const MESSAGES: &str = "messages";
    /// Counterpart info inside a directory entry.
    pub const USER_INFO: &str = "userInfo";
    /// Last-message preview inside a directory entry (nested object with `text`).
    pub const LAST_MESSAGE: &str = "lastMessage";
    /// Last-activity server timestamp inside a directory entry.
    pub const DATE: &str = "date";
    /// Linked-item metadata inside a directory entry.
    pub const ITEM: &str = "item";
}
