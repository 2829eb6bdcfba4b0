//! Error taxonomy for the messaging core.
//!
//! `ChatError` is the caller-facing taxonomy; `StoreError` is what the
//! document-store contract can fail with. Validation and authentication
//! failures are always detected before any store call is issued.

/// Failures surfaced by the document-store contract.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A field-path update addressed a document that does not exist.
    #[error("document {collection}/{doc_id} not found")]
    NotFound { collection: String, doc_id: String },

    /// Backend/network failure on a read or write.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored document did not match the expected shape.
    #[error("malformed document: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Caller-facing failures of the messaging layer.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Bad input (empty message text, missing or self-referential participant).
    /// Detected before any network call; the user should correct and resubmit.
    #[error("{0}")]
    Validation(String),

    /// Operation attempted with no signed-in user.
    #[error("no signed-in user")]
    NotAuthenticated,

    /// The underlying store failed before the message was delivered.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A directory update failed after the message was already appended.
    /// The message is delivered; one or both conversation previews are stale
    /// until the next successful send in either direction.
    #[error("directory update failed after message delivery in conversation {conversation}")]
    PartialUpdate {
        conversation: String,
        #[source]
        source: StoreError,
    },
}

impl ChatError {
    /// True when the send did not reach the message log and the user's input
    /// should be kept for resubmission.
    pub fn message_not_delivered(&self) -> bool {
        !matches!(self, ChatError::PartialUpdate { .. })
    }
}
