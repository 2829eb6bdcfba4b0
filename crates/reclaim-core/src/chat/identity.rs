use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Canonical identifier of a two-party conversation.
///
/// Derived from the two participant ids by concatenating the
/// lexicographically larger id first, so both sides compute the same id
/// without coordination. The id is part of the stored document shape (chat
/// document ids and directory field paths embed it) and is never regenerated
/// once messages exist.
///
/// Concatenation is not collision-free for adversarial id schemes; the
/// deployed ids are fixed-width opaque strings, which makes distinct pairs
/// distinct in practice. A collision-safe combinator can replace the body of
/// [`ConversationId::derive`] without touching any caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Derive the conversation id for a pair of distinct users.
    /// Commutative: `derive(a, b) == derive(b, a)`.
    pub fn derive(user_a: &str, user_b: &str) -> Result<Self, ChatError> {
        if user_a.is_empty() || user_b.is_empty() {
            return Err(ChatError::Validation(
                "participant id must not be empty".to_string(),
            ));
        }
        if user_a == user_b {
            return Err(ChatError::Validation(
                "cannot open a conversation with yourself".to_string(),
            ));
        }

        let combined = if user_a > user_b {
            format!("{user_a}{user_b}")
        } else {
            format!("{user_b}{user_a}")
        };
        Ok(Self(combined))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
