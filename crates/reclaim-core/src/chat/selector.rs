//! Reducer-style state for the currently active conversation.
//!
//! Ephemeral per-session state: created when the messaging view opens,
//! discarded on navigation away, never persisted. There is no pending state:
//! selection always carries a concrete conversation id, derived at the moment
//! of selection.

use crate::chat::identity::ConversationId;
use crate::error::ChatError;
use crate::models::UserRef;

/// Which conversation the view is showing, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Active {
        conversation: ConversationId,
        counterpart: UserRef,
    },
}

/// The only two transitions the view can request.
#[derive(Debug, Clone)]
pub enum SelectorAction {
    /// Open the conversation with `counterpart` (from the directory list or a
    /// chat-with-owner action).
    Select { counterpart: UserRef },
    /// Deselect, on navigation away.
    Clear,
}

impl Selection {
    /// Apply an action for the signed-in user, returning the next state.
    /// Selecting derives the conversation id; an invalid pair (self-chat,
    /// empty id) is rejected and the state is unchanged.
    pub fn reduce(&self, action: SelectorAction, current_user: &UserRef) -> Result<Selection, ChatError> {
        match action {
            SelectorAction::Select { counterpart } => {
                let conversation = ConversationId::derive(&current_user.id, &counterpart.id)?;
                Ok(Selection::Active {
                    conversation,
                    counterpart,
                })
            }
            SelectorAction::Clear => Ok(Selection::None),
        }
    }

    pub fn conversation(&self) -> Option<&ConversationId> {
        match self {
            Selection::None => None,
            Selection::Active { conversation, .. } => Some(conversation),
        }
    }

    pub fn counterpart(&self) -> Option<&UserRef> {
        match self {
            Selection::None => None,
            Selection::Active { counterpart, .. } => Some(counterpart),
        }
    }
}
