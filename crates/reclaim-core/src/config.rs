use crate::constants;

/// Store-level configuration for the messaging core.
///
/// The defaults match the deployed collection names; tests occasionally
/// override them to isolate fixtures inside a shared store.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Collection holding per-conversation message logs.
    pub chats_collection: String,
    /// Collection holding per-user conversation directories.
    pub user_chats_collection: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            chats_collection: constants::CHATS_COLLECTION.to_string(),
            user_chats_collection: constants::USER_CHATS_COLLECTION.to_string(),
        }
    }
}
