use serde::{Deserialize, Serialize};

use crate::models::UserRef;

/// Linked-item metadata carried on a directory entry when a conversation was
/// started from an item page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    #[serde(rename = "itemId")]
    pub id: String,
    #[serde(rename = "itemTitle")]
    pub title: String,
}

/// Item record as served by the item catalog collaborator. Only consumed to
/// seed conversation metadata for the "chat with owner" action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: String,
    pub title: String,
    pub owner: UserRef,
}

impl ItemRecord {
    /// The metadata stored on both directory entries.
    pub fn link(&self) -> ItemRef {
        ItemRef {
            id: self.id.clone(),
            title: self.title.clone(),
        }
    }
}
