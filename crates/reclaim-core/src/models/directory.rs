//! Per-user conversation directory.
//!
//! Each user owns one directory document mapping conversation id to a summary
//! entry: who the counterpart is, when the conversation last moved, a preview
//! of the last message, and the linked item when the chat was started from an
//! item page.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ItemRef, UserRef};

/// Last-message preview, stored as a nested object (`lastMessage.text`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub text: String,
}

/// One conversation summary inside a user's directory document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// The other participant, as last written by either side's composer.
    #[serde(rename = "userInfo")]
    pub counterpart: UserRef,
    /// Server-assigned last-activity timestamp (millis, monotonic).
    #[serde(rename = "date", default)]
    pub last_activity: u64,
    #[serde(rename = "lastMessage", default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Preview>,
    #[serde(rename = "item", default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemRef>,
}

impl DirectoryEntry {
    pub fn preview(&self) -> Option<&str> {
        self.last_message.as_ref().map(|p| p.text.as_str())
    }
}

/// Full snapshot of one user's directory document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: HashMap<String, DirectoryEntry>,
}

impl Directory {
    /// Parse a directory document. `None` (document not yet created) is an
    /// empty directory; entries that do not parse are skipped.
    pub fn from_document(doc: Option<&Value>) -> Self {
        let Some(map) = doc.and_then(Value::as_object) else {
            return Self::default();
        };

        let entries = map
            .iter()
            .filter_map(|(conversation_id, raw)| {
                let entry: DirectoryEntry = serde_json::from_value(raw.clone()).ok()?;
                Some((conversation_id.clone(), entry))
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, conversation_id: &str) -> Option<&DirectoryEntry> {
        self.entries.get(conversation_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by descending last activity, the order the conversation
    /// list renders in.
    pub fn entries_by_recency(&self) -> Vec<(&str, &DirectoryEntry)> {
        let mut entries: Vec<(&str, &DirectoryEntry)> = self
            .entries
            .iter()
            .map(|(id, entry)| (id.as_str(), entry))
            .collect();
        entries.sort_by(|a, b| b.1.last_activity.cmp(&a.1.last_activity));
        entries
    }
}
