use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Current Unix timestamp in milliseconds.
fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One chat message, immutable once appended to a conversation log.
///
/// `sent_at` is the client-observed time at composition; the order of a
/// conversation log is its append order, not a sort over this field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    #[serde(rename = "senderId")]
    pub sender_id: String,
    #[serde(rename = "sentAt", default)]
    pub sent_at: u64,
}

impl Message {
    /// New message with a fresh uuid and the current client time. The caller
    /// is responsible for trimming and validating `text` first.
    pub fn new(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender_id: sender_id.into(),
            sent_at: now_millis(),
        }
    }

    /// Parse the ordered message array out of a chat document. A missing
    /// document or missing array is an empty log; entries that do not parse
    /// are skipped rather than failing the whole snapshot.
    pub fn log_from_document(doc: Option<&Value>) -> Vec<Message> {
        let Some(entries) = doc
            .and_then(|d| d.get(crate::constants::fields::MESSAGES))
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .collect()
    }
}
