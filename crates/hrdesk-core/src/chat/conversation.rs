//! Conversation record and derived conversation identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::DocumentPath;

/// Prefix of every derived conversation id.
const ID_PREFIX: &str = "conv_";

/// Stable identifier of a 1:1 channel between HR and one employee.
///
/// The id is a pure function of the employee's name: trimmed, lowercased,
/// whitespace runs collapsed to single underscores, prefixed with `conv_`.
/// Re-deriving it for the same employee always yields the same conversation.
///
/// Known limitation: two display names that differ only in case or
/// whitespace collapse to the same conversation. Uniqueness of the derived
/// id is only as good as the uniqueness of employee names upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    /// Derives the conversation id for an employee.
    ///
    /// # Returns
    ///
    /// `None` when the name is empty or whitespace-only (no employee
    /// selected), so callers cannot accidentally open a conversation
    /// against a blank identity.
    pub fn for_employee(employee_name: &str) -> Option<Self> {
        let slug = employee_name
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        if slug.is_empty() {
            return None;
        }
        Some(Self(format!("{ID_PREFIX}{slug}")))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the conversation document inside its root collection.
    pub fn doc_path(&self, conversations_collection: &str) -> DocumentPath {
        DocumentPath::new(conversations_collection, self.0.clone())
    }

    /// Collection holding this conversation's messages.
    pub fn messages_collection(&self, conversations_collection: &str) -> String {
        format!("{}/{}/messages", conversations_collection, self.0)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The conversation record as stored: participants plus the list preview.
///
/// Created lazily the first time either party opens the chat, updated on
/// every send, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Derived conversation id.
    pub id: String,
    /// Display names: HR first, employee second.
    #[serde(default)]
    pub participant_names: Vec<String>,
    /// Text of the most recent message, for list previews.
    #[serde(default)]
    pub last_message: Option<String>,
    /// Server-assigned time of the most recent message.
    #[serde(default)]
    pub last_message_timestamp: Option<DateTime<Utc>>,
}
