//! Chat message model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single message in a conversation between HR and one employee.
///
/// Messages are immutable once created. The ordering key is `timestamp`;
/// a message whose timestamp has not been resolved yet (the store has not
/// echoed the write back) sorts after all timestamped messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// System-generated id, unique within the conversation.
    pub id: String,
    /// Sender identity: the fixed HR identifier or the employee's identifier.
    pub sender_id: String,
    /// Message body, non-empty after trimming.
    pub text: String,
    /// Server-assigned creation time; `None` while the write is pending.
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Returns true if the message was sent by the given sender.
    pub fn is_from(&self, sender_id: &str) -> bool {
        self.sender_id == sender_id
    }
}
