//! Events emitted towards the presentation layer.

use serde::{Deserialize, Serialize};

use super::message::ChatMessage;

/// High-level events the chat view consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The merged message list changed; replaces the rendered list wholesale.
    MessagesUpdated {
        messages: Vec<ChatMessage>,
    },
    /// A counterpart message arrived after the initial history load.
    NewMessage {
        sender_id: String,
    },
    /// Opening the live message stream failed; the view should surface a
    /// dismissible notification.
    SubscribeFailed {
        reason: String,
    },
    /// A send failed; the draft text must be preserved so the user can retry.
    SendFailed {
        reason: String,
    },
}
