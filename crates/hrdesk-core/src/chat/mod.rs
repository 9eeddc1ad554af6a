//! Chat domain module.
//!
//! This module contains the conversation and message domain models, the
//! snapshot merge engine, and the notification events the chat view consumes.
//!
//! # Module Structure
//!
//! - `conversation`: Conversation record and derived conversation identity
//! - `message`: Chat message model
//! - `merge`: Snapshot merge engine and new-message detection
//! - `event`: Events emitted towards the presentation layer

mod conversation;
mod event;
mod merge;
mod message;

// Re-export public API
pub use conversation::{Conversation, ConversationId};
pub use event::ChatEvent;
pub use merge::{MessageMerger, NewMessageDetector, SnapshotGrowth};
pub use message::ChatMessage;
