//! Typed decode/encode at the store boundary.
//!
//! Store documents are loosely shaped; this module is the only place that
//! knows their field names and wire types. Decoding fails closed: a document
//! that does not match the expected shape is dropped and logged, never
//! propagated into the merge engine or the roster.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::chat::{ChatMessage, Conversation};
use crate::directory::FeedbackRecord;
use crate::store::{Document, Snapshot, WriteFields};

/// Store field names.
pub mod fields {
    pub const SENDER_ID: &str = "senderId";
    pub const TEXT: &str = "text";
    pub const TIMESTAMP: &str = "timestamp";
    pub const PARTICIPANT_NAMES: &str = "participantNames";
    pub const LAST_MESSAGE: &str = "lastMessage";
    pub const LAST_MESSAGE_TIMESTAMP: &str = "lastMessageTimestamp";
    pub const EMPLOYEE_NAME: &str = "employeeName";
    pub const SCORE: &str = "score";
    pub const NOTES: &str = "notes";
    pub const DATE: &str = "date";
}

// ============================================================================
// Timestamps (wire format: milliseconds since epoch)
// ============================================================================

/// Encodes a timestamp into its wire value.
pub fn encode_timestamp(timestamp: DateTime<Utc>) -> Value {
    Value::from(timestamp.timestamp_millis())
}

/// Decodes a wire timestamp value.
pub fn decode_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value.as_i64()?)
}

// A field that is absent or null is "unset"; a present field of the wrong
// shape is malformed and poisons the whole record.
enum FieldState<T> {
    Unset,
    Valid(T),
    Malformed,
}

fn optional_timestamp(document: &Document, field: &str) -> FieldState<DateTime<Utc>> {
    match document.field(field) {
        None | Some(Value::Null) => FieldState::Unset,
        Some(value) => match decode_timestamp(value) {
            Some(timestamp) => FieldState::Valid(timestamp),
            None => FieldState::Malformed,
        },
    }
}

fn optional_string(document: &Document, field: &str) -> FieldState<String> {
    match document.field(field) {
        None | Some(Value::Null) => FieldState::Unset,
        Some(Value::String(text)) => FieldState::Valid(text.clone()),
        Some(_) => FieldState::Malformed,
    }
}

fn required_string(document: &Document, field: &str) -> Option<String> {
    match document.field(field)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Decodes one message document, or `None` if malformed.
pub fn decode_message(document: &Document) -> Option<ChatMessage> {
    let sender_id = required_string(document, fields::SENDER_ID)?;
    let text = match optional_string(document, fields::TEXT) {
        FieldState::Valid(text) => text,
        FieldState::Unset | FieldState::Malformed => return None,
    };
    let timestamp = match optional_timestamp(document, fields::TIMESTAMP) {
        FieldState::Unset => None,
        FieldState::Valid(timestamp) => Some(timestamp),
        FieldState::Malformed => return None,
    };
    Some(ChatMessage {
        id: document.id.clone(),
        sender_id,
        text,
        timestamp,
    })
}

/// Decodes a message snapshot, dropping and logging malformed documents.
pub fn decode_messages(snapshot: &Snapshot) -> Vec<ChatMessage> {
    decode_all(snapshot, "message", decode_message)
}

/// Fields of a new outbound message; the timestamp is server-assigned.
pub fn message_fields(sender_id: &str, text: &str) -> WriteFields {
    WriteFields::new()
        .set(fields::SENDER_ID, sender_id)
        .set(fields::TEXT, text)
        .server_timestamp(fields::TIMESTAMP)
}

// ============================================================================
// Conversations
// ============================================================================

/// Decodes one conversation document, or `None` if malformed.
pub fn decode_conversation(document: &Document) -> Option<Conversation> {
    let participant_names = match document.field(fields::PARTICIPANT_NAMES) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| value.as_str().map(str::to_string))
            .collect::<Option<Vec<String>>>()?,
        Some(_) => return None,
    };
    let last_message = match optional_string(document, fields::LAST_MESSAGE) {
        FieldState::Unset => None,
        FieldState::Valid(text) => Some(text),
        FieldState::Malformed => return None,
    };
    let last_message_timestamp = match optional_timestamp(document, fields::LAST_MESSAGE_TIMESTAMP)
    {
        FieldState::Unset => None,
        FieldState::Valid(timestamp) => Some(timestamp),
        FieldState::Malformed => return None,
    };
    Some(Conversation {
        id: document.id.clone(),
        participant_names,
        last_message,
        last_message_timestamp,
    })
}

/// Fields for an "ensure the conversation exists" upsert.
///
/// Deliberately writes only the participant list: an ensure call merged into
/// an existing conversation must never clobber `lastMessage` or its
/// timestamp with stale data.
pub fn participants_fields(participant_names: &[String]) -> WriteFields {
    WriteFields::new().set(
        fields::PARTICIPANT_NAMES,
        Value::from(participant_names.to_vec()),
    )
}

/// Fields of the conversation-preview update that rides along with a send.
pub fn conversation_preview(participant_names: &[String], last_message: &str) -> WriteFields {
    participants_fields(participant_names)
        .set(fields::LAST_MESSAGE, last_message)
        .server_timestamp(fields::LAST_MESSAGE_TIMESTAMP)
}

// ============================================================================
// Feedback
// ============================================================================

/// Decodes one feedback document, or `None` if malformed.
pub fn decode_feedback(document: &Document) -> Option<FeedbackRecord> {
    let employee_name = required_string(document, fields::EMPLOYEE_NAME)?;
    let score = match document.field(fields::SCORE) {
        None | Some(Value::Null) => None,
        Some(value) => Some(u8::try_from(value.as_i64()?).ok()?),
    };
    let notes = match optional_string(document, fields::NOTES) {
        FieldState::Unset => None,
        FieldState::Valid(text) => Some(text),
        FieldState::Malformed => return None,
    };
    let date = match optional_timestamp(document, fields::DATE) {
        FieldState::Unset => None,
        FieldState::Valid(timestamp) => Some(timestamp),
        FieldState::Malformed => return None,
    };
    Some(FeedbackRecord {
        id: document.id.clone(),
        employee_name,
        score,
        notes,
        date,
    })
}

/// Decodes a feedback snapshot, dropping and logging malformed documents.
pub fn decode_feedback_records(snapshot: &Snapshot) -> Vec<FeedbackRecord> {
    decode_all(snapshot, "feedback", decode_feedback)
}

fn decode_all<T>(
    snapshot: &Snapshot,
    kind: &str,
    decode: fn(&Document) -> Option<T>,
) -> Vec<T> {
    snapshot
        .docs
        .iter()
        .filter_map(|document| {
            let decoded = decode(document);
            if decoded.is_none() {
                warn!("[schema] dropping malformed {} document '{}'", kind, document.id);
            }
            decoded
        })
        .collect()
}
