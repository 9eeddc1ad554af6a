//! Document records, paths and write operations.

use std::collections::BTreeMap;

use serde_json::Value;

/// Path of a single document: its collection plus the document id.
///
/// Nested collections are flattened into the collection string, e.g.
/// `conversations/conv_jane_doe/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    /// Collection the document lives in.
    pub collection: String,
    /// Document id, unique within its collection.
    pub id: String,
}

impl DocumentPath {
    /// Creates a new document path.
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A document as delivered by the store: an id and loosely-shaped fields.
///
/// Documents never reach domain code directly; the schema layer decodes them
/// into typed records and drops anything malformed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Document id, unique within its collection.
    pub id: String,
    /// Raw field values.
    pub fields: serde_json::Map<String, Value>,
}

impl Document {
    /// Creates a document with the given id and no fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: serde_json::Map::new(),
        }
    }

    /// Returns a field value, if present.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// A value to write into a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Write this literal value.
    Set(Value),
    /// Ask the store to assign its own clock value at commit time.
    ///
    /// The caller never supplies timestamps; the store's clock is monotonic
    /// per write, which keeps ordering immune to client clock skew.
    ServerTimestamp,
}

/// An ordered set of fields for a single write.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteFields(BTreeMap<String, FieldValue>);

impl WriteFields {
    /// Creates an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a literal field value.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), FieldValue::Set(value.into()));
        self
    }

    /// Adds a server-assigned timestamp request for a field.
    pub fn server_timestamp(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), FieldValue::ServerTimestamp);
        self
    }

    /// Iterates over the fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Returns true if no fields are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Creates a new document; the commit fails if the path already exists.
    Create {
        path: DocumentPath,
        fields: WriteFields,
    },
    /// Creates the document if absent, otherwise merges the named fields,
    /// leaving unspecified existing fields untouched.
    UpsertMerge {
        path: DocumentPath,
        fields: WriteFields,
    },
}

impl WriteOp {
    /// The path this operation writes to.
    pub fn path(&self) -> &DocumentPath {
        match self {
            Self::Create { path, .. } | Self::UpsertMerge { path, .. } => path,
        }
    }
}
