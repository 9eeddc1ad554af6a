//! Document store contract.
//!
//! This module defines the boundary between the panel core and the backing
//! realtime document store, plus the schema layer that validates loosely-shaped
//! store documents before they reach domain code.
//!
//! # Module Structure
//!
//! - `document`: Document records, paths and write operations
//! - `query`: Filter/order specifications for live queries
//! - `subscription`: Live snapshot stream handles
//! - `schema`: Typed decode/encode at the store boundary

mod document;
mod query;
pub mod schema;
mod subscription;

// Re-export public API
pub use document::{Document, DocumentPath, FieldValue, WriteFields, WriteOp};
pub use query::{FieldFilter, Query};
pub use subscription::{Snapshot, Subscription};

use crate::error::Result;
use async_trait::async_trait;

/// An abstract realtime document store.
///
/// This trait defines the contract the panel core expects from its backing
/// store, decoupling conversation and roster logic from the concrete storage
/// mechanism (in-memory reference store, hosted document database, ...).
///
/// # Implementation Notes
///
/// Implementations must guarantee:
/// - A subscription first delivers the full current result set of its query,
///   then a snapshot after every commit that changes the result
/// - No snapshot is delivered to a cancelled subscription
/// - Server-assigned timestamps are monotonic across writes
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Opens a live query subscription.
    ///
    /// # Returns
    ///
    /// - `Ok(Subscription)`: Snapshots flow until the handle is cancelled or dropped
    /// - `Err(_)`: The subscription could not be opened
    async fn subscribe(&self, query: Query) -> Result<Subscription>;

    /// Writes fields into a document, creating it if absent.
    ///
    /// Existing fields not named in `fields` are left untouched.
    async fn upsert_merge(&self, path: DocumentPath, fields: WriteFields) -> Result<()>;

    /// Applies a list of write operations as one all-or-nothing unit.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Every operation was applied
    /// - `Err(_)`: No operation was applied
    async fn commit(&self, ops: Vec<WriteOp>) -> Result<()>;
}
