//! Infrastructure layer for HRDesk.
//!
//! This crate provides the concrete backends behind the core's seams: the
//! in-memory realtime document store and the TOML configuration service.

pub mod config_service;
pub mod memory_store;
pub mod paths;

pub use config_service::ConfigService;
pub use memory_store::InMemoryDocumentStore;
pub use paths::HrdeskPaths;
