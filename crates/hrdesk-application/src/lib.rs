//! Application layer for HRDesk.
//!
//! This crate provides the use case services that coordinate the domain
//! core with a concrete document store: the chat session service behind the
//! conversation view and the roster service behind the employee list and
//! dashboard.

pub mod chat_service;
pub mod roster_service;

pub use chat_service::ChatService;
pub use roster_service::RosterService;
