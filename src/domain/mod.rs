//! Domain layer - Core softphone rules
//!
//! This layer contains:
//! - Call events and the call state reducer
//! - Value objects shared across contexts
//! - Persisted records (call logs, contacts, settings, conferences)
//! - Repository interfaces: ports for persistence

pub mod call;
pub mod call_log;
pub mod conference;
pub mod contact;
pub mod settings;
pub mod shared;

// Re-export commonly used types
pub use shared::{DomainError, Result};
