//! Softphone - call state reconciliation for a WebRTC softphone
//!
//! A Domain-Driven Design implementation: a call client adapter over the
//! vendor SDK, a reducer folding its events into UI state, and a small REST
//! surface for call history, contacts, settings and conference records.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;
