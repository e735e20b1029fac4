//! Application layer - Use cases and application services
//!
//! This layer orchestrates domain objects to fulfill use cases.
//! It's responsible for:
//! - Driving the call client from user commands
//! - Folding call events into the observed call state
//! - Recording call history and conference records

pub mod softphone;

pub use softphone::{NotificationLevel, SoftphoneRepositories, SoftphoneService, SoftphoneUpdate};
