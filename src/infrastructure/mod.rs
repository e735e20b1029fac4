//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Repository implementations
//! - The vendor WebRTC client adapter

pub mod persistence;
pub mod telephony;
