//! Interface layer - External interfaces (REST API, WebSocket)
//!
//! This layer handles:
//! - REST API endpoints for records and softphone commands
//! - WebSocket streaming of softphone updates
//! - Request/response formatting

pub mod api;
