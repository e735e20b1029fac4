//! Domain errors

use thiserror::Error;

/// Domain result type
pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Neither a login token nor a username/password pair was supplied
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The vendor session failed or could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not connected: no active session")]
    NotConnected,

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl DomainError {
    pub fn validation(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        DomainError::Validation {
            message: message.into(),
            errors,
        }
    }

    /// Validation failure on a single field
    pub fn invalid_field(path: &str, message: &str) -> Self {
        Self::validation(
            format!("Invalid {}", path),
            vec![FieldError::new(path, message)],
        )
    }
}
