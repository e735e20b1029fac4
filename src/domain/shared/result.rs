//! Domain result type

use super::error::DomainError;

/// Standard result type for domain and adapter operations
pub type Result<T> = std::result::Result<T, DomainError>;
