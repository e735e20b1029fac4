//! API error responses

use crate::domain::shared::error::{DomainError, FieldError};
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

/// Error body: `{message}` or `{message, errors}` for validation failures
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    /// Malformed request body or path
    BadRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::Domain(DomainError::NotFound(format!("{} not found", what)))
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(e) => match e {
                DomainError::Auth(_) => StatusCode::UNAUTHORIZED,
                DomainError::Connection(_) => StatusCode::BAD_GATEWAY,
                DomainError::NotConnected => StatusCode::CONFLICT,
                DomainError::Validation { .. } => StatusCode::BAD_REQUEST,
                DomainError::InvalidOperation(_) => StatusCode::CONFLICT,
                DomainError::NotFound(_) => StatusCode::NOT_FOUND,
                DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        ApiError::Domain(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest(message) => {
                warn!("API: bad request: {}", message);
                ErrorBody {
                    message,
                    errors: None,
                }
            }
            ApiError::Domain(DomainError::Validation { message, errors }) => {
                warn!("API: validation failed: {}", message);
                ErrorBody {
                    message,
                    errors: Some(errors),
                }
            }
            ApiError::Domain(DomainError::NotFound(message)) => ErrorBody {
                message,
                errors: None,
            },
            ApiError::Domain(e) => {
                if status.is_server_error() {
                    error!("API: request failed: {}", e);
                } else {
                    warn!("API: request rejected: {}", e);
                }
                ErrorBody {
                    message: e.to_string(),
                    errors: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}
