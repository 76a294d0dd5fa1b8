//! Domain error types for the build results server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage (S3 / filesystem) operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// A storage read or listing did not finish in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// A started/finished marker exists but is not a well-formed JSON object
    #[error("Malformed metadata in {path}: {message}")]
    MalformedMetadata { path: String, message: String },
}

impl AppError {
    /// Whether the error should be treated as "object absent" by presence checks.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AppError::Timeout(_))
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_code) = match self {
            AppError::NotFound(_) => (actix_web::http::StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::InvalidInput(_) => {
                (actix_web::http::StatusCode::BAD_REQUEST, "INVALID_INPUT")
            }
            AppError::Storage(err_str) => {
                tracing::error!("Storage error: {}", err_str);
                (actix_web::http::StatusCode::BAD_GATEWAY, "STORAGE_ERROR")
            }
            AppError::Timeout(_) => (actix_web::http::StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            AppError::MalformedMetadata { .. } => (
                actix_web::http::StatusCode::BAD_GATEWAY,
                "MALFORMED_METADATA",
            ),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_code.to_string(),
            message: self.to_string(),
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(format!("I/O error: {}", err))
    }
}
