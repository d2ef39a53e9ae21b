//! Domain error types for StarSling.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.
//! Client-facing bodies are always `{"error": "..."}`; internal detail is logged only.

use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::services::event_dispatcher::QueueError;
use crate::services::github_app::GitHubError;
use crate::services::token_cipher::CryptoError;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed, expired or mismatched input
    #[error("{0}")]
    Validation(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// GitHub API call failed or returned an unexpected shape
    #[error("GitHub API error: {0}")]
    GitHubApi(#[from] GitHubError),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Event queue rejected or could not receive an event
    #[error("Event queue error: {0}")]
    Queue(#[from] QueueError),

    /// Token encryption or decryption failed
    #[error("Encryption error: {0}")]
    Crypto(#[from] CryptoError),

    /// Anything else caught at the handler boundary
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the GitHub API reported the resource as missing.
    pub fn is_github_not_found(&self) -> bool {
        matches!(self, AppError::GitHubApi(GitHubError::NotFound(_)))
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, message) = match self {
            AppError::Validation(msg) => (actix_web::http::StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(_) => (actix_web::http::StatusCode::NOT_FOUND, self.to_string()),
            AppError::Unauthorized(_) => (
                actix_web::http::StatusCode::UNAUTHORIZED,
                "Unauthorized".to_string(),
            ),
            AppError::GitHubApi(err) => {
                tracing::error!(error = %err, "GitHub API error");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Database(err_str) => {
                tracing::error!("Database error: {}", err_str);
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Queue(err) => {
                tracing::error!(error = %err, "Event queue error");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Crypto(err) => {
                tracing::error!(error = %err, "Encryption error");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(err_str) => {
                tracing::error!("Internal error: {}", err_str);
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status).json(ErrorResponse::new(message))
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("Invalid UUID: {}", err))
    }
}
