//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered as an HTTP response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use study_shield_core::{CoreError, PortError};

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A domain-level error from the core operations.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Represents an error that propagated up from the entity store port.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A malformed request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Core(core) => match core {
                CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::InvalidState(msg) => {
                    (StatusCode::BAD_REQUEST, "INVALID_STATE", msg.clone())
                }
                CoreError::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone())
                }
                CoreError::InsufficientFunds { .. } => (
                    StatusCode::BAD_REQUEST,
                    "INSUFFICIENT_FUNDS",
                    "Not enough coins".to_string(),
                ),
                CoreError::Unauthorized => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    core.to_string(),
                ),
                CoreError::Internal(_) => internal(),
            },
            ApiError::Port(PortError::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone())
            }
            ApiError::Port(PortError::Unauthorized) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Could not validate credentials".to_string(),
            ),
            ApiError::Port(PortError::Conflict(msg)) => {
                (StatusCode::BAD_REQUEST, "CONFLICT", msg.clone())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            _ => internal(),
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
        }
        let body = json!({
            "error": message,
            "code": code,
        });
        (status, axum::Json(body)).into_response()
    }
}
