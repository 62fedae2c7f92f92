//! Application error types with stable codes and HTTP mappings.
//!
//! Every handler returns `Result<_, AppError>`; the `IntoResponse` impl
//! turns the variant into a JSON `ErrorResponse` with the right status.
//! Authentication failures are deliberately collapsed into a single
//! message so callers cannot distinguish a missing cookie from a bad
//! signature or an expired token.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error response for API clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional error context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application error types with proper categorization
#[derive(Debug)]
pub enum AppError {
    // Session failures (401, uniform message)
    Unauthenticated,

    // Wrong username/password or wrong current password (401)
    InvalidCredentials,

    // Validation errors (400)
    InvalidInput { field: String, reason: String },

    // Duplicate username (409)
    Conflict(String),

    // Missing or unowned resource (404)
    NotFound(String),

    // Too many active todos (403)
    QuotaExceeded { current: i64, limit: i64 },

    // Every chat model exhausted (502)
    UpstreamUnavailable(String),

    // Database failures (500, detail kept server-side)
    Database(String),

    // Generic wrapper for unexpected errors (500)
    Internal(anyhow::Error),
}

impl AppError {
    /// Get error code for client identification
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "NOT_AUTHENTICATED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Conflict(_) => "CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
            Self::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message surfaced to the client. 5xx variants get a generic
    /// message; the detail stays in the server logs.
    pub fn message(&self) -> String {
        match self {
            Self::Unauthenticated => "not authenticated".to_string(),
            Self::InvalidCredentials => "invalid credentials".to_string(),
            Self::InvalidInput { field, reason } => {
                format!("invalid input for '{field}': {reason}")
            }
            Self::Conflict(what) => format!("{what} already exists"),
            Self::NotFound(what) => format!("{what} not found"),
            Self::QuotaExceeded { limit, .. } => format!("max {limit} todos allowed"),
            Self::UpstreamUnavailable(_) => {
                "all model endpoints failed or are rate-limited".to_string()
            }
            Self::Database(_) | Self::Internal(_) => "server error".to_string(),
        }
    }

    /// Convert to structured error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.message(),
            details: None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Keep the real failure in the logs, not in the client body.
        if status.is_server_error() {
            match &self {
                Self::Database(detail) => tracing::error!("database error: {detail}"),
                Self::Internal(err) => tracing::error!("internal error: {err:#}"),
                _ => {}
            }
        }

        (status, Json(self.to_response())).into_response()
    }
}

/// Helper trait to convert validation errors
pub trait ValidationErrorExt<T> {
    fn map_validation_err(self, field: &str) -> Result<T>;
}

impl<T> ValidationErrorExt<T> for anyhow::Result<T> {
    fn map_validation_err(self, field: &str) -> Result<T> {
        self.map_err(|e| AppError::InvalidInput {
            field: field.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;
