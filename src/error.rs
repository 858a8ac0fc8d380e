//! Error types for the workflows

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::convert::ConvertError;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The external identifier already has a record. Expected during
    /// re-imports and handled as an early exit by the orchestrators.
    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Conversion(#[from] ConvertError),

    #[error("Missing asset for {id}: {message}")]
    MissingAsset { id: String, message: String },

    #[error("Upstream error on {id}: {message}")]
    Upstream { id: String, message: String },

    #[error("Stale write on {0}")]
    StaleWrite(String),

    #[error("Validation error on {id}: {message}")]
    Validation { id: String, message: String },

    #[error("Record {0} is not yet updated in the registry")]
    NotYetUpdated(String),

    /// Recoverable condition, logged at warn level by batch sweeps
    #[error("Warning: {0}")]
    Warning(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Locked: {0}")]
    Locked(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wrap an upstream service failure together with the identifier being processed
    pub fn upstream(id: impl Into<String>, error: impl std::fmt::Display) -> Self {
        AppError::Upstream {
            id: id.into(),
            message: error.to_string(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, AppError::Duplicate(_))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, AppError::Warning(_))
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Locked(_) => (StatusCode::LOCKED, "locked"),
            AppError::Duplicate(_) => (StatusCode::CONFLICT, "duplicate"),
            AppError::StaleWrite(_) => (StatusCode::CONFLICT, "stale_write"),
            AppError::Validation { .. } | AppError::Conversion(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation")
            }
            AppError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream"),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database")
            }
            _ => {
                tracing::error!("Internal error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
