//! Error taxonomy shared by all handlers.
//!
//! Every variant carries the server-side detail. Only the error code and a
//! generic message are sent to the caller; the detail is logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body is malformed or misses a required field.
    #[error("validation error: {0}")]
    Validation(String),

    /// The target database is on the blocked list.
    #[error("database '{0}' is managed by the provider and cannot be extracted")]
    ProtectedDatabase(String),

    /// The server rejected the supplied credentials.
    #[error("authentication failed: {0}")]
    ConnectionAuth(String),

    /// The target database does not exist.
    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    /// The connection could not be established.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// A catalog query failed after the connection was established.
    #[error("database query error: {0}")]
    DatabaseQuery(String),

    /// A catalog query exceeded the configured timeout.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Anything else (task panics, join failures).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Classifies an error raised while opening a connection.
    ///
    /// SQLSTATE class `28` means bad credentials and `3D000` means the
    /// database does not exist; everything else is a connection failure.
    pub fn from_connect_error(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            match db.code().as_deref() {
                Some(code) if code.starts_with("28") => {
                    return AppError::ConnectionAuth(db.message().to_string())
                }
                Some("3D000") => return AppError::DatabaseNotFound(db.message().to_string()),
                _ => {}
            }
        }
        AppError::DatabaseConnection(err.to_string())
    }

    /// Stable error code sent to the caller.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::ProtectedDatabase(_) => "PROTECTED_DATABASE",
            AppError::ConnectionAuth(_) => "AUTHENTICATION_FAILED",
            AppError::DatabaseNotFound(_) => "DATABASE_NOT_FOUND",
            AppError::DatabaseConnection(_) => "CONNECTION_ERROR",
            AppError::DatabaseQuery(_) => "EXTRACTION_ERROR",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ProtectedDatabase(_) => StatusCode::FORBIDDEN,
            AppError::ConnectionAuth(_) => StatusCode::UNAUTHORIZED,
            AppError::DatabaseNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseConnection(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseQuery(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Message safe to return to the caller.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::ProtectedDatabase(_) => self.to_string(),
            AppError::ConnectionAuth(_) => "Authentication with the database server failed".into(),
            AppError::DatabaseNotFound(_) => "The requested database does not exist".into(),
            AppError::DatabaseConnection(_) => "Could not connect to the database server".into(),
            AppError::DatabaseQuery(_) => "Error querying the database catalog".into(),
            AppError::Timeout(_) => "The database did not respond in time".into(),
            AppError::Internal(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::warn!(code = self.code(), error = %self, "request rejected");
        }

        let body = ApiResponse::err(self.code(), self.public_message());
        (status, Json(body)).into_response()
    }
}
