//! API response wrapper types.
//!
//! Successful responses carry their payload as-is; failures use the
//! [`ApiResponse`] envelope so callers can branch on a stable error code.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Error response envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse {
    /// Always `false`.
    pub success: bool,

    /// Error details.
    pub error: ApiError,

    /// Response metadata.
    pub meta: ResponseMeta,
}

/// API error details.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Error code for client handling (e.g., "VALIDATION_ERROR", "TIMEOUT").
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

/// Response metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResponseMeta {
    /// Response timestamp.
    pub timestamp: DateTime<Utc>,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }
}

impl ApiResponse {
    /// Creates an error response.
    pub fn err(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiError {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::default(),
        }
    }
}
