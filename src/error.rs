// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the sync engine and its HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failures of the Withings sync pipeline.
///
/// Lower layers (signing, nonce, token exchange, measurement fetch) return
/// these unchanged; the orchestrator never catches and continues.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No access/refresh token on file for the user.
    #[error("Withings account is not linked")]
    NotLinked,

    /// Network failure or non-success HTTP status.
    #[error("Withings transport error: {0}")]
    Transport(String),

    /// The vendor answered with a structured error (non-zero status or missing body).
    #[error("Withings API error (status {status}): {message}")]
    Protocol { status: i64, message: String },

    /// Refreshing an expired token failed; the user must re-authorize.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(Box<SyncError>),

    #[error("Request signing failed: {0}")]
    Signing(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl SyncError {
    /// Whether the caller may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Withings account is not linked")]
    NotLinked,

    #[error("Sync failed: {0}")]
    SyncFailed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::NotLinked => AppError::NotLinked,
            SyncError::Database(msg) => AppError::Database(msg),
            other => AppError::SyncFailed(other.to_string()),
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::NotLinked => (
                StatusCode::BAD_REQUEST,
                "not_linked",
                Some("Connect your Withings account first".to_string()),
            ),
            AppError::SyncFailed(msg) => {
                // The vendor message is for operators, not users.
                tracing::error!(error = %msg, "Withings sync failed");
                (StatusCode::BAD_GATEWAY, "sync_failed", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
