// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use weight_tracker::error::{AppError, SyncError};

fn status_of(err: SyncError) -> StatusCode {
    AppError::from(err).into_response().status()
}

#[test]
fn test_sync_error_status_mapping() {
    assert_eq!(status_of(SyncError::NotLinked), StatusCode::BAD_REQUEST);
    assert_eq!(
        status_of(SyncError::Database("down".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        status_of(SyncError::Transport("timeout".to_string())),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        status_of(SyncError::Protocol {
            status: 401,
            message: "invalid_token".to_string()
        }),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        status_of(SyncError::RefreshFailed(Box::new(SyncError::Transport(
            "reset".to_string()
        )))),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        status_of(SyncError::Signing("bad key".to_string())),
        StatusCode::BAD_GATEWAY
    );
}

#[test]
fn test_only_transport_is_retryable() {
    assert!(SyncError::Transport("timeout".to_string()).is_retryable());
    assert!(!SyncError::NotLinked.is_retryable());
    assert!(!SyncError::Protocol {
        status: 503,
        message: "Invalid params".to_string()
    }
    .is_retryable());
    assert!(!SyncError::RefreshFailed(Box::new(SyncError::Transport(
        "reset".to_string()
    )))
    .is_retryable());
}

#[test]
fn test_refresh_failed_keeps_cause() {
    let err = SyncError::RefreshFailed(Box::new(SyncError::Protocol {
        status: 401,
        message: "invalid refresh token".to_string(),
    }));
    assert!(err.to_string().contains("invalid refresh token"));
}
