// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync trigger routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::SyncReport;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/withings/sync", post(sync_all))
        .route("/api/withings/sync-weights", post(sync_weights))
        .route(
            "/api/withings/sync-body-composition",
            post(sync_body_composition),
        )
}

/// Unified sync response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncResponse {
    pub message: String,
    pub weights_synced: usize,
    pub body_compositions_synced: usize,
    pub total_synced: usize,
    pub last_sync_at: String,
}

/// Single-table sync response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VariantSyncResponse {
    pub message: String,
    pub synced_count: usize,
    pub last_sync_at: String,
}

async fn sync_all(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SyncResponse>> {
    let report = state.sync_service.sync_all(&user.user_id).await?;
    let total_synced = report.total();

    let message = if total_synced == 0 {
        "No new data".to_string()
    } else {
        format!(
            "Synced {} weight and {} body composition records",
            report.weights_synced, report.body_compositions_synced
        )
    };

    Ok(Json(SyncResponse {
        message,
        weights_synced: report.weights_synced,
        body_compositions_synced: report.body_compositions_synced,
        total_synced,
        last_sync_at: format_utc_rfc3339(report.last_sync_at),
    }))
}

async fn sync_weights(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<VariantSyncResponse>> {
    let report = state.sync_service.sync_weights(&user.user_id).await?;
    Ok(Json(variant_response(
        &report,
        report.weights_synced,
        "weight",
    )))
}

async fn sync_body_composition(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<VariantSyncResponse>> {
    let report = state
        .sync_service
        .sync_body_composition(&user.user_id)
        .await?;
    Ok(Json(variant_response(
        &report,
        report.body_compositions_synced,
        "body composition",
    )))
}

fn variant_response(report: &SyncReport, synced_count: usize, noun: &str) -> VariantSyncResponse {
    let message = if synced_count == 0 {
        format!("No new {} data", noun)
    } else {
        format!("Synced {} {} records", synced_count, noun)
    };

    VariantSyncResponse {
        message,
        synced_count,
        last_sync_at: format_utc_rfc3339(report.last_sync_at),
    }
}
