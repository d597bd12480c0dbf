// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Withings account-linking routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::withings::authorize_url;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Signed OAuth state older than this is rejected.
const STATE_MAX_AGE_MS: i64 = 15 * 60 * 1000;

/// Public routes (the vendor redirects here without our bearer token).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/withings/callback", get(auth_callback))
}

/// Routes that need an authenticated user.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/withings/auth", get(auth_start))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthStartResponse {
    pub authorize_url: String,
}

/// Start the OAuth flow: hand the client the vendor authorization URL.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AuthStartResponse>> {
    let now_ms = chrono::Utc::now().timestamp_millis();
    let oauth_state = sign_state(&user.user_id, now_ms, &state.config.oauth_state_key)?;

    tracing::info!(user_id = %user.user_id, "Starting Withings OAuth flow");

    Ok(Json(AuthStartResponse {
        authorize_url: authorize_url(
            &state.config.withings_client_id,
            &state.config.withings_redirect_uri,
            &oauth_state,
        ),
    }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: link the account, run a first sync, bounce back to the frontend.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend_url = state.config.frontend_url.trim_end_matches('/');
    let redirect_error =
        |reason: &str| Redirect::temporary(&format!("{}/?withings_error={}", frontend_url, reason));

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Withings authorization denied");
        return redirect_error("auth_denied");
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return redirect_error("no_code");
    };

    let now_ms = chrono::Utc::now().timestamp_millis();
    let Some(user_id) = params
        .state
        .as_deref()
        .and_then(|s| verify_state(s, &state.config.oauth_state_key, now_ms))
    else {
        tracing::warn!("Invalid or expired OAuth state parameter");
        return redirect_error("invalid_state");
    };

    if let Err(e) = state.sync_service.link_account(&user_id, &code).await {
        tracing::error!(user_id = %user_id, error = %e, "Withings account linking failed");
        return redirect_error("callback_failed");
    }

    match state.sync_service.sync_all(&user_id).await {
        Ok(report) => tracing::info!(
            user_id = %user_id,
            total = report.total(),
            "Initial Withings sync complete"
        ),
        Err(e) => {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Initial Withings sync failed, continuing"
            )
        }
    }

    Redirect::temporary(&format!("{}/?withings_success=connected", frontend_url))
}

/// Sign `user_id|ts_hex` and encode it for the OAuth `state` parameter.
pub fn sign_state(user_id: &str, now_ms: i64, key: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", user_id, now_ms);

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify a state produced by [`sign_state`] and return its user id.
pub fn verify_state(state: &str, key: &[u8], now_ms: i64) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Split from the right: the user id may itself contain '|'
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let user_id = parts.next()?;

    let payload = format!("{}|{}", user_id, timestamp_hex);
    let signature = hex::decode(signature_hex).ok()?;

    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(payload.as_bytes());
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch");
        return None;
    }

    let issued_at = i64::from_str_radix(timestamp_hex, 16).ok()?;
    let age = now_ms - issued_at;
    if !(0..=STATE_MAX_AGE_MS).contains(&age) {
        tracing::warn!(age_ms = age, "OAuth state outside validity window");
        return None;
    }

    (!user_id.is_empty()).then(|| user_id.to_string())
}
