// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Withings API client for the signed OAuth flow and measurement fetches.
//!
//! Handles:
//! - Nonce retrieval (`/v2/signature`, `action=getnonce`)
//! - Authorization-code exchange and token refresh (`/v2/oauth2`)
//! - Measurement fetches (`/v2/measure`, `action=getmeas`)
//!
//! Every signed call after the nonce signs only `{action, client_id, nonce}`
//! while the request body carries the full parameter set. Nonces are
//! single-use, so each signed call fetches its own.

use crate::config::Config;
use crate::error::SyncError;
use crate::models::withings::{MeasureBody, NonceBody, TokenResponse, WithingsEnvelope};
use crate::services::measures::MeasureType;
use crate::services::signature::sign_params;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// User-facing authorization page.
pub const AUTHORIZE_URL: &str = "https://account.withings.com/oauth2_user/authorize2";

/// Scopes requested when linking an account.
pub const OAUTH_SCOPES: &str = "user.info,user.metrics";

/// `category=1` selects real measurements and excludes user objectives.
const CATEGORY_REAL_MEASURES: &str = "1";

/// Which measurement types a fetch asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureSelection {
    /// Weight readings only (`meastypes=1`)
    WeightOnly,
    /// Every type the sync engine knows how to decode
    AllKnown,
}

impl MeasureSelection {
    /// Value of the `meastypes` form field.
    pub fn meastypes(self) -> String {
        match self {
            MeasureSelection::WeightOnly => MeasureType::Weight.code().to_string(),
            MeasureSelection::AllKnown => MeasureType::ALL
                .iter()
                .map(|t| t.code().to_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Build the URL the user visits to grant access.
pub fn authorize_url(client_id: &str, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
        AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(OAUTH_SCOPES),
        urlencoding::encode(state),
    )
}

/// Vendor operations the sync engine depends on.
#[async_trait]
pub trait WithingsApi: Send + Sync {
    /// Exchange an authorization code for a token pair.
    async fn exchange_authorization_code(&self, code: &str) -> Result<TokenResponse, SyncError>;

    /// Exchange a refresh token for a new token pair.
    async fn refresh_access_token(&self, refresh_token: &str)
        -> Result<TokenResponse, SyncError>;

    /// Fetch measurement groups captured in `[start, end]` (Unix seconds).
    async fn get_measurements(
        &self,
        access_token: &str,
        selection: MeasureSelection,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<MeasureBody, SyncError>;
}

/// Grant used for `action=requesttoken`.
enum TokenGrant<'a> {
    AuthorizationCode(&'a str),
    RefreshToken(&'a str),
}

/// Withings API client.
#[derive(Clone)]
pub struct WithingsClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl WithingsClient {
    /// Create a client against the given API base URL.
    pub fn new(
        base_url: impl Into<String>,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.withings_api_base.clone(),
            config.withings_client_id.clone(),
            config.withings_client_secret.clone(),
            config.withings_redirect_uri.clone(),
        )
    }

    /// Fetch a fresh single-use nonce.
    pub async fn get_nonce(&self) -> Result<String, SyncError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signed = [
            ("action", "getnonce"),
            ("client_id", self.client_id.as_str()),
            ("timestamp", timestamp.as_str()),
        ];
        let signature = sign_params(&signed, &self.client_secret)?;

        let mut form = signed.to_vec();
        form.push(("signature", signature.as_str()));

        let body: NonceBody = self.post_form("/v2/signature", &form, None).await?;

        let nonce = body.nonce.ok_or_else(|| SyncError::Protocol {
            status: 0,
            message: "nonce missing from response".to_string(),
        })?;

        tracing::debug!("Withings nonce acquired");
        Ok(nonce)
    }

    /// Signature over the minimal `{action, client_id, nonce}` subset.
    fn sign_with_nonce(&self, action: &str, nonce: &str) -> Result<String, SyncError> {
        sign_params(
            &[
                ("action", action),
                ("client_id", self.client_id.as_str()),
                ("nonce", nonce),
            ],
            &self.client_secret,
        )
    }

    async fn request_token(&self, grant: TokenGrant<'_>) -> Result<TokenResponse, SyncError> {
        let nonce = self.get_nonce().await?;
        let signature = self.sign_with_nonce("requesttoken", &nonce)?;

        let mut form = vec![
            ("action", "requesttoken"),
            ("client_id", self.client_id.as_str()),
        ];
        match grant {
            TokenGrant::AuthorizationCode(code) => {
                form.push(("grant_type", "authorization_code"));
                form.push(("code", code));
                form.push(("redirect_uri", self.redirect_uri.as_str()));
            }
            TokenGrant::RefreshToken(refresh_token) => {
                form.push(("grant_type", "refresh_token"));
                form.push(("refresh_token", refresh_token));
            }
        }
        form.push(("nonce", nonce.as_str()));
        form.push(("signature", signature.as_str()));

        self.post_form("/v2/oauth2", &form, None).await
    }

    /// POST a form and unwrap the Withings envelope.
    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
        bearer: Option<&str>,
    ) -> Result<T, SyncError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.http.post(&url).form(form);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Transport(format!("POST {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(path, status = %status, body = %text, "Withings HTTP error");
            return Err(SyncError::Transport(format!("HTTP {}: {}", status, text)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| SyncError::Transport(format!("reading {} response: {}", path, e)))?;

        decode_envelope(&text)
    }
}

#[async_trait]
impl WithingsApi for WithingsClient {
    async fn exchange_authorization_code(&self, code: &str) -> Result<TokenResponse, SyncError> {
        let token = self
            .request_token(TokenGrant::AuthorizationCode(code))
            .await?;
        tracing::info!(
            withings_user_id = %token.vendor_user_id,
            expires_in = token.expires_in_seconds,
            "Withings authorization code exchanged"
        );
        Ok(token)
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, SyncError> {
        let token = self
            .request_token(TokenGrant::RefreshToken(refresh_token))
            .await?;
        tracing::info!(
            expires_in = token.expires_in_seconds,
            "Withings access token refreshed"
        );
        Ok(token)
    }

    async fn get_measurements(
        &self,
        access_token: &str,
        selection: MeasureSelection,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<MeasureBody, SyncError> {
        let nonce = self.get_nonce().await?;
        let signature = self.sign_with_nonce("getmeas", &nonce)?;

        let meastypes = selection.meastypes();
        let startdate = start.map(|s| s.to_string());
        let enddate = end.map(|e| e.to_string());

        let mut form = vec![
            ("action", "getmeas"),
            ("client_id", self.client_id.as_str()),
            ("meastypes", meastypes.as_str()),
            ("category", CATEGORY_REAL_MEASURES),
            ("nonce", nonce.as_str()),
        ];
        if let Some(startdate) = startdate.as_deref() {
            form.push(("startdate", startdate));
        }
        if let Some(enddate) = enddate.as_deref() {
            form.push(("enddate", enddate));
        }
        form.push(("signature", signature.as_str()));

        let body: MeasureBody = self
            .post_form("/v2/measure", &form, Some(access_token))
            .await?;

        tracing::debug!(
            groups = body.measurement_groups.len(),
            update_time = body.update_time,
            "Withings measurements fetched"
        );
        Ok(body)
    }
}

/// Parse a Withings envelope, mapping non-zero status or a missing body to
/// `SyncError::Protocol`.
pub(crate) fn decode_envelope<T: DeserializeOwned>(text: &str) -> Result<T, SyncError> {
    // Error envelopes often carry `"body": {}`, so decode the body only after
    // the status has been checked.
    let envelope: WithingsEnvelope<serde_json::Value> = serde_json::from_str(text)
        .map_err(|e| SyncError::Protocol {
            status: -1,
            message: format!("invalid JSON response: {}", e),
        })?;

    if envelope.status != 0 {
        return Err(SyncError::Protocol {
            status: envelope.status,
            message: envelope
                .error
                .unwrap_or_else(|| "Unknown error".to_string()),
        });
    }

    let body = match envelope.body {
        Some(body) if !body.is_null() => body,
        _ => {
            return Err(SyncError::Protocol {
                status: 0,
                message: "response body missing".to_string(),
            })
        }
    };

    serde_json::from_value(body).map_err(|e| SyncError::Protocol {
        status: 0,
        message: format!("malformed response body: {}", e),
    })
}
