// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access-token lifecycle: detect expiry, refresh once, persist.
//!
//! Expiry is detected up front from the stored `token_expires_at`, never by
//! waiting for a fetch to fail. A revoked token is not tracked here; it
//! surfaces as a protocol error on the next fetch.

use crate::db::CredentialStore;
use crate::error::SyncError;
use crate::models::{OAuthCredential, TokenResponse};
use crate::services::withings::WithingsApi;
use chrono::{DateTime, Duration, Utc};

/// Validity of a stored access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Valid,
    Expired,
}

/// A token is expired once `token_expires_at <= now`. Unknown expiry counts as valid.
pub fn token_state(credential: &OAuthCredential, now: DateTime<Utc>) -> TokenState {
    match credential.token_expires_at {
        Some(expires_at) if expires_at <= now => TokenState::Expired,
        _ => TokenState::Valid,
    }
}

/// Build a credential from a token response received at `now`.
pub fn credential_from_token(token: &TokenResponse, now: DateTime<Utc>) -> OAuthCredential {
    OAuthCredential {
        access_token: token.access_token.clone(),
        refresh_token: token.refresh_token.clone(),
        token_expires_at: Some(now + Duration::seconds(token.expires_in_seconds)),
        vendor_user_id: (!token.vendor_user_id.is_empty()).then(|| token.vendor_user_id.clone()),
        scope: (!token.scope.is_empty()).then(|| token.scope.clone()),
    }
}

/// Keeps a user's credential usable for the duration of one sync.
pub struct TokenManager<'a> {
    api: &'a dyn WithingsApi,
    credentials: &'a dyn CredentialStore,
}

impl<'a> TokenManager<'a> {
    pub fn new(api: &'a dyn WithingsApi, credentials: &'a dyn CredentialStore) -> Self {
        Self { api, credentials }
    }

    /// Return a credential whose access token is not known to be expired.
    ///
    /// An expired token is refreshed exactly once and the result persisted
    /// before it is returned. Any failure on that path is `RefreshFailed`.
    pub async fn ensure_valid(
        &self,
        user_id: &str,
        credential: OAuthCredential,
    ) -> Result<OAuthCredential, SyncError> {
        let now = Utc::now();
        if token_state(&credential, now) == TokenState::Valid {
            return Ok(credential);
        }

        tracing::info!(user_id, "Withings access token expired, refreshing");

        let token = self
            .api
            .refresh_access_token(&credential.refresh_token)
            .await
            .map_err(|e| {
                tracing::error!(user_id, error = %e, "Withings token refresh failed");
                SyncError::RefreshFailed(Box::new(e))
            })?;

        let mut refreshed = credential_from_token(&token, Utc::now());
        if refreshed.vendor_user_id.is_none() {
            refreshed.vendor_user_id = credential.vendor_user_id;
        }
        if refreshed.scope.is_none() {
            refreshed.scope = credential.scope;
        }

        self.credentials
            .save_credential(user_id, &refreshed)
            .await
            .map_err(|e| SyncError::RefreshFailed(Box::new(e)))?;

        tracing::info!(user_id, "Withings token refreshed and stored");
        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expires_at: Option<DateTime<Utc>>) -> OAuthCredential {
        OAuthCredential {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_expires_at: expires_at,
            vendor_user_id: Some("363".to_string()),
            scope: None,
        }
    }

    #[test]
    fn test_token_state() {
        let now = Utc::now();
        assert_eq!(
            token_state(&credential(Some(now + Duration::hours(1))), now),
            TokenState::Valid
        );
        assert_eq!(
            token_state(&credential(Some(now - Duration::seconds(1))), now),
            TokenState::Expired
        );
        // Boundary: expiring exactly now is expired
        assert_eq!(token_state(&credential(Some(now)), now), TokenState::Expired);
        assert_eq!(token_state(&credential(None), now), TokenState::Valid);
    }

    #[test]
    fn test_credential_from_token_sets_expiry() {
        let now = Utc::now();
        let token = TokenResponse {
            access_token: "a2".to_string(),
            refresh_token: "r2".to_string(),
            expires_in_seconds: 10800,
            vendor_user_id: "363".to_string(),
            scope: String::new(),
        };

        let credential = credential_from_token(&token, now);
        assert_eq!(credential.token_expires_at, Some(now + Duration::seconds(10800)));
        assert_eq!(credential.vendor_user_id.as_deref(), Some("363"));
        assert_eq!(credential.scope, None);
    }
}
