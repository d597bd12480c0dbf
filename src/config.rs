// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables through secret
//! bindings, so everything is read from the process environment once at
//! startup.

use std::env;

/// Default Withings API host.
pub const DEFAULT_WITHINGS_API_BASE: &str = "https://wbsapi.withings.net";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Withings OAuth client ID (public)
    pub withings_client_id: String,
    /// OAuth redirect URI; must match the value registered with Withings exactly
    pub withings_redirect_uri: String,
    /// Withings API base URL (overridden in tests)
    pub withings_api_base: String,
    /// Frontend URL the OAuth callback redirects back to
    pub frontend_url: String,
    /// Expected `aud` claim of identity-provider tokens, if any
    pub auth_jwt_audience: Option<String>,
    /// GCP project ID
    pub gcp_project_id: String,
    /// GCP region for the KMS key ring
    pub gcp_region: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Withings OAuth client secret (also the HMAC signing key)
    pub withings_client_secret: String,
    /// HS256 secret of the identity provider issuing bearer tokens
    pub auth_jwt_secret: Vec<u8>,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Fixed configuration for tests.
    pub fn test_default() -> Self {
        Self {
            withings_client_id: "test_client_id".to_string(),
            withings_redirect_uri: "http://localhost:8080/api/withings/callback".to_string(),
            withings_api_base: DEFAULT_WITHINGS_API_BASE.to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            auth_jwt_audience: None,
            gcp_project_id: "test-project".to_string(),
            gcp_region: "us-west1".to_string(),
            port: 8080,
            withings_client_secret: "test_secret".to_string(),
            auth_jwt_secret: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_state_key".to_vec(),
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            withings_client_id: required("WITHINGS_CLIENT_ID")?,
            withings_redirect_uri: required("WITHINGS_REDIRECT_URI")?,
            withings_api_base: env::var("WITHINGS_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_WITHINGS_API_BASE.to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            auth_jwt_audience: env::var("AUTH_JWT_AUDIENCE").ok(),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            gcp_region: env::var("GCP_REGION").unwrap_or_else(|_| "us-west1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            withings_client_secret: required("WITHINGS_CLIENT_SECRET")?,
            auth_jwt_secret: required("AUTH_JWT_SECRET")?.into_bytes(),
            oauth_state_key: required("OAUTH_STATE_KEY")?.into_bytes(),
        })
    }
}

/// Read a required variable, trimming stray whitespace from secret bindings.
fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("WITHINGS_CLIENT_ID", "test_id");
        env::set_var("WITHINGS_CLIENT_SECRET", " test_secret\n");
        env::set_var(
            "WITHINGS_REDIRECT_URI",
            "https://example.com/api/withings/callback",
        );
        env::set_var("AUTH_JWT_SECRET", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("OAUTH_STATE_KEY", "state_key");
        env::set_var("WITHINGS_API_BASE", "http://127.0.0.1:9999/");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.withings_client_id, "test_id");
        assert_eq!(config.withings_client_secret, "test_secret");
        assert_eq!(config.withings_api_base, "http://127.0.0.1:9999");
        assert_eq!(config.port, 8080);
    }
}
