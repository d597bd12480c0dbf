//! Withings OAuth credential model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Plaintext OAuth credential for a linked Withings account.
///
/// Access and refresh tokens are issued together; a credential missing
/// either one is treated as "not linked".
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthCredential {
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token expires. `None` means the expiry is unknown and
    /// the token is used as-is.
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Withings user id returned by the token exchange
    pub vendor_user_id: Option<String>,
    /// Granted OAuth scopes (comma separated, as returned by Withings)
    pub scope: Option<String>,
}

impl OAuthCredential {
    /// Whether both tokens are on file.
    pub fn is_linked(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

/// Credential document as stored in Firestore (tokens encrypted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Encrypted access token (base64)
    pub access_token_encrypted: String,
    /// Encrypted refresh token (base64)
    pub refresh_token_encrypted: String,
    /// When the access token expires (ISO 8601)
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Withings user id
    #[serde(default)]
    pub withings_user_id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Last write (ISO 8601)
    pub updated_at: String,
}
