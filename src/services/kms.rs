// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud KMS service for encrypting/decrypting stored Withings tokens.
//!
//! Uses direct KMS encryption (not envelope encryption). The user id is
//! bound to every ciphertext as additional authenticated data, so a token
//! copied to another user's document fails to decrypt.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// KMS failures.
#[derive(Debug, thiserror::Error)]
pub enum KmsError {
    #[error("KMS client not connected")]
    NotConnected,

    #[error("KMS setup failed: {0}")]
    Setup(String),

    #[error("KMS {op} failed: {message}")]
    Call { op: &'static str, message: String },

    #[error("Ciphertext decode failed: {0}")]
    Decode(String),
}

/// KMS encryption service.
#[derive(Clone)]
pub struct KmsService {
    /// Format: projects/{project}/locations/{location}/keyRings/{ring}/cryptoKeys/{key}
    key_path: String,
    client: Option<std::sync::Arc<google_cloud_kms::client::Client>>,
}

impl KmsService {
    const KEY_RING_NAME: &str = "weight-tracker";

    /// Create a new KMS service connected to GCP.
    pub async fn new(project_id: &str, location: &str, key_name: &str) -> Result<Self, KmsError> {
        let key_path = format!(
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{}",
            project_id,
            location,
            Self::KEY_RING_NAME,
            key_name
        );

        let config = google_cloud_kms::client::ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| KmsError::Setup(format!("auth config: {}", e)))?;

        let client = google_cloud_kms::client::Client::new(config)
            .await
            .map_err(|e| KmsError::Setup(format!("client: {}", e)))?;

        Ok(Self {
            key_path,
            client: Some(std::sync::Arc::new(client)),
        })
    }

    /// Create a mock KMS service for testing (offline mode).
    /// Ciphertext is base64 of `hex(aad):plaintext`. Only available in debug/test builds.
    #[cfg(debug_assertions)]
    pub fn new_mock() -> Self {
        Self {
            key_path: "projects/mock/locations/mock/keyRings/mock/cryptoKeys/mock".to_string(),
            client: None,
        }
    }

    /// Encrypt plaintext bound to `aad`. Returns base64-encoded ciphertext.
    pub async fn encrypt(&self, plaintext: &str, aad: &[u8]) -> Result<String, KmsError> {
        use google_cloud_googleapis::cloud::kms::v1::EncryptRequest;

        #[cfg(debug_assertions)]
        {
            if self.client.is_none() {
                return Ok(BASE64.encode(format!("{}:{}", hex::encode(aad), plaintext)));
            }
        }

        let client = self.client.as_ref().ok_or(KmsError::NotConnected)?;

        let req = EncryptRequest {
            name: self.key_path.clone(),
            plaintext: plaintext.as_bytes().to_vec(),
            additional_authenticated_data: aad.to_vec(),
            ..Default::default()
        };

        let response = client
            .encrypt(req, None)
            .await
            .map_err(|e| KmsError::Call {
                op: "encrypt",
                message: e.to_string(),
            })?;

        Ok(BASE64.encode(response.ciphertext))
    }

    /// Decrypt base64-encoded ciphertext bound to `aad`.
    pub async fn decrypt(&self, ciphertext_b64: &str, aad: &[u8]) -> Result<String, KmsError> {
        use google_cloud_googleapis::cloud::kms::v1::DecryptRequest;

        let ciphertext = BASE64
            .decode(ciphertext_b64)
            .map_err(|e| KmsError::Decode(e.to_string()))?;

        #[cfg(debug_assertions)]
        {
            if self.client.is_none() {
                let text = String::from_utf8(ciphertext)
                    .map_err(|e| KmsError::Decode(e.to_string()))?;
                let prefix = format!("{}:", hex::encode(aad));
                return text
                    .strip_prefix(&prefix)
                    .map(str::to_string)
                    .ok_or_else(|| KmsError::Call {
                        op: "decrypt",
                        message: "additional authenticated data mismatch (mock)".to_string(),
                    });
            }
        }

        let client = self.client.as_ref().ok_or(KmsError::NotConnected)?;

        let req = DecryptRequest {
            name: self.key_path.clone(),
            ciphertext,
            additional_authenticated_data: aad.to_vec(),
            ..Default::default()
        };

        let response = client
            .decrypt(req, None)
            .await
            .map_err(|e| KmsError::Call {
                op: "decrypt",
                message: e.to_string(),
            })?;

        String::from_utf8(response.plaintext).map_err(|e| KmsError::Decode(e.to_string()))
    }
}

/// Encrypt an access/refresh token pair for `user_id`.
pub async fn encrypt_tokens(
    kms: &KmsService,
    access_token: &str,
    refresh_token: &str,
    user_id: &str,
) -> Result<(String, String), KmsError> {
    let aad = user_id.as_bytes();
    let encrypted_access = kms.encrypt(access_token, aad).await?;
    let encrypted_refresh = kms.encrypt(refresh_token, aad).await?;
    Ok((encrypted_access, encrypted_refresh))
}

/// Decrypt an access/refresh token pair for `user_id`.
pub async fn decrypt_tokens(
    kms: &KmsService,
    encrypted_access: &str,
    encrypted_refresh: &str,
    user_id: &str,
) -> Result<(String, String), KmsError> {
    let aad = user_id.as_bytes();
    let access_token = kms.decrypt(encrypted_access, aad).await?;
    let refresh_token = kms.decrypt(encrypted_refresh, aad).await?;
    Ok((access_token, refresh_token))
}
