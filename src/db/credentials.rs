// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! KMS-encrypted credential storage on top of Firestore.

use crate::db::{CredentialStore, FirestoreDb};
use crate::error::SyncError;
use crate::models::{OAuthCredential, StoredCredential};
use crate::services::kms::{decrypt_tokens, encrypt_tokens, KmsService};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// `CredentialStore` that encrypts tokens with Cloud KMS before writing them.
#[derive(Clone)]
pub struct CredentialVault {
    db: FirestoreDb,
    kms: KmsService,
}

impl CredentialVault {
    pub fn new(db: FirestoreDb, kms: KmsService) -> Self {
        Self { db, kms }
    }
}

#[async_trait]
impl CredentialStore for CredentialVault {
    async fn load_credential(&self, user_id: &str) -> Result<Option<OAuthCredential>, SyncError> {
        let Some(stored) = self.db.get_stored_credential(user_id).await? else {
            return Ok(None);
        };

        let (access_token, refresh_token) = decrypt_tokens(
            &self.kms,
            &stored.access_token_encrypted,
            &stored.refresh_token_encrypted,
            user_id,
        )
        .await
        .map_err(|e| SyncError::Database(format!("credential decrypt: {}", e)))?;

        let token_expires_at = stored
            .expires_at
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| SyncError::Database(format!("invalid token expiry: {}", e)))
            })
            .transpose()?;

        Ok(Some(OAuthCredential {
            access_token,
            refresh_token,
            token_expires_at,
            vendor_user_id: stored.withings_user_id,
            scope: stored.scope,
        }))
    }

    async fn save_credential(
        &self,
        user_id: &str,
        credential: &OAuthCredential,
    ) -> Result<(), SyncError> {
        let (access_token_encrypted, refresh_token_encrypted) = encrypt_tokens(
            &self.kms,
            &credential.access_token,
            &credential.refresh_token,
            user_id,
        )
        .await
        .map_err(|e| SyncError::Database(format!("credential encrypt: {}", e)))?;

        let stored = StoredCredential {
            access_token_encrypted,
            refresh_token_encrypted,
            expires_at: credential.token_expires_at.map(|dt| dt.to_rfc3339()),
            withings_user_id: credential.vendor_user_id.clone(),
            scope: credential.scope.clone(),
            updated_at: format_utc_rfc3339(Utc::now()),
        };

        self.db.set_stored_credential(user_id, &stored).await?;
        tracing::debug!(user_id, "Withings credential stored");
        Ok(())
    }
}
