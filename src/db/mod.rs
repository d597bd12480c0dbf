// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer.
//!
//! The sync engine talks to storage only through [`CredentialStore`] and
//! [`RecordStore`]; `FirestoreDb` and `CredentialVault` are the production
//! implementations.

pub mod credentials;
pub mod firestore;

pub use credentials::CredentialVault;
pub use firestore::FirestoreDb;

use crate::error::SyncError;
use crate::models::{BodyCompositionRecord, DataSource, OAuthCredential, Table, WeightRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    /// Encrypted Withings credentials (keyed by user id)
    pub const CREDENTIALS: &str = "withings_credentials";
    pub const WEIGHTS: &str = "weights";
    pub const BODY_COMPOSITIONS: &str = "body_compositions";
}

/// Storage of the per-user Withings credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load_credential(&self, user_id: &str) -> Result<Option<OAuthCredential>, SyncError>;

    /// Replace the stored credential.
    async fn save_credential(
        &self,
        user_id: &str,
        credential: &OAuthCredential,
    ) -> Result<(), SyncError>;
}

/// Storage of weight and body-composition records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Date of the user's most recent record in `table`, optionally limited to one source.
    async fn latest_record_date(
        &self,
        user_id: &str,
        table: Table,
        source: Option<DataSource>,
    ) -> Result<Option<DateTime<Utc>>, SyncError>;

    /// Insert rows, skipping any that collide with an existing `(user_id, date)`.
    /// Returns the number actually inserted.
    async fn insert_weights(&self, rows: &[WeightRecord]) -> Result<usize, SyncError>;

    /// Insert rows, skipping any that collide with an existing `(user_id, date)`.
    /// Returns the number actually inserted.
    async fn insert_body_compositions(
        &self,
        rows: &[BodyCompositionRecord],
    ) -> Result<usize, SyncError>;
}

/// Document id enforcing one record per `(user_id, date)`.
pub fn record_document_id(user_id: &str, date: DateTime<Utc>) -> String {
    format!(
        "{}_{}",
        urlencoding::encode(user_id),
        date.timestamp_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_document_id_is_path_safe() {
        let date = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(
            record_document_id("a/b c", date),
            "a%2Fb%20c_1700000000000"
        );
    }
}
