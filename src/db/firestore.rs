// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Credentials (encrypted Withings OAuth tokens)
//! - Weights and body compositions (insert-once records)

use crate::db::{collections, record_document_id, RecordStore};
use crate::error::SyncError;
use crate::models::{
    BodyCompositionRecord, DataSource, StoredCredential, Table, WeightRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use futures_util::{stream, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Projection used by the watermark query.
#[derive(Deserialize)]
struct DatedRow {
    #[serde(with = "firestore::serialize_as_timestamp")]
    date: DateTime<Utc>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, SyncError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| SyncError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, SyncError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            SyncError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, SyncError> {
        self.client
            .as_ref()
            .ok_or_else(|| SyncError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Credential Operations ───────────────────────────────────

    /// Get the encrypted credential document for a user.
    pub async fn get_stored_credential(
        &self,
        user_id: &str,
    ) -> Result<Option<StoredCredential>, SyncError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CREDENTIALS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| SyncError::Database(e.to_string()))
    }

    /// Store the encrypted credential document for a user.
    pub async fn set_stored_credential(
        &self,
        user_id: &str,
        credential: &StoredCredential,
    ) -> Result<(), SyncError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CREDENTIALS)
            .document_id(user_id)
            .object(credential)
            .execute()
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Record Operations ───────────────────────────────────────

    /// Create each row unless its document already exists.
    ///
    /// Firestore `create` is atomic per document, so a conflict means the
    /// `(user_id, date)` pair is already taken and the row is skipped.
    async fn insert_skip_duplicates<T, F>(
        &self,
        collection: &'static str,
        rows: &[T],
        id_extractor: F,
    ) -> Result<usize, SyncError>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync,
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;
        let pending: Vec<(String, T)> = rows
            .iter()
            .map(|row| (id_extractor(row), row.clone()))
            .collect();

        let outcomes = stream::iter(pending)
            .map(|(doc_id, row)| async move {
                let result: Result<T, FirestoreError> = client
                    .fluent()
                    .insert()
                    .into(collection)
                    .document_id(&doc_id)
                    .object(&row)
                    .execute()
                    .await;

                match result {
                    Ok(_) => Ok(true),
                    Err(FirestoreError::DataConflictError(_)) => {
                        tracing::debug!(collection, doc_id = %doc_id, "Duplicate record skipped");
                        Ok(false)
                    }
                    Err(e) => Err(SyncError::Database(e.to_string())),
                }
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<bool, SyncError>>>()
            .await;

        let mut inserted = 0;
        for outcome in outcomes {
            if outcome? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

#[async_trait]
impl RecordStore for FirestoreDb {
    async fn latest_record_date(
        &self,
        user_id: &str,
        table: Table,
        source: Option<DataSource>,
    ) -> Result<Option<DateTime<Utc>>, SyncError> {
        let collection = match table {
            Table::Weights => collections::WEIGHTS,
            Table::BodyCompositions => collections::BODY_COMPOSITIONS,
        };
        let user_id = user_id.to_string();

        let rows: Vec<DatedRow> = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    source.and_then(|s| q.field("source").eq(s.as_str())),
                ])
            })
            .order_by([("date", firestore::FirestoreQueryDirection::Descending)])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        Ok(rows.into_iter().next().map(|row| row.date))
    }

    async fn insert_weights(&self, rows: &[WeightRecord]) -> Result<usize, SyncError> {
        self.insert_skip_duplicates(collections::WEIGHTS, rows, |r| {
            record_document_id(&r.user_id, r.date)
        })
        .await
    }

    async fn insert_body_compositions(
        &self,
        rows: &[BodyCompositionRecord],
    ) -> Result<usize, SyncError> {
        self.insert_skip_duplicates(collections::BODY_COMPOSITIONS, rows, |r| {
            record_document_id(&r.user_id, r.date)
        })
        .await
    }
}
