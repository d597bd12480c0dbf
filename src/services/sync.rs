// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental Withings sync.
//!
//! Each run is stateless: the fetch window is re-derived from what is
//! already persisted, so a crashed or repeated run simply recomputes the
//! same watermark. Steps are strictly sequential:
//!
//! 1. Load the credential (`NotLinked` if absent)
//! 2. Refresh an expired access token (`RefreshFailed` on failure)
//! 3. Compute the window from the latest stored record + 1s, or 90 days back
//! 4. Fetch, decode and classify measurement groups
//! 5. Insert with skip-on-duplicate semantics

use crate::db::{CredentialStore, RecordStore};
use crate::error::SyncError;
use crate::models::{DataSource, MeasureGroup, OAuthCredential, Table};
use crate::services::measures::{
    body_composition_record, classify_groups, weight_record, DecodedBatch,
};
use crate::services::tokens::{credential_from_token, TokenManager};
use crate::services::withings::{MeasureSelection, WithingsApi};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// How far back the first sync reaches.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 90;

/// Which destination table(s) a sync run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    /// Both tables, classifying each group (canonical)
    All,
    /// Weight readings only
    Weights,
    /// Body-composition records only
    BodyComposition,
}

impl SyncTarget {
    fn selection(self) -> MeasureSelection {
        match self {
            SyncTarget::Weights => MeasureSelection::WeightOnly,
            SyncTarget::All | SyncTarget::BodyComposition => MeasureSelection::AllKnown,
        }
    }

    /// Tables whose latest record bounds the next window.
    fn watermark_sources(self) -> &'static [(Table, Option<DataSource>)] {
        const WEIGHTS: (Table, Option<DataSource>) = (Table::Weights, Some(DataSource::Withings));
        const BODY: (Table, Option<DataSource>) = (Table::BodyCompositions, None);
        match self {
            SyncTarget::All => &[WEIGHTS, BODY],
            SyncTarget::Weights => &[WEIGHTS],
            SyncTarget::BodyComposition => &[BODY],
        }
    }

    fn decode(self, user_id: &str, groups: &[MeasureGroup]) -> DecodedBatch {
        match self {
            SyncTarget::All => classify_groups(user_id, groups),
            SyncTarget::Weights => DecodedBatch {
                weights: groups
                    .iter()
                    .filter_map(|g| weight_record(user_id, g))
                    .collect(),
                body_compositions: Vec::new(),
            },
            SyncTarget::BodyComposition => DecodedBatch {
                weights: Vec::new(),
                body_compositions: groups
                    .iter()
                    .filter_map(|g| body_composition_record(user_id, g))
                    .collect(),
            },
        }
    }
}

/// Fetch window in Unix seconds, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: i64,
    pub end: i64,
}

impl SyncWindow {
    /// Start one second after the watermark, or `DEFAULT_LOOKBACK_DAYS` before `now`.
    pub fn from_watermark(watermark: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let start = match watermark {
            Some(latest) => latest.timestamp() + 1,
            None => (now - Duration::days(DEFAULT_LOOKBACK_DAYS)).timestamp(),
        };
        Self {
            start,
            end: now.timestamp(),
        }
    }

    /// A window whose start is after its end (clock skew, future-dated rows).
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub weights_synced: usize,
    pub body_compositions_synced: usize,
    /// Wall-clock completion time, not a measurement timestamp
    pub last_sync_at: DateTime<Utc>,
}

impl SyncReport {
    fn empty() -> Self {
        Self {
            weights_synced: 0,
            body_compositions_synced: 0,
            last_sync_at: Utc::now(),
        }
    }

    pub fn total(&self) -> usize {
        self.weights_synced + self.body_compositions_synced
    }
}

/// Withings sync orchestrator. Cheap to clone; handles are shared.
#[derive(Clone)]
pub struct SyncService {
    api: Arc<dyn WithingsApi>,
    credentials: Arc<dyn CredentialStore>,
    records: Arc<dyn RecordStore>,
}

impl SyncService {
    pub fn new(
        api: Arc<dyn WithingsApi>,
        credentials: Arc<dyn CredentialStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            api,
            credentials,
            records,
        }
    }

    /// Exchange an authorization code and store the resulting credential.
    pub async fn link_account(
        &self,
        user_id: &str,
        code: &str,
    ) -> Result<OAuthCredential, SyncError> {
        let token = self.api.exchange_authorization_code(code).await?;
        let credential = credential_from_token(&token, Utc::now());

        self.credentials.save_credential(user_id, &credential).await?;

        tracing::info!(
            user_id,
            withings_user_id = credential.vendor_user_id.as_deref().unwrap_or(""),
            "Withings account linked"
        );
        Ok(credential)
    }

    /// Sync weights and body composition together.
    pub async fn sync_all(&self, user_id: &str) -> Result<SyncReport, SyncError> {
        self.sync(user_id, SyncTarget::All).await
    }

    /// Sync weight readings only.
    pub async fn sync_weights(&self, user_id: &str) -> Result<SyncReport, SyncError> {
        self.sync(user_id, SyncTarget::Weights).await
    }

    /// Sync body-composition records only.
    pub async fn sync_body_composition(&self, user_id: &str) -> Result<SyncReport, SyncError> {
        self.sync(user_id, SyncTarget::BodyComposition).await
    }

    pub async fn sync(&self, user_id: &str, target: SyncTarget) -> Result<SyncReport, SyncError> {
        let credential = self
            .credentials
            .load_credential(user_id)
            .await?
            .filter(OAuthCredential::is_linked)
            .ok_or(SyncError::NotLinked)?;

        let credential = TokenManager::new(self.api.as_ref(), self.credentials.as_ref())
            .ensure_valid(user_id, credential)
            .await?;

        let watermark = self.watermark(user_id, target).await?;
        let window = SyncWindow::from_watermark(watermark, Utc::now());

        if window.is_empty() {
            tracing::info!(
                user_id,
                start = window.start,
                end = window.end,
                "Sync window empty, skipping fetch"
            );
            return Ok(SyncReport::empty());
        }

        tracing::info!(
            user_id,
            ?target,
            start = window.start,
            end = window.end,
            "Fetching Withings measurements"
        );

        let body = self
            .api
            .get_measurements(
                &credential.access_token,
                target.selection(),
                Some(window.start),
                Some(window.end),
            )
            .await?;

        if body.measurement_groups.is_empty() {
            tracing::info!(user_id, "No new Withings measurements");
            return Ok(SyncReport::empty());
        }

        let batch = target.decode(user_id, &body.measurement_groups);

        let weights_synced = if batch.weights.is_empty() {
            0
        } else {
            self.records.insert_weights(&batch.weights).await?
        };

        let body_compositions_synced = if batch.body_compositions.is_empty() {
            0
        } else {
            self.records
                .insert_body_compositions(&batch.body_compositions)
                .await?
        };

        tracing::info!(
            user_id,
            groups = body.measurement_groups.len(),
            weights_synced,
            body_compositions_synced,
            "Withings sync complete"
        );

        Ok(SyncReport {
            weights_synced,
            body_compositions_synced,
            last_sync_at: Utc::now(),
        })
    }

    /// Latest persisted record date across the target's tables.
    async fn watermark(
        &self,
        user_id: &str,
        target: SyncTarget,
    ) -> Result<Option<DateTime<Utc>>, SyncError> {
        let mut latest = None;
        for (table, source) in target.watermark_sources() {
            let date = self
                .records
                .latest_record_date(user_id, *table, *source)
                .await?;
            latest = latest.max(date);
        }
        Ok(latest)
    }
}
