// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use weight_tracker::config::Config;
use weight_tracker::db::{CredentialStore, FirestoreDb, RecordStore};
use weight_tracker::error::SyncError;
use weight_tracker::models::{
    BodyCompositionRecord, DataSource, Measure, MeasureBody, MeasureGroup, OAuthCredential, Table,
    TokenResponse, WeightRecord,
};
use weight_tracker::routes::create_router;
use weight_tracker::services::withings::MeasureSelection;
use weight_tracker::services::{SyncService, WithingsApi};
use weight_tracker::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Unique user id for test isolation.
#[allow(dead_code)]
pub fn unique_user_id() -> String {
    format!("test-user-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

// ─── In-memory store ─────────────────────────────────────────

/// Store fake with the same `(user_id, date)` uniqueness as Firestore.
#[derive(Default)]
pub struct InMemoryStore {
    pub credentials: Mutex<HashMap<String, OAuthCredential>>,
    pub weights: Mutex<Vec<WeightRecord>>,
    pub body_compositions: Mutex<Vec<BodyCompositionRecord>>,
    pub fail_credential_saves: AtomicBool,
    pub fail_record_writes: AtomicBool,
}

#[allow(dead_code)]
impl InMemoryStore {
    pub fn with_credential(user_id: &str, credential: OAuthCredential) -> Arc<Self> {
        let store = Self::default();
        store
            .credentials
            .lock()
            .unwrap()
            .insert(user_id.to_string(), credential);
        Arc::new(store)
    }

    pub fn credential(&self, user_id: &str) -> Option<OAuthCredential> {
        self.credentials.lock().unwrap().get(user_id).cloned()
    }

    pub fn weight_count(&self) -> usize {
        self.weights.lock().unwrap().len()
    }

    pub fn body_composition_count(&self) -> usize {
        self.body_compositions.lock().unwrap().len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn load_credential(&self, user_id: &str) -> Result<Option<OAuthCredential>, SyncError> {
        Ok(self.credential(user_id))
    }

    async fn save_credential(
        &self,
        user_id: &str,
        credential: &OAuthCredential,
    ) -> Result<(), SyncError> {
        if self.fail_credential_saves.load(Ordering::SeqCst) {
            return Err(SyncError::Database("credential write rejected".to_string()));
        }
        self.credentials
            .lock()
            .unwrap()
            .insert(user_id.to_string(), credential.clone());
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn latest_record_date(
        &self,
        user_id: &str,
        table: Table,
        source: Option<DataSource>,
    ) -> Result<Option<DateTime<Utc>>, SyncError> {
        let matches = |row_user: &str, row_source: DataSource| {
            row_user == user_id && source.map_or(true, |s| s == row_source)
        };
        Ok(match table {
            Table::Weights => self
                .weights
                .lock()
                .unwrap()
                .iter()
                .filter(|r| matches(&r.user_id, r.source))
                .map(|r| r.date)
                .max(),
            Table::BodyCompositions => self
                .body_compositions
                .lock()
                .unwrap()
                .iter()
                .filter(|r| matches(&r.user_id, r.source))
                .map(|r| r.date)
                .max(),
        })
    }

    async fn insert_weights(&self, rows: &[WeightRecord]) -> Result<usize, SyncError> {
        if self.fail_record_writes.load(Ordering::SeqCst) {
            return Err(SyncError::Database("record write rejected".to_string()));
        }
        let mut weights = self.weights.lock().unwrap();
        let mut inserted = 0;
        for row in rows {
            if !weights
                .iter()
                .any(|w| w.user_id == row.user_id && w.date == row.date)
            {
                weights.push(row.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn insert_body_compositions(
        &self,
        rows: &[BodyCompositionRecord],
    ) -> Result<usize, SyncError> {
        if self.fail_record_writes.load(Ordering::SeqCst) {
            return Err(SyncError::Database("record write rejected".to_string()));
        }
        let mut body_compositions = self.body_compositions.lock().unwrap();
        let mut inserted = 0;
        for row in rows {
            if !body_compositions
                .iter()
                .any(|b| b.user_id == row.user_id && b.date == row.date)
            {
                body_compositions.push(row.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

// ─── Scripted vendor ─────────────────────────────────────────

/// One recorded `get_measurements` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchCall {
    pub access_token: String,
    pub selection: MeasureSelection,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

/// `WithingsApi` fake serving canned measurement groups.
#[derive(Default)]
pub struct FakeWithings {
    /// Groups served, filtered by the requested window like the real API.
    pub groups: Mutex<Vec<MeasureGroup>>,
    /// Token returned by refresh/exchange; `None` makes those calls fail.
    pub token: Mutex<Option<TokenResponse>>,
    /// Vendor status to fail fetches with.
    pub fetch_error_status: Mutex<Option<i64>>,
    pub refresh_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
    pub fetches: Mutex<Vec<FetchCall>>,
}

#[allow(dead_code)]
impl FakeWithings {
    pub fn with_groups(groups: Vec<MeasureGroup>) -> Arc<Self> {
        let fake = Self::default();
        *fake.groups.lock().unwrap() = groups;
        Arc::new(fake)
    }

    pub fn set_token(&self, token: TokenResponse) {
        *self.token.lock().unwrap() = Some(token);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn last_fetch(&self) -> Option<FetchCall> {
        self.fetches.lock().unwrap().last().cloned()
    }

    fn scripted_token(&self) -> Result<TokenResponse, SyncError> {
        self.token
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SyncError::Protocol {
                status: 401,
                message: "invalid_token".to_string(),
            })
    }
}

#[async_trait]
impl WithingsApi for FakeWithings {
    async fn exchange_authorization_code(&self, _code: &str) -> Result<TokenResponse, SyncError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.scripted_token()
    }

    async fn refresh_access_token(
        &self,
        _refresh_token: &str,
    ) -> Result<TokenResponse, SyncError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.scripted_token()
    }

    async fn get_measurements(
        &self,
        access_token: &str,
        selection: MeasureSelection,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<MeasureBody, SyncError> {
        self.fetches.lock().unwrap().push(FetchCall {
            access_token: access_token.to_string(),
            selection,
            start,
            end,
        });

        if let Some(status) = *self.fetch_error_status.lock().unwrap() {
            return Err(SyncError::Protocol {
                status,
                message: "invalid_token".to_string(),
            });
        }

        let measurement_groups = self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| start.map_or(true, |s| g.captured_at >= s))
            .filter(|g| end.map_or(true, |e| g.captured_at <= e))
            .cloned()
            .collect();

        Ok(MeasureBody {
            measurement_groups,
            ..Default::default()
        })
    }
}

// ─── Builders ────────────────────────────────────────────────

/// A linked credential expiring `expires_in` from now.
#[allow(dead_code)]
pub fn credential(access_token: &str, expires_in: Duration) -> OAuthCredential {
    OAuthCredential {
        access_token: access_token.to_string(),
        refresh_token: format!("{}-refresh", access_token),
        token_expires_at: Some(Utc::now() + expires_in),
        vendor_user_id: Some("363".to_string()),
        scope: Some("user.info,user.metrics".to_string()),
    }
}

#[allow(dead_code)]
pub fn token_response(access_token: &str) -> TokenResponse {
    TokenResponse {
        access_token: access_token.to_string(),
        refresh_token: format!("{}-refresh", access_token),
        expires_in_seconds: 10800,
        vendor_user_id: "363".to_string(),
        scope: "user.info,user.metrics".to_string(),
    }
}

/// Measurement group captured at `captured_at` with `(type, value, unit)` readings.
#[allow(dead_code)]
pub fn group(captured_at: DateTime<Utc>, measures: &[(i64, i64, i32)]) -> MeasureGroup {
    MeasureGroup {
        group_id: captured_at.timestamp(),
        captured_at: captured_at.timestamp(),
        device_id: None,
        category: 1,
        measures: measures
            .iter()
            .map(|&(type_code, raw_value, unit_exponent)| Measure {
                type_code,
                raw_value,
                unit_exponent,
            })
            .collect(),
    }
}

/// Whole-second timestamp `days` before now.
#[allow(dead_code)]
pub fn days_ago(days: i64) -> DateTime<Utc> {
    let t = Utc::now() - Duration::days(days);
    DateTime::from_timestamp(t.timestamp(), 0).unwrap()
}

#[allow(dead_code)]
pub fn sync_service(api: Arc<FakeWithings>, store: Arc<InMemoryStore>) -> SyncService {
    SyncService::new(api, store.clone(), store)
}

/// Create a test app backed by the given fakes.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(
    api: Arc<FakeWithings>,
    store: Arc<InMemoryStore>,
) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        config: Config::test_default(),
        sync_service: sync_service(api, store),
    });

    (create_router(state.clone()), state)
}

/// Create a test JWT token.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        iat: usize,
    }

    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 86400,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}
