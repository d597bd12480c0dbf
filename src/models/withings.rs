// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Withings API wire types.
//!
//! Every Withings endpoint answers HTTP 200 with a `{status, body, error}`
//! envelope; `status == 0` is success.

use serde::{Deserialize, Deserializer};

/// Response envelope shared by all Withings endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct WithingsEnvelope<T> {
    pub status: i64,
    pub body: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `action=getnonce`.
#[derive(Debug, Clone, Deserialize)]
pub struct NonceBody {
    #[serde(default)]
    pub nonce: Option<String>,
}

/// Body of `action=requesttoken` (code exchange and refresh).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds
    #[serde(rename = "expires_in")]
    pub expires_in_seconds: i64,
    /// Withings user id (sent as a string, older payloads use a number)
    #[serde(rename = "userid", deserialize_with = "string_or_number")]
    pub vendor_user_id: String,
    #[serde(default)]
    pub scope: String,
}

/// Body of `action=getmeas`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasureBody {
    #[serde(rename = "updatetime", default)]
    pub update_time: i64,
    #[serde(default)]
    pub timezone: String,
    /// Absent or null means nothing new.
    #[serde(rename = "measuregrps", default, deserialize_with = "null_as_empty")]
    pub measurement_groups: Vec<MeasureGroup>,
}

/// One capture event bundling simultaneously-read metrics.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeasureGroup {
    #[serde(rename = "grpid")]
    pub group_id: i64,
    /// Capture time, Unix seconds
    #[serde(rename = "date")]
    pub captured_at: i64,
    #[serde(rename = "deviceid", default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub category: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub measures: Vec<Measure>,
}

/// A typed reading; the decoded value is `raw_value * 10^unit_exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Measure {
    #[serde(rename = "type")]
    pub type_code: i64,
    #[serde(rename = "value")]
    pub raw_value: i64,
    #[serde(rename = "unit")]
    pub unit_exponent: i32,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    })
}
