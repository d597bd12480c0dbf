// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persisted weight and body-composition records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Entered by the user
    Manual,
    /// Imported from a Withings device
    Withings,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Manual => "manual",
            DataSource::Withings => "withings",
        }
    }
}

/// Destination tables of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Weights,
    BodyCompositions,
}

/// A single body-weight measurement.
///
/// Unique per `(user_id, date)`; inserts that collide are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    pub user_id: String,
    /// Weight in kilograms
    pub value: f64,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub date: DateTime<Utc>,
    pub source: DataSource,
}

/// A body-composition capture. Every metric is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyCompositionRecord {
    pub user_id: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub date: DateTime<Utc>,
    pub source: DataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_mass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_free_mass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muscle_mass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_mass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bone_mass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse_wave_velocity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vascular_age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visceral_fat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basal_metabolic_rate: Option<f64>,
}

impl BodyCompositionRecord {
    /// An empty record carrying only identity fields.
    pub fn new(user_id: impl Into<String>, date: DateTime<Utc>, source: DataSource) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            source,
            weight: None,
            fat_mass: None,
            fat_free_mass: None,
            fat_ratio: None,
            muscle_mass: None,
            water_mass: None,
            bone_mass: None,
            heart_rate: None,
            pulse_wave_velocity: None,
            vascular_age: None,
            visceral_fat: None,
            basal_metabolic_rate: None,
        }
    }

    /// Whether any metric beyond the identity fields is populated.
    pub fn has_metrics(&self) -> bool {
        [
            self.weight,
            self.fat_mass,
            self.fat_free_mass,
            self.fat_ratio,
            self.muscle_mass,
            self.water_mass,
            self.bone_mass,
            self.heart_rate,
            self.pulse_wave_velocity,
            self.vascular_age,
            self.visceral_fat,
            self.basal_metabolic_rate,
        ]
        .iter()
        .any(Option::is_some)
    }
}
