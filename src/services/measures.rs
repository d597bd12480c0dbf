// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Decoding and classification of Withings measurement groups.
//!
//! A group containing any body-composition type becomes one
//! `BodyCompositionRecord` (with the weight folded in when present);
//! otherwise a group with a weight reading becomes one `WeightRecord`.
//! Unrecognized type codes are ignored.

use crate::models::withings::{Measure, MeasureGroup};
use crate::models::{BodyCompositionRecord, DataSource, WeightRecord};
use crate::time_utils::from_unix_seconds;

/// Withings measure type codes understood by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasureType {
    Weight,
    FatFreeMass,
    FatRatio,
    FatMass,
    HeartRate,
    MuscleMass,
    WaterMass,
    BoneMass,
    PulseWaveVelocity,
    VisceralFat,
    VascularAge,
    BasalMetabolicRate,
}

impl MeasureType {
    /// All known types, in ascending code order.
    pub const ALL: [MeasureType; 12] = [
        MeasureType::Weight,
        MeasureType::FatFreeMass,
        MeasureType::FatRatio,
        MeasureType::FatMass,
        MeasureType::HeartRate,
        MeasureType::MuscleMass,
        MeasureType::WaterMass,
        MeasureType::BoneMass,
        MeasureType::PulseWaveVelocity,
        MeasureType::VisceralFat,
        MeasureType::VascularAge,
        MeasureType::BasalMetabolicRate,
    ];

    pub fn code(self) -> i64 {
        match self {
            MeasureType::Weight => 1,
            MeasureType::FatFreeMass => 5,
            MeasureType::FatRatio => 6,
            MeasureType::FatMass => 8,
            MeasureType::HeartRate => 11,
            MeasureType::MuscleMass => 76,
            MeasureType::WaterMass => 77,
            MeasureType::BoneMass => 88,
            MeasureType::PulseWaveVelocity => 91,
            MeasureType::VisceralFat => 122,
            MeasureType::VascularAge => 155,
            MeasureType::BasalMetabolicRate => 226,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Types whose presence makes a group a body-composition capture.
    /// Weight and heart rate alone do not.
    pub fn is_body_composition(self) -> bool {
        !matches!(self, MeasureType::Weight | MeasureType::HeartRate)
    }
}

/// Decode `raw_value * 10^unit_exponent`.
pub fn decode_value(measure: &Measure) -> f64 {
    let raw = measure.raw_value as f64;
    // Dividing by an exact power of ten keeps 65500e-3 == 65.5.
    if measure.unit_exponent >= 0 {
        raw * 10f64.powi(measure.unit_exponent)
    } else {
        raw / 10f64.powi(-measure.unit_exponent)
    }
}

/// Records produced from a batch of measurement groups.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DecodedBatch {
    pub weights: Vec<WeightRecord>,
    pub body_compositions: Vec<BodyCompositionRecord>,
}

/// Whether the group carries any body-composition metric.
pub fn is_body_composition_group(group: &MeasureGroup) -> bool {
    group
        .measures
        .iter()
        .filter_map(|m| MeasureType::from_code(m.type_code))
        .any(MeasureType::is_body_composition)
}

/// Weight-only record for a group, taking its first weight reading.
pub fn weight_record(user_id: &str, group: &MeasureGroup) -> Option<WeightRecord> {
    let measure = group
        .measures
        .iter()
        .find(|m| m.type_code == MeasureType::Weight.code())?;

    Some(WeightRecord {
        user_id: user_id.to_string(),
        value: decode_value(measure),
        date: from_unix_seconds(group.captured_at),
        source: DataSource::Withings,
    })
}

/// Body-composition record for a group, or `None` when no known metric is
/// present.
pub fn body_composition_record(
    user_id: &str,
    group: &MeasureGroup,
) -> Option<BodyCompositionRecord> {
    let mut record = BodyCompositionRecord::new(
        user_id,
        from_unix_seconds(group.captured_at),
        DataSource::Withings,
    );

    for measure in &group.measures {
        let Some(measure_type) = MeasureType::from_code(measure.type_code) else {
            continue;
        };
        let value = Some(decode_value(measure));
        match measure_type {
            MeasureType::Weight => record.weight = value,
            MeasureType::FatFreeMass => record.fat_free_mass = value,
            MeasureType::FatRatio => record.fat_ratio = value,
            MeasureType::FatMass => record.fat_mass = value,
            MeasureType::HeartRate => record.heart_rate = value,
            MeasureType::MuscleMass => record.muscle_mass = value,
            MeasureType::WaterMass => record.water_mass = value,
            MeasureType::BoneMass => record.bone_mass = value,
            MeasureType::PulseWaveVelocity => record.pulse_wave_velocity = value,
            MeasureType::VisceralFat => record.visceral_fat = value,
            MeasureType::VascularAge => record.vascular_age = value,
            MeasureType::BasalMetabolicRate => record.basal_metabolic_rate = value,
        }
    }

    record.has_metrics().then_some(record)
}

/// Split groups into weight-only and body-composition records.
pub fn classify_groups(user_id: &str, groups: &[MeasureGroup]) -> DecodedBatch {
    let mut batch = DecodedBatch::default();

    for group in groups {
        if is_body_composition_group(group) {
            if let Some(record) = body_composition_record(user_id, group) {
                batch.body_compositions.push(record);
            }
        } else if let Some(record) = weight_record(user_id, group) {
            batch.weights.push(record);
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measure(type_code: i64, raw_value: i64, unit_exponent: i32) -> Measure {
        Measure {
            type_code,
            raw_value,
            unit_exponent,
        }
    }

    fn group(captured_at: i64, measures: Vec<Measure>) -> MeasureGroup {
        MeasureGroup {
            group_id: captured_at,
            captured_at,
            device_id: Some("scale".to_string()),
            category: 1,
            measures,
        }
    }

    #[test]
    fn test_decode_value() {
        assert_eq!(decode_value(&measure(1, 65500, -3)), 65.5);
        assert_eq!(decode_value(&measure(1, 655, -1)), 65.5);
        assert_eq!(decode_value(&measure(6, 25, 0)), 25.0);
        assert_eq!(decode_value(&measure(226, 15, 2)), 1500.0);
    }

    #[test]
    fn test_type_code_round_trip_covers_table() {
        let codes: Vec<i64> = MeasureType::ALL.iter().map(|t| t.code()).collect();
        assert_eq!(codes, vec![1, 5, 6, 8, 11, 76, 77, 88, 91, 122, 155, 226]);
        assert_eq!(MeasureType::from_code(9), None);
    }

    #[test]
    fn test_weight_only_group_becomes_weight_record() {
        let batch = classify_groups("u1", &[group(1_700_000_000, vec![measure(1, 655, -1)])]);

        assert!(batch.body_compositions.is_empty());
        assert_eq!(batch.weights.len(), 1);
        let record = &batch.weights[0];
        assert_eq!(record.value, 65.5);
        assert_eq!(record.source, DataSource::Withings);
        assert_eq!(record.date.timestamp(), 1_700_000_000);
        assert_eq!(record.user_id, "u1");
    }

    #[test]
    fn test_body_composition_group_absorbs_weight() {
        let batch = classify_groups(
            "u1",
            &[group(1_700_000_000, vec![measure(1, 655, -1), measure(6, 25, 0)])],
        );

        assert!(batch.weights.is_empty());
        assert_eq!(batch.body_compositions.len(), 1);
        let record = &batch.body_compositions[0];
        assert_eq!(record.weight, Some(65.5));
        assert_eq!(record.fat_ratio, Some(25.0));
        assert_eq!(record.fat_mass, None);
    }

    #[test]
    fn test_heart_rate_does_not_make_body_composition() {
        let batch = classify_groups(
            "u1",
            &[group(1_700_000_000, vec![measure(1, 700, -1), measure(11, 62, 0)])],
        );
        assert_eq!(batch.weights.len(), 1);
        assert!(batch.body_compositions.is_empty());
    }

    #[test]
    fn test_unknown_codes_are_ignored() {
        let batch = classify_groups(
            "u1",
            &[
                group(1, vec![measure(9, 80, 0)]),
                group(2, vec![measure(1, 700, -1), measure(170, 3, 0)]),
            ],
        );
        assert_eq!(batch.weights.len(), 1);
        assert_eq!(batch.weights[0].date.timestamp(), 2);
        assert!(batch.body_compositions.is_empty());
    }

    #[test]
    fn test_body_composition_record_without_metrics_is_discarded() {
        assert!(body_composition_record("u1", &group(1, vec![measure(9, 1, 0)])).is_none());
        assert!(body_composition_record("u1", &group(1, vec![])).is_none());
    }

    #[test]
    fn test_all_body_composition_fields_mapped() {
        let record = body_composition_record(
            "u1",
            &group(
                1,
                vec![
                    measure(5, 500, -1),
                    measure(8, 150, -1),
                    measure(76, 480, -1),
                    measure(77, 350, -1),
                    measure(88, 30, -1),
                    measure(91, 7, 0),
                    measure(122, 9, 0),
                    measure(155, 40, 0),
                    measure(226, 1500, 0),
                ],
            ),
        )
        .unwrap();

        assert_eq!(record.fat_free_mass, Some(50.0));
        assert_eq!(record.fat_mass, Some(15.0));
        assert_eq!(record.muscle_mass, Some(48.0));
        assert_eq!(record.water_mass, Some(35.0));
        assert_eq!(record.bone_mass, Some(3.0));
        assert_eq!(record.pulse_wave_velocity, Some(7.0));
        assert_eq!(record.visceral_fat, Some(9.0));
        assert_eq!(record.vascular_age, Some(40.0));
        assert_eq!(record.basal_metabolic_rate, Some(1500.0));
        assert_eq!(record.weight, None);
    }
}
