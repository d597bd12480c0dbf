// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod credential;
pub mod record;
pub mod withings;

pub use credential::{OAuthCredential, StoredCredential};
pub use record::{BodyCompositionRecord, DataSource, Table, WeightRecord};
pub use withings::{Measure, MeasureBody, MeasureGroup, TokenResponse, WithingsEnvelope};
