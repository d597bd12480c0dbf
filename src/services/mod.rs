// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod kms;
pub mod measures;
pub mod signature;
pub mod sync;
pub mod tokens;
pub mod withings;

pub use kms::KmsService;
pub use sync::{SyncReport, SyncService, SyncTarget};
pub use tokens::TokenManager;
pub use withings::{WithingsApi, WithingsClient};
