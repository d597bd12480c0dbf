// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weight-Tracker: Withings measurement sync
//!
//! This crate pulls weight and body-composition measurements from the
//! Withings API into the tracker's own store, incrementally and idempotently.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::SyncService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sync_service: SyncService,
}
