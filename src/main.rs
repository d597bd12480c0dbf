// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weight-Tracker API Server
//!
//! Links Withings accounts and syncs their weight and body-composition
//! measurements on demand.

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weight_tracker::{
    config::Config,
    db::{CredentialVault, FirestoreDb},
    services::{KmsService, SyncService, WithingsClient},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(port = config.port, "Starting Weight-Tracker API");

    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .context("Failed to connect to Firestore")?;

    let kms = KmsService::new(
        &config.gcp_project_id,
        &config.gcp_region,
        "withings-token-encryption",
    )
    .await
    .context("Failed to initialize KMS service")?;
    tracing::info!("KMS service initialized");

    let withings = WithingsClient::from_config(&config);
    tracing::info!(base_url = %config.withings_api_base, "Withings client initialized");

    let sync_service = SyncService::new(
        Arc::new(withings),
        Arc::new(CredentialVault::new(db.clone(), kms)),
        Arc::new(db),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        sync_service,
    });

    let app = weight_tracker::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("weight_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
