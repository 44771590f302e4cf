// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course portal API server.
//!
//! Serves the student and admin portals of a programming course on top of
//! Firestore (or an in-memory store for local runs).

use course_portal::{
    config::{Config, StoreBackend},
    db::{FirestoreStore, MemoryStore, SharedStore},
    services::IdTokenVerifier,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, backend = ?config.store_backend, "Starting course portal API");

    let store: SharedStore = match config.store_backend {
        StoreBackend::Firestore => Arc::new(
            FirestoreStore::new(&config.gcp_project_id, config.subscription_poll_interval).await?,
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    if config.access_gate.is_none() {
        tracing::warn!("Access gate disabled: no credentials configured");
    }

    let identity = IdTokenVerifier::new(&config)?;

    let state = Arc::new(AppState::new(config.clone(), store, identity));
    let app = course_portal::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("course_portal=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
