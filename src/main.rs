// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava Club Events server
//!
//! Serves the upcoming group events of a user's Strava clubs, with route
//! details, behind a Strava OAuth login.

use std::sync::Arc;
use std::time::Duration;
use strava_club_events::{
    cache::{CacheStore, FirestoreCache, MemoryCache},
    config::{Config, StorageDriver},
    db::FirestoreDb,
    services::{FirestoreSessionBackend, MemorySessionBackend, SessionBackend},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired in-memory cache entries are swept.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Strava Club Events");

    // Firestore is only needed if one of the stores uses it
    let uses_firestore = config.cache_driver == StorageDriver::Firestore
        || config.session_driver == StorageDriver::Firestore;
    let db = if uses_firestore {
        Some(
            FirestoreDb::new(&config.gcp_project_id)
                .await
                .expect("Failed to connect to Firestore"),
        )
    } else {
        None
    };

    let mut memory_cache = None;
    let cache: Arc<dyn CacheStore> = match (config.cache_driver, &db) {
        (StorageDriver::Firestore, Some(db)) => Arc::new(FirestoreCache::new(db.clone())),
        _ => {
            let cache = MemoryCache::new();
            memory_cache = Some(cache.clone());
            Arc::new(cache)
        }
    };
    tracing::info!(driver = ?config.cache_driver, "Cache initialized");

    let session_backend: Arc<dyn SessionBackend> = match (config.session_driver, &db) {
        (StorageDriver::Firestore, Some(db)) => Arc::new(FirestoreSessionBackend::new(db.clone())),
        _ => Arc::new(MemorySessionBackend::new()),
    };
    tracing::info!(driver = ?config.session_driver, "Session store initialized");

    // Build shared state
    let state = Arc::new(
        AppState::new(config.clone(), cache, session_backend)
            .expect("Failed to initialize application state"),
    );

    // Periodically drop expired in-memory cache entries
    let sweeper = memory_cache.map(|cache| {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                cache.purge_expired();
            }
        })
    });

    // Build router
    let app = strava_club_events::routes::create_router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strava_club_events=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
