// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava Club Events: upcoming group events across a user's Strava clubs
//!
//! This crate provides the backend for listing the next occurrence of every
//! club event in a forward window, enriched with route details, behind a
//! Strava OAuth login.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod parsing;
pub mod routes;
pub mod services;
pub mod time_utils;

use cache::CacheStore;
use config::Config;
use services::{
    CredentialManager, EventPipeline, SessionBackend, SessionKeys, SessionStore, StravaClient,
    StravaGateway, TokenCipher,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub keys: SessionKeys,
    pub sessions: SessionStore,
    pub cache: Arc<dyn CacheStore>,
    pub strava: StravaClient,
    pub credentials: CredentialManager,
    pub events: EventPipeline,
}

impl AppState {
    /// Wire up services over the given cache and session backends.
    pub fn new(
        config: Config,
        cache: Arc<dyn CacheStore>,
        session_backend: Arc<dyn SessionBackend>,
    ) -> anyhow::Result<Self> {
        let keys = SessionKeys::derive(&config.session_secret)?;
        let cipher = TokenCipher::new(&keys.token_key)?;
        let sessions = SessionStore::new(session_backend, cipher, config.session_ttl)?;

        let strava = StravaClient::new(&config)?;
        let credentials = CredentialManager::new(
            Arc::new(strava.clone()),
            sessions.clone(),
            config.refresh_buffer,
        );
        let gateway = StravaGateway::new(strava.clone(), cache.clone(), config.cache_ttls);
        let events = EventPipeline::new(gateway, config.event_window);

        Ok(Self {
            config,
            keys,
            sessions,
            cache,
            strava,
            credentials,
            events,
        })
    }
}
