// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cache-aside access to the Strava reads the event pipeline needs.
//!
//! Cache failures never fail a request: a read error is a miss and a write
//! error is logged and dropped. Cache hits do not touch Strava, so they do
//! not take a request permit either.

use crate::cache::{cache_key, CacheResource, CacheStore};
use crate::config::CacheTtls;
use crate::models::{Club, RawEvent, RouteDetail};
use crate::services::strava::{StravaClient, StravaError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Strava reads with per-user caching.
#[derive(Clone)]
pub struct StravaGateway {
    client: StravaClient,
    cache: Arc<dyn CacheStore>,
    ttls: CacheTtls,
}

impl StravaGateway {
    pub fn new(client: StravaClient, cache: Arc<dyn CacheStore>, ttls: CacheTtls) -> Self {
        Self {
            client,
            cache,
            ttls,
        }
    }

    /// The user's clubs.
    pub async fn clubs(&self, user_id: &str, access_token: &str) -> Result<Vec<Club>, StravaError> {
        let key = cache_key(user_id, CacheResource::Clubs);
        self.cached(&key, self.ttls.clubs, || self.client.list_clubs(access_token))
            .await
    }

    /// Upcoming events of one club.
    pub async fn club_events(
        &self,
        user_id: &str,
        access_token: &str,
        club_id: &str,
    ) -> Result<Vec<RawEvent>, StravaError> {
        let key = cache_key(user_id, CacheResource::ClubEvents(club_id));
        self.cached(&key, self.ttls.events, || {
            self.client.list_club_events(access_token, club_id)
        })
        .await
    }

    /// Route detail, or `None` if it could not be fetched.
    pub async fn route(
        &self,
        user_id: &str,
        access_token: &str,
        route_id: &str,
    ) -> Option<RouteDetail> {
        let key = cache_key(user_id, CacheResource::Route(route_id));
        match self
            .cached(&key, self.ttls.route, || {
                self.client.get_route(access_token, route_id)
            })
            .await
        {
            Ok(detail) => Some(detail),
            Err(e) => {
                tracing::warn!(route_id, error = %e, "Route detail unavailable, using basic info");
                None
            }
        }
    }

    async fn cached<T, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, StravaError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, StravaError>>,
    {
        if let Some(hit) = self.try_get_cached(key).await {
            return Ok(hit);
        }

        let fresh = fetch().await?;
        self.store_in_cache(key, &fresh, ttl).await;
        Ok(fresh)
    }

    async fn try_get_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn store_in_cache<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to encode value for cache");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, value, ttl).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }
}
