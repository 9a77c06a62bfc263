// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Response cache for upstream Strava reads.
//!
//! Keys are `{user_id}:{resource}[:{id}]`, so one user's entries can be
//! cleared by prefix. Lifetimes are chosen per resource by the caller.
//! Backends are interchangeable behind [`CacheStore`].

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreCache;
pub use memory::MemoryCache;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Errors from a cache backend. Callers treat these as a miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid cache ttl: {0:?}")]
    InvalidTtl(Duration),
}

/// Key/value store with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a live entry. Expired entries are misses.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Insert or overwrite an entry; its lifetime starts now.
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Remove an entry. Returns whether one existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every entry under `{user_id}:`. Returns the count.
    async fn clear_user(&self, user_id: &str) -> Result<usize, CacheError>;
}

/// Cached upstream resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheResource<'a> {
    /// The athlete's clubs
    Clubs,
    /// Upcoming group events of one club
    ClubEvents(&'a str),
    /// Route detail
    Route(&'a str),
}

impl CacheResource<'_> {
    fn type_name(&self) -> &'static str {
        match self {
            CacheResource::Clubs => "clubs",
            CacheResource::ClubEvents(_) => "events",
            CacheResource::Route(_) => "route",
        }
    }

    fn resource_id(&self) -> Option<&str> {
        match self {
            CacheResource::Clubs => None,
            CacheResource::ClubEvents(id) | CacheResource::Route(id) => Some(id),
        }
    }
}

/// Build a cache key: `{user_id}:{type}[:{id}]`.
pub fn cache_key(user_id: &str, resource: CacheResource<'_>) -> String {
    match resource.resource_id() {
        Some(id) if !id.is_empty() => format!("{}:{}:{}", user_id, resource.type_name(), id),
        _ => format!("{}:{}", user_id, resource.type_name()),
    }
}

/// Owner portion of a cache key.
pub fn key_user_id(key: &str) -> &str {
    key.split_once(':').map_or(key, |(user, _)| user)
}

fn user_prefix(user_id: &str) -> String {
    format!("{}:", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_shapes() {
        assert_eq!(cache_key("42", CacheResource::Clubs), "42:clubs");
        assert_eq!(
            cache_key("42", CacheResource::ClubEvents("12345678901234567")),
            "42:events:12345678901234567"
        );
        assert_eq!(cache_key("42", CacheResource::Route("9")), "42:route:9");
        assert_eq!(cache_key("42", CacheResource::Route("")), "42:route");
    }

    #[test]
    fn test_key_user_id() {
        assert_eq!(key_user_id("42:events:7"), "42");
        assert_eq!(key_user_id("nocolon"), "nocolon");
    }
}
