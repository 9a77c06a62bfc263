// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process cache backend.
//!
//! Expired entries are removed lazily on `get`, and in bulk by
//! [`MemoryCache::purge_expired`], which `main` runs on an interval.

use super::{user_prefix, CacheError, CacheStore};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache held in process memory, shared across requests.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, "Purged expired cache entries");
        }
        removed
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = Instant::now();

        // The read guard must be released before removing.
        let hit = match self.entries.get(key) {
            None => {
                tracing::debug!(key, "Cache miss");
                return Ok(None);
            }
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => None,
        };

        if hit.is_none() {
            tracing::debug!(key, "Cache entry expired");
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        } else {
            tracing::debug!(key, "Cache hit");
        }
        Ok(hit)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or(CacheError::InvalidTtl(ttl))?;
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
        tracing::debug!(key, ttl_ms = ttl.as_millis() as u64, "Cache set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let deleted = self.entries.remove(key).is_some();
        if deleted {
            tracing::debug!(key, "Cache entry deleted");
        }
        Ok(deleted)
    }

    async fn clear_user(&self, user_id: &str) -> Result<usize, CacheError> {
        let prefix = user_prefix(user_id);
        let mut cleared = 0;
        self.entries.retain(|key, _| {
            let owned = key.starts_with(&prefix);
            if owned {
                cleared += 1;
            }
            !owned
        });
        if cleared > 0 {
            tracing::debug!(user_id, cleared, "Cleared user cache entries");
        }
        Ok(cleared)
    }
}
