// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore cache backend.
//!
//! Entries live in the `cache` collection. A TTL policy on `expires_at`
//! evicts them server-side; that eviction is eventual, so reads check expiry
//! too.

use super::{key_user_id, CacheError, CacheStore};
use crate::db::{CacheDocument, FirestoreDb};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;

/// Cache shared by every instance pointed at the same Firestore project.
#[derive(Clone)]
pub struct FirestoreCache {
    db: FirestoreDb,
}

impl FirestoreCache {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Firestore document id for a cache key (`/` is not allowed in ids).
    pub fn doc_id(key: &str) -> String {
        urlencoding::encode(key).into_owned()
    }
}

fn backend(err: crate::error::AppError) -> CacheError {
    CacheError::Backend(err.to_string())
}

#[async_trait]
impl CacheStore for FirestoreCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let doc_id = Self::doc_id(key);
        let Some(doc) = self.db.get_cache_entry(&doc_id).await.map_err(backend)? else {
            tracing::debug!(key, "Cache miss");
            return Ok(None);
        };

        if doc.expires_at <= Utc::now() {
            tracing::debug!(key, "Cache entry expired");
            if let Err(e) = self.db.delete_cache_entry(&doc_id).await {
                tracing::warn!(key, error = %e, "Failed to delete expired cache entry");
            }
            return Ok(None);
        }

        tracing::debug!(key, "Cache hit");
        Ok(Some(serde_json::from_str(&doc.value)?))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let now = Utc::now();
        let lifetime = chrono::Duration::from_std(ttl).map_err(|_| CacheError::InvalidTtl(ttl))?;
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or(CacheError::InvalidTtl(ttl))?;

        let doc = CacheDocument {
            key: key.to_string(),
            user_id: key_user_id(key).to_string(),
            value: serde_json::to_string(&value)?,
            expires_at,
            updated_at: now,
        };

        self.db
            .set_cache_entry(&Self::doc_id(key), &doc)
            .await
            .map_err(backend)?;
        tracing::debug!(key, ttl_ms = ttl.as_millis() as u64, "Cache set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.db
            .delete_cache_entry(&Self::doc_id(key))
            .await
            .map_err(backend)
    }

    async fn clear_user(&self, user_id: &str) -> Result<usize, CacheError> {
        let cleared = self
            .db
            .delete_cache_entries_for_user(user_id, Self::doc_id)
            .await
            .map_err(backend)?;
        if cleared > 0 {
            tracing::debug!(user_id, cleared, "Cleared user cache entries");
        }
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_is_path_safe() {
        assert_eq!(FirestoreCache::doc_id("42:route:9"), "42%3Aroute%3A9");
        assert!(!FirestoreCache::doc_id("a/b:c").contains('/'));
    }

    #[tokio::test]
    async fn test_offline_backend_reports_error() {
        let cache = FirestoreCache::new(FirestoreDb::new_mock());
        let err = cache.get("42:clubs").await.unwrap_err();
        assert!(matches!(err, CacheError::Backend(_)));
    }
}
