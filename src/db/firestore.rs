// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Sessions (sealed OAuth tokens + athlete profile)
//! - Cache entries (upstream responses, per user)
//!
//! Expiry fields are stored as Firestore timestamps so a TTL policy can
//! evict documents server-side.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{AthleteProfile, SealedTokens, StoredSession};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Session document in the `sessions` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    pub id: String,
    pub tokens: Option<SealedTokens>,
    pub athlete: Option<AthleteProfile>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub expires_at: DateTime<Utc>,
}

impl From<&StoredSession> for SessionDocument {
    fn from(session: &StoredSession) -> Self {
        Self {
            id: session.id.clone(),
            tokens: session.tokens.clone(),
            athlete: session.athlete.clone(),
            expires_at: session.expires_at,
        }
    }
}

impl From<SessionDocument> for StoredSession {
    fn from(doc: SessionDocument) -> Self {
        Self {
            id: doc.id,
            tokens: doc.tokens,
            athlete: doc.athlete,
            expires_at: doc.expires_at,
        }
    }
}

/// Cache document in the `cache` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheDocument {
    pub key: String,
    /// Owner of the entry, for bulk clearing
    pub user_id: String,
    /// JSON-encoded value
    pub value: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub expires_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Storage(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Storage("Database not connected (offline mode)".to_string()))
    }

    // ─── Session Operations ──────────────────────────────────────

    /// Get a session by id.
    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionDocument>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SESSIONS)
            .obj()
            .one(session_id)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    /// Create or replace a session.
    pub async fn set_session(&self, session: &SessionDocument) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SESSIONS)
            .document_id(&session.id)
            .object(session)
            .execute()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Delete a session.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::SESSIONS)
            .document_id(session_id)
            .execute()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(())
    }

    // ─── Cache Operations ────────────────────────────────────────

    /// Get a cache document by document id.
    pub async fn get_cache_entry(&self, doc_id: &str) -> Result<Option<CacheDocument>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CACHE)
            .obj()
            .one(doc_id)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    /// Create or overwrite a cache document.
    pub async fn set_cache_entry(&self, doc_id: &str, entry: &CacheDocument) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CACHE)
            .document_id(doc_id)
            .object(entry)
            .execute()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Delete a cache document. Returns whether it existed.
    pub async fn delete_cache_entry(&self, doc_id: &str) -> Result<bool, AppError> {
        let existed = self.get_cache_entry(doc_id).await?.is_some();
        if existed {
            self.get_client()?
                .fluent()
                .delete()
                .from(collections::CACHE)
                .document_id(doc_id)
                .execute()
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;
        }
        Ok(existed)
    }

    /// Delete every cache document owned by a user. Returns the count.
    ///
    /// `doc_id_for` maps a stored key back to its document id.
    pub async fn delete_cache_entries_for_user(
        &self,
        user_id: &str,
        doc_id_for: fn(&str) -> String,
    ) -> Result<usize, AppError> {
        let client = self.get_client()?;
        let owner = user_id.to_string();

        let entries: Vec<CacheDocument> = client
            .fluent()
            .select()
            .from(collections::CACHE)
            .filter(move |q| q.for_all([q.field("user_id").eq(owner.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let count = entries.len();

        stream::iter(entries)
            .map(|entry| async move {
                client
                    .fluent()
                    .delete()
                    .from(collections::CACHE)
                    .document_id(doc_id_for(&entry.key))
                    .execute()
                    .await
                    .map_err(|e| AppError::Storage(e.to_string()))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(count)
    }
}
