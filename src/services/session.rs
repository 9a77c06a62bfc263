// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side session storage.
//!
//! The browser only holds a signed cookie naming the session id. Tokens and
//! the athlete profile live in a [`SessionBackend`], with token fields sealed
//! by [`TokenCipher`]. Every save pushes the expiry out by the session TTL.

use crate::db::{FirestoreDb, SessionDocument};
use crate::error::AppError;
use crate::models::{SealedTokens, Session, StoredSession, TokenBundle};
use crate::services::crypto::{random_hex, TokenCipher};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Persistence for sealed sessions.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Load a live session. Expired sessions are reported as absent.
    async fn load(&self, id: &str) -> Result<Option<StoredSession>, AppError>;
    async fn save(&self, session: &StoredSession) -> Result<(), AppError>;
    async fn destroy(&self, id: &str) -> Result<(), AppError>;
}

/// Sessions held in process memory.
#[derive(Clone, Default)]
pub struct MemorySessionBackend {
    sessions: Arc<DashMap<String, StoredSession>>,
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionBackend for MemorySessionBackend {
    async fn load(&self, id: &str) -> Result<Option<StoredSession>, AppError> {
        let now = Utc::now();
        let found = self.sessions.get(id).map(|s| s.clone());
        match found {
            Some(session) if session.is_expired(now) => {
                self.sessions.remove(id);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn save(&self, session: &StoredSession) -> Result<(), AppError> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), AppError> {
        self.sessions.remove(id);
        Ok(())
    }
}

/// Sessions in the Firestore `sessions` collection.
#[derive(Clone)]
pub struct FirestoreSessionBackend {
    db: FirestoreDb,
}

impl FirestoreSessionBackend {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionBackend for FirestoreSessionBackend {
    async fn load(&self, id: &str) -> Result<Option<StoredSession>, AppError> {
        let session = self.db.get_session(id).await?.map(StoredSession::from);
        // TTL eviction in Firestore is eventual.
        Ok(session.filter(|s| !s.is_expired(Utc::now())))
    }

    async fn save(&self, session: &StoredSession) -> Result<(), AppError> {
        self.db.set_session(&SessionDocument::from(session)).await
    }

    async fn destroy(&self, id: &str) -> Result<(), AppError> {
        self.db.delete_session(id).await
    }
}

/// Encrypting front end over a [`SessionBackend`].
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    cipher: TokenCipher,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        cipher: TokenCipher,
        ttl: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            backend,
            cipher,
            ttl: chrono::Duration::from_std(ttl)?,
        })
    }

    /// A fresh, unsaved session with a random 128-bit id.
    pub fn create(&self) -> Result<Session, AppError> {
        Ok(Session::new(random_hex(16)?))
    }

    /// Load and unseal a session.
    ///
    /// Tokens that fail to unseal are dropped (the session is kept), which
    /// sends the user back through login.
    pub async fn load(&self, id: &str) -> Result<Option<Session>, AppError> {
        let Some(stored) = self.backend.load(id).await? else {
            return Ok(None);
        };

        let tokens = match stored.tokens.as_ref().map(|t| self.open(t, id)).transpose() {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(session_id = id, error = %e, "Discarding unreadable session tokens");
                None
            }
        };

        Ok(Some(Session {
            id: stored.id,
            tokens,
            athlete: stored.athlete,
        }))
    }

    /// Seal and persist a session, extending its expiry.
    pub async fn save(&self, session: &Session) -> Result<(), AppError> {
        let tokens = session
            .tokens
            .as_ref()
            .map(|t| self.seal(t, &session.id))
            .transpose()?;

        let stored = StoredSession {
            id: session.id.clone(),
            tokens,
            athlete: session.athlete.clone(),
            expires_at: Utc::now() + self.ttl,
        };
        self.backend.save(&stored).await
    }

    pub async fn destroy(&self, id: &str) -> Result<(), AppError> {
        self.backend.destroy(id).await
    }

    fn seal(&self, tokens: &TokenBundle, session_id: &str) -> anyhow::Result<SealedTokens> {
        let aad = session_id.as_bytes();
        Ok(SealedTokens {
            access_token: self.cipher.seal(&tokens.access_token, aad)?,
            refresh_token: self.cipher.seal(&tokens.refresh_token, aad)?,
            expires_at: tokens.expires_at,
        })
    }

    fn open(&self, sealed: &SealedTokens, session_id: &str) -> anyhow::Result<TokenBundle> {
        let aad = session_id.as_bytes();
        Ok(TokenBundle {
            access_token: self.cipher.open(&sealed.access_token, aad)?,
            refresh_token: self.cipher.open(&sealed.refresh_token, aad)?,
            expires_at: sealed.expires_at,
        })
    }
}
