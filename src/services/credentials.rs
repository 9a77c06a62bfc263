// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access-token lifecycle for a session.
//!
//! Tokens are refreshed when they are within the refresh buffer of expiry.
//! Refreshes are serialized per session: the first task holding the lock
//! performs the exchange, and tasks that waited behind it pick up the stored
//! result instead of spending the refresh token a second time.

use crate::error::AppError;
use crate::models::{Session, TokenBundle};
use crate::services::session::SessionStore;
use crate::services::strava::{StravaClient, StravaError, TokenResponse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Refresh-token exchange.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, StravaError>;
}

#[async_trait]
impl TokenExchange for StravaClient {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, StravaError> {
        self.refresh_token(refresh_token).await
    }
}

/// Shared refresh locks, keyed by session id.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Keeps session tokens valid.
#[derive(Clone)]
pub struct CredentialManager {
    exchange: Arc<dyn TokenExchange>,
    sessions: SessionStore,
    refresh_buffer: chrono::Duration,
    refresh_locks: RefreshLocks,
}

impl CredentialManager {
    pub fn new(
        exchange: Arc<dyn TokenExchange>,
        sessions: SessionStore,
        refresh_buffer: chrono::Duration,
    ) -> Self {
        Self {
            exchange,
            sessions,
            refresh_buffer,
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    /// Whether `bundle` must be refreshed before use at `now`.
    pub fn needs_refresh(&self, bundle: &TokenBundle, now: DateTime<Utc>) -> bool {
        now.timestamp() >= bundle.expires_at - self.refresh_buffer.num_seconds()
    }

    /// Return a usable token bundle for `session`, refreshing if needed.
    ///
    /// `session` is updated in place with whatever ends up stored.
    pub async fn ensure_valid(&self, session: &mut Session) -> Result<TokenBundle, AppError> {
        let Some(current) = session.tokens.clone() else {
            return Err(AppError::AuthRequired);
        };

        if !self.needs_refresh(&current, Utc::now()) {
            return Ok(current);
        }

        let lock = self
            .refresh_locks
            .entry(session.id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.refresh_locked(session).await
        };

        // Nobody else is queued on this lock once ours is the last clone.
        drop(lock);
        self.refresh_locks
            .remove_if(&session.id, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    /// Refresh with the session's lock held.
    async fn refresh_locked(&self, session: &mut Session) -> Result<TokenBundle, AppError> {
        // The session may have been destroyed, or refreshed by another task,
        // while we waited.
        let stored = self.sessions.load(&session.id).await?;
        let refresh_from = match stored.and_then(|s| s.tokens) {
            Some(tokens) if !self.needs_refresh(&tokens, Utc::now()) => {
                session.tokens = Some(tokens.clone());
                return Ok(tokens);
            }
            Some(tokens) => tokens,
            None => {
                tracing::debug!(session_id = %session.id, "Session gone or logged out before refresh");
                session.tokens = None;
                return Err(AppError::SessionExpired);
            }
        };
        tracing::info!(session_id = %session.id, "Refreshing Strava access token");

        let refreshed = match self.exchange.refresh(&refresh_from.refresh_token).await {
            Ok(response) => response.into_bundle(
                Some(&refresh_from.refresh_token),
                Utc::now().timestamp(),
            ),
            Err(e) => Err(e),
        };

        match refreshed {
            Ok(bundle) => {
                session.tokens = Some(bundle.clone());
                self.sessions.save(session).await?;
                tracing::info!(
                    session_id = %session.id,
                    expires_at = bundle.expires_at,
                    "Token refresh successful"
                );
                Ok(bundle)
            }
            Err(e) => {
                tracing::warn!(session_id = %session.id, error = %e, "Token refresh failed");
                session.tokens = None;
                if let Err(save_err) = self.sessions.save(session).await {
                    tracing::warn!(error = %save_err, "Failed to clear tokens after refresh failure");
                }
                Err(AppError::SessionExpired)
            }
        }
    }

    /// Drop the refresh lock of a session that is going away.
    pub fn forget_session(&self, session_id: &str) {
        self.refresh_locks.remove(session_id);
    }
}
