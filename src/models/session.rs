// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session and OAuth token models.
//!
//! [`Session`] is the decrypted, in-request view. [`StoredSession`] is what
//! the session backends persist: token fields sealed, expiry attached.

use crate::parsing::string_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access/refresh token pair plus access-token expiry.
///
/// Replaced wholesale on refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
}

impl fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBundle")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Strava athlete profile, as returned with the token exchange and by
/// `GET /athlete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    #[serde(deserialize_with = "string_id")]
    pub id: String,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub profile: Option<String>,
}

/// Session state for one browser.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub tokens: Option<TokenBundle>,
    pub athlete: Option<AthleteProfile>,
}

impl Session {
    /// Empty session with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tokens: None,
            athlete: None,
        }
    }

    /// Namespace for this user's cache entries.
    ///
    /// The athlete id when known, so entries survive re-login. Falls back to
    /// the session id.
    pub fn cache_user_id(&self) -> String {
        self.athlete
            .as_ref()
            .map(|a| a.id.clone())
            .unwrap_or_else(|| format!("session-{}", self.id))
    }
}

/// Token fields after sealing; same shape as [`TokenBundle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Persisted form of a [`Session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub id: String,
    pub tokens: Option<SealedTokens>,
    pub athlete: Option<AthleteProfile>,
    pub expires_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
