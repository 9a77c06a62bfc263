// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for logged-in users.

use crate::error::Result;
use crate::models::{EnrichedEvent, Session};
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require a session with tokens).
/// The session middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(get_events))
        .route("/me", get(get_me))
}

// ─── Events ──────────────────────────────────────────────────

/// Upcoming events across the user's clubs, soonest first.
async fn get_events(
    State(state): State<Arc<AppState>>,
    Extension(mut session): Extension<Session>,
) -> Result<Json<Vec<EnrichedEvent>>> {
    let tokens = state.credentials.ensure_valid(&mut session).await?;
    let events = state
        .events
        .upcoming_events(&session.cache_user_id(), &tokens.access_token)
        .await?;
    Ok(Json(events))
}

// ─── User Profile ────────────────────────────────────────────

/// Current athlete response.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct MeResponse {
    pub id: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub profile: Option<String>,
}

/// Logged-in athlete profile.
///
/// Sessions created before the profile was stored fetch it once from Strava.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(mut session): Extension<Session>,
) -> Result<Json<MeResponse>> {
    let athlete = match session.athlete.clone() {
        Some(athlete) => athlete,
        None => {
            let tokens = state.credentials.ensure_valid(&mut session).await?;
            let athlete = state
                .strava
                .get_athlete(&tokens.access_token)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to fetch athlete profile: {}", e))?;
            session.athlete = Some(athlete.clone());
            state.sessions.save(&session).await?;
            athlete
        }
    };

    Ok(Json(MeResponse {
        id: athlete.id,
        firstname: athlete.firstname,
        lastname: athlete.lastname,
        profile: athlete.profile,
    }))
}
