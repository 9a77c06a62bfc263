// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use strava_club_events::cache::MemoryCache;
use strava_club_events::config::Config;
use strava_club_events::db::FirestoreDb;
use strava_club_events::middleware::auth::{create_session_jwt, SESSION_COOKIE};
use strava_club_events::models::{AthleteProfile, Session, TokenBundle};
use strava_club_events::routes::create_router;
use strava_club_events::services::MemorySessionBackend;
use strava_club_events::time_utils::format_utc_rfc3339;
use strava_club_events::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Test config pointing Strava API and OAuth calls at a mock server.
#[allow(dead_code)]
pub fn test_config(strava_base: &str) -> Config {
    let mut config = Config::test_default();
    config.strava_api_url = format!("{}/api/v3", strava_base);
    config.strava_oauth_url = format!("{}/oauth", strava_base);
    config.upstream_timeout = std::time::Duration::from_secs(2);
    config
}

/// Create a test app with in-memory cache and sessions.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(
        AppState::new(
            config,
            Arc::new(MemoryCache::new()),
            Arc::new(MemorySessionBackend::new()),
        )
        .expect("Failed to build app state"),
    );
    (create_router(state.clone()), state)
}

/// Token bundle expiring `secs_from_now` seconds from now.
#[allow(dead_code)]
pub fn tokens_expiring_in(secs_from_now: i64) -> TokenBundle {
    TokenBundle {
        access_token: "test-access".to_string(),
        refresh_token: "test-refresh".to_string(),
        expires_at: Utc::now().timestamp() + secs_from_now,
    }
}

#[allow(dead_code)]
pub fn test_athlete() -> AthleteProfile {
    AthleteProfile {
        id: "4242".to_string(),
        firstname: Some("Test".to_string()),
        lastname: Some("Rider".to_string()),
        profile: Some("https://example.com/avatar.jpg".to_string()),
    }
}

/// Store a session and return it with its `Cookie` header value.
#[allow(dead_code)]
pub async fn login(
    state: &AppState,
    tokens: Option<TokenBundle>,
    athlete: Option<AthleteProfile>,
) -> (Session, String) {
    let mut session = state.sessions.create().unwrap();
    session.tokens = tokens;
    session.athlete = athlete;
    state.sessions.save(&session).await.unwrap();

    let jwt = create_session_jwt(
        &session.id,
        &state.keys.cookie_key,
        state.config.session_ttl,
    )
    .unwrap();
    (session, format!("{}={}", SESSION_COOKIE, jwt))
}

/// Timestamp `days` from now in Strava's format.
#[allow(dead_code)]
pub fn days_from_now(days: i64) -> String {
    format_utc_rfc3339(Utc::now() + Duration::days(days))
}

/// Upstream group event JSON. Ids are written as bare numbers.
#[allow(dead_code)]
pub fn raw_event(id: &str, title: &str, occurrences: &[String], route_id: Option<&str>) -> String {
    let route = match route_id {
        Some(rid) => format!(
            r#"{{"id": {}, "name": "Route {}", "distance": 42195.0, "elevation_gain": 350.0}}"#,
            rid, rid
        ),
        None => "null".to_string(),
    };
    format!(
        r#"{{"id": {}, "title": {}, "description": "desc", "activity_type": "Ride",
            "address": "Town Square", "skill_levels": 2, "terrain": 1,
            "women_only": false, "private": false, "joined": true,
            "route": {}, "upcoming_occurrences": {}}}"#,
        id,
        json!(title),
        route,
        json!(occurrences)
    )
}

/// Upstream route detail JSON.
#[allow(dead_code)]
pub fn route_detail(id: &str) -> String {
    format!(
        r#"{{"id": {}, "name": "Route {}", "distance": 42195.0, "elevation_gain": 350.4,
            "type": 1, "sub_type": 1, "estimated_moving_time": 5400,
            "maximum_grade": 8.25, "elevation_high": 512.0, "elevation_low": 12.0}}"#,
        id, id
    )
}
