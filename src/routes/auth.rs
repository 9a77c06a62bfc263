// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth login, callback and logout routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{
    create_session_jwt, removal_cookie, session_cookie, session_from_cookies, SESSION_COOKIE,
};
use crate::services::crypto::random_hex;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Cookie binding the OAuth `state` to the browser that started the login.
pub const NONCE_COOKIE: &str = "sce_oauth_nonce";

/// How long a login attempt stays valid.
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

const AUTH_FAILED: &str = "Authentication failed. Please try again.";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

/// Start OAuth flow - redirect to Strava authorization.
async fn login(State(state): State<Arc<AppState>>, jar: CookieJar) -> Result<(CookieJar, Redirect)> {
    let nonce = random_hex(16)?;
    let oauth_state = sign_state(&nonce, now_millis()?, &state.keys.state_key)?;

    let auth_url = state.strava.authorize_url(
        &state.config.redirect_uri(),
        &state.config.strava_scope,
        &oauth_state,
    );

    let nonce_cookie = Cookie::build((NONCE_COOKIE, nonce))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.secure_cookie)
        .max_age(time::Duration::minutes(10))
        .build();

    tracing::info!(
        client_id = %state.config.strava_client_id,
        "Starting OAuth flow, redirecting to Strava"
    );

    Ok((jar.add(nonce_cookie), Redirect::temporary(&auth_url)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CallbackParams {
    #[serde(default)]
    #[validate(length(min = 1, max = 512))]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn auth_failed() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, AUTH_FAILED).into_response()
}

/// OAuth callback - exchange code for tokens, create session.
async fn callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    if let Some(error) = params.error.as_deref() {
        tracing::warn!(error, "OAuth error from Strava");
        return Ok(auth_failed());
    }

    params
        .validate()
        .map_err(|e| AppError::BadRequest(format!("Invalid callback parameters: {}", e)))?;

    let expected_nonce = jar.get(NONCE_COOKIE).map(|c| c.value().to_string());
    let state_ok = match (params.state.as_deref(), expected_nonce) {
        (Some(raw), Some(expected)) => verify_state(raw, &state.keys.state_key, now_millis()?)
            .is_some_and(|nonce| bool::from(nonce.as_bytes().ct_eq(expected.as_bytes()))),
        _ => false,
    };
    if !state_ok {
        tracing::warn!("Invalid or tampered OAuth state parameter");
        return Err(AppError::BadRequest("Invalid OAuth state".to_string()));
    }

    let Some(code) = params.code.as_deref() else {
        tracing::warn!("OAuth callback without authorization code");
        return Ok(auth_failed());
    };

    tracing::info!("Exchanging authorization code for tokens");

    let exchanged = match state.strava.exchange_code(code).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Authorization code exchange failed");
            return Ok(auth_failed());
        }
    };
    let athlete = exchanged.athlete.clone();
    let tokens = match exchanged.into_bundle(None, Utc::now().timestamp()) {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!(error = %e, "Unusable token response");
            return Ok(auth_failed());
        }
    };

    // A login always starts a fresh session.
    if let Some(previous) = session_from_cookies(&state, &jar).await.ok().flatten() {
        if let Err(e) = state.sessions.destroy(&previous.id).await {
            tracing::warn!(error = %e, "Failed to destroy previous session");
        }
        state.credentials.forget_session(&previous.id);
    }

    let mut session = state.sessions.create()?;
    session.tokens = Some(tokens);
    session.athlete = athlete;
    state.sessions.save(&session).await?;

    tracing::info!(
        athlete_id = session.athlete.as_ref().map(|a| a.id.as_str()).unwrap_or("unknown"),
        "OAuth successful, session created"
    );

    let jwt = create_session_jwt(
        &session.id,
        &state.keys.cookie_key,
        state.config.session_ttl,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let jar = jar
        .remove(removal_cookie(NONCE_COOKIE))
        .add(session_cookie(
            jwt,
            state.config.session_ttl,
            state.config.secure_cookie,
        ));

    Ok((jar, Redirect::to("/")).into_response())
}

/// Logout - clear cached data, destroy the session, drop the cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    match session_from_cookies(&state, &jar).await {
        Ok(Some(session)) => {
            let user_id = session.cache_user_id();
            match state.cache.clear_user(&user_id).await {
                Ok(cleared) => tracing::info!(user_id = %user_id, cleared, "Cleared cached data on logout"),
                Err(e) => tracing::warn!(user_id = %user_id, error = %e, "Failed to clear cache on logout"),
            }
            if let Err(e) = state.sessions.destroy(&session.id).await {
                tracing::warn!(error = %e, "Failed to destroy session on logout");
            }
            state.credentials.forget_session(&session.id);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load session on logout"),
    }

    (jar.remove(removal_cookie(SESSION_COOKIE)), Redirect::to("/"))
}

/// Build the OAuth `state`: base64url of `nonce|timestamp_hex|hmac_hex`.
pub fn sign_state(nonce: &str, now_ms: u128, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", nonce, now_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify an OAuth `state` and return its nonce.
///
/// Rejects bad signatures and states older than ten minutes.
pub fn verify_state(state: &str, secret: &[u8], now_ms: u128) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [nonce, timestamp_hex, signature_hex] = parts.as_slice() else {
        return None;
    };

    let payload = format!("{}|{}", nonce, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_ms = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if now_ms.saturating_sub(issued_ms) > STATE_MAX_AGE_MS {
        tracing::warn!("OAuth state expired");
        return None;
    }

    Some(nonce.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"state-secret";
    const NOW: u128 = 1_770_000_000_000;

    #[test]
    fn test_verify_state_success() {
        let state = sign_state("abc123", NOW, SECRET).unwrap();
        assert_eq!(verify_state(&state, SECRET, NOW + 1_000).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_verify_state_wrong_secret() {
        let state = sign_state("abc123", NOW, SECRET).unwrap();
        assert_eq!(verify_state(&state, b"other-secret", NOW), None);
    }

    #[test]
    fn test_verify_state_tampered_nonce() {
        let state = sign_state("abc123", NOW, SECRET).unwrap();
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(state).unwrap()).unwrap();
        let tampered = URL_SAFE_NO_PAD.encode(decoded.replacen("abc123", "evil00", 1));
        assert_eq!(verify_state(&tampered, SECRET, NOW), None);
    }

    #[test]
    fn test_verify_state_expired() {
        let state = sign_state("abc123", NOW, SECRET).unwrap();
        assert!(verify_state(&state, SECRET, NOW + STATE_MAX_AGE_MS).is_some());
        assert_eq!(verify_state(&state, SECRET, NOW + STATE_MAX_AGE_MS + 1), None);
    }

    #[test]
    fn test_verify_state_malformed() {
        assert_eq!(verify_state("!!!", SECRET, NOW), None);
        assert_eq!(verify_state(&URL_SAFE_NO_PAD.encode("a|b"), SECRET, NOW), None);
    }

    #[test]
    fn test_callback_code_length_validated() {
        let ok = CallbackParams {
            code: Some("abc".to_string()),
            state: None,
            error: None,
        };
        assert!(ok.validate().is_ok());

        let too_long = CallbackParams {
            code: Some("x".repeat(513)),
            state: None,
            error: None,
        };
        assert!(too_long.validate().is_err());
    }
}
