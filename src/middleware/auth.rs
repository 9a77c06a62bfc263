// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie authentication middleware.
//!
//! The `sce_session` cookie holds an HS256 JWT whose subject is the
//! server-side session id.

use crate::error::AppError;
use crate::models::Session;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "sce_session";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (session id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Create a JWT naming a session.
pub fn create_session_jwt(
    session_id: &str,
    signing_key: &[u8],
    ttl: Duration,
) -> anyhow::Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: session_id.to_string(),
        iat: now,
        exp: now + ttl.as_secs() as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Verify a session JWT and return the session id.
pub fn decode_session_jwt(token: &str, signing_key: &[u8]) -> Option<String> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims.sub)
}

/// Session cookie for a new login.
pub fn session_cookie(jwt: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, jwt))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(ttl.as_secs() as i64))
        .build()
}

/// Cookie that clears `name` when added to the jar with `remove`.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// Resolve the session named by the request's cookie, if any.
pub async fn session_from_cookies(
    state: &AppState,
    jar: &CookieJar,
) -> Result<Option<Session>, AppError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let Some(session_id) = decode_session_jwt(cookie.value(), &state.keys.cookie_key) else {
        tracing::debug!("Ignoring invalid session cookie");
        return Ok(None);
    };
    state.sessions.load(&session_id).await
}

/// Middleware that requires a logged-in session.
///
/// Inserts the [`Session`] as a request extension.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = session_from_cookies(&state, &jar)
        .await?
        .filter(|s| s.tokens.is_some())
        .ok_or(AppError::AuthRequired)?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_jwt_round_trip() {
        let key = b"cookie-key";
        let jwt = create_session_jwt("abc123", key, Duration::from_secs(60)).unwrap();
        assert_eq!(decode_session_jwt(&jwt, key).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_session_jwt_wrong_key_rejected() {
        let jwt = create_session_jwt("abc123", b"key-one", Duration::from_secs(60)).unwrap();
        assert_eq!(decode_session_jwt(&jwt, b"key-two"), None);
        assert_eq!(decode_session_jwt("not-a-jwt", b"key-one"), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("jwt".to_string(), Duration::from_secs(3600), true);
        let header = cookie.to_string();
        assert!(header.starts_with("sce_session=jwt"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("Secure"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=3600"));
    }
}
