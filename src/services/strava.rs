// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Handles:
//! - Club, group event, route and athlete reads
//! - OAuth code exchange and token refresh
//! - A shared cap on in-flight requests and a per-request timeout
//!
//! Response bodies are decoded with large ids quoted, so 17+ digit ids
//! survive as strings.

use crate::config::Config;
use crate::models::{AthleteProfile, Club, RawEvent, RouteDetail, TokenBundle};
use crate::parsing::parse_json_with_string_ids;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Failures talking to Strava.
#[derive(Debug, thiserror::Error)]
pub enum StravaError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate limited by Strava")]
    RateLimited,

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StravaError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StravaError::Timeout
        } else {
            StravaError::Request(e.to_string())
        }
    }
}

/// Token endpoint response (code exchange and refresh).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// May be omitted on refresh
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Only present on code exchange
    #[serde(default)]
    pub athlete: Option<AthleteProfile>,
}

impl TokenResponse {
    /// Access-token expiry as a Unix timestamp: `expires_at` if given, else
    /// `now + expires_in`.
    pub fn expiry(&self, now: i64) -> Option<i64> {
        self.expires_at
            .or_else(|| self.expires_in.map(|secs| now + secs))
    }

    /// Build the next token bundle, keeping `previous_refresh` if Strava
    /// did not rotate the refresh token.
    pub fn into_bundle(
        self,
        previous_refresh: Option<&str>,
        now: i64,
    ) -> Result<TokenBundle, StravaError> {
        let expires_at = self
            .expiry(now)
            .ok_or_else(|| StravaError::Decode("token response has no expiry".to_string()))?;
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_string))
            .ok_or_else(|| StravaError::Decode("token response has no refresh token".to_string()))?;

        Ok(TokenBundle {
            access_token: self.access_token,
            refresh_token,
            expires_at,
        })
    }
}

/// Strava API client. Cheap to clone; clones share the connection pool and
/// the concurrency limit.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
    limiter: Arc<Semaphore>,
}

impl StravaClient {
    pub fn new(config: &Config) -> Result<Self, StravaError> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()?;

        Ok(Self {
            http,
            api_url: config.strava_api_url.trim_end_matches('/').to_string(),
            oauth_url: config.strava_oauth_url.trim_end_matches('/').to_string(),
            client_id: config.strava_client_id.clone(),
            client_secret: config.strava_client_secret.clone(),
            limiter: Arc::new(Semaphore::new(config.upstream_max_concurrency.max(1))),
        })
    }

    /// Clubs the athlete belongs to.
    pub async fn list_clubs(&self, access_token: &str) -> Result<Vec<Club>, StravaError> {
        let url = format!("{}/athlete/clubs", self.api_url);
        self.get_json(&url, access_token, &[]).await
    }

    /// Upcoming group events of a club (first page of 200).
    pub async fn list_club_events(
        &self,
        access_token: &str,
        club_id: &str,
    ) -> Result<Vec<RawEvent>, StravaError> {
        let url = format!(
            "{}/clubs/{}/group_events",
            self.api_url,
            urlencoding::encode(club_id)
        );
        self.get_json(
            &url,
            access_token,
            &[("upcoming", "true"), ("per_page", "200"), ("page", "1")],
        )
        .await
    }

    /// Route detail.
    pub async fn get_route(
        &self,
        access_token: &str,
        route_id: &str,
    ) -> Result<RouteDetail, StravaError> {
        let url = format!("{}/routes/{}", self.api_url, urlencoding::encode(route_id));
        self.get_json(&url, access_token, &[]).await
    }

    /// Authenticated athlete profile.
    pub async fn get_athlete(&self, access_token: &str) -> Result<AthleteProfile, StravaError> {
        let url = format!("{}/athlete", self.api_url);
        self.get_json(&url, access_token, &[]).await
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, StravaError> {
        self.post_token(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    /// Exchange an authorization code for tokens and the athlete profile.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, StravaError> {
        self.post_token(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Strava authorization page URL.
    pub fn authorize_url(&self, redirect_uri: &str, scope: &str, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}&approval_prompt=auto&scope={}&state={}",
            self.oauth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(scope),
            urlencoding::encode(state),
        )
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, StravaError> {
        let _permit = self.permit().await?;
        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(form)
            .send()
            .await?;

        check_response_json(response).await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, &str)],
    ) -> Result<T, StravaError> {
        let _permit = self.permit().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await?;

        check_response_json(response).await
    }

    async fn permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>, StravaError> {
        self.limiter
            .acquire()
            .await
            .map_err(|_| StravaError::Request("request limiter closed".to_string()))
    }
}

/// Check response status and decode the JSON body.
async fn check_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, StravaError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Strava rate limit hit (429)");
            return Err(StravaError::RateLimited);
        }

        return Err(StravaError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let text = response.text().await?;
    parse_json_with_string_ids(&text).map_err(|e| StravaError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_response(json: &str) -> TokenResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_expiry_prefers_expires_at() {
        let r = token_response(r#"{"access_token":"a","expires_at":2000,"expires_in":10}"#);
        assert_eq!(r.expiry(1000), Some(2000));

        let r = token_response(r#"{"access_token":"a","expires_in":21600}"#);
        assert_eq!(r.expiry(1000), Some(22600));

        let r = token_response(r#"{"access_token":"a"}"#);
        assert_eq!(r.expiry(1000), None);
    }

    #[test]
    fn test_into_bundle_keeps_previous_refresh_token() {
        let r = token_response(r#"{"access_token":"new","expires_in":60}"#);
        let bundle = r.into_bundle(Some("old-refresh"), 100).unwrap();
        assert_eq!(bundle.access_token, "new");
        assert_eq!(bundle.refresh_token, "old-refresh");
        assert_eq!(bundle.expires_at, 160);
    }

    #[test]
    fn test_into_bundle_uses_rotated_refresh_token() {
        let r = token_response(
            r#"{"access_token":"new","refresh_token":"rotated","expires_at":500}"#,
        );
        let bundle = r.into_bundle(Some("old-refresh"), 100).unwrap();
        assert_eq!(bundle.refresh_token, "rotated");
    }

    #[test]
    fn test_into_bundle_requires_some_refresh_token() {
        let r = token_response(r#"{"access_token":"new","expires_at":500}"#);
        assert!(matches!(r.into_bundle(None, 0), Err(StravaError::Decode(_))));
    }

    #[test]
    fn test_authorize_url() {
        let client = StravaClient::new(&Config::test_default()).unwrap();
        let url = client.authorize_url("http://localhost:3000/callback", "read", "abc");
        assert_eq!(
            url,
            "https://www.strava.com/oauth/authorize?client_id=test_client_id&response_type=code\
             &redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback&approval_prompt=auto\
             &scope=read&state=abc"
        );
    }
}
