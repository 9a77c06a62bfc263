// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upstream gateway tests against a mock Strava server.
//!
//! These tests verify that:
//! 1. Large ids survive decoding as strings
//! 2. Cached reads do not reach Strava again
//! 3. Route failures are soft, listing failures are hard
//! 4. Cache backend failures are treated as misses

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use strava_club_events::cache::{CacheError, CacheStore, MemoryCache};
use strava_club_events::services::{StravaClient, StravaError, StravaGateway};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

fn gateway_with(server: &MockServer, cache: Arc<dyn CacheStore>) -> StravaGateway {
    let config = common::test_config(&server.uri());
    let client = StravaClient::new(&config).unwrap();
    StravaGateway::new(client, cache, config.cache_ttls)
}

/// Cache whose backend is always down.
struct BrokenCache;

#[async_trait]
impl CacheStore for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
        Err(CacheError::Backend("unavailable".to_string()))
    }
    async fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Backend("unavailable".to_string()))
    }
    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::Backend("unavailable".to_string()))
    }
    async fn clear_user(&self, _user_id: &str) -> Result<usize, CacheError> {
        Err(CacheError::Backend("unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_large_club_id_preserved_as_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/athlete/clubs"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"[{"id": 12345678901234567, "name": "Big Club", "profile_medium": "https://x/logo.png"}]"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let gateway = gateway_with(&server, Arc::new(MemoryCache::new()));
    let clubs = gateway.clubs("u1", "tok").await.unwrap();

    assert_eq!(clubs.len(), 1);
    assert_eq!(clubs[0].id, "12345678901234567");
    assert_eq!(clubs[0].name.as_deref(), Some("Big Club"));
}

#[tokio::test]
async fn test_second_read_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/clubs/77/group_events"))
        .and(query_param("upcoming", "true"))
        .and(query_param("per_page", "200"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!("[{}]", common::raw_event("9001", "Tuesday ride", &[common::days_from_now(2)], None)),
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryCache::new());
    let gateway = gateway_with(&server, cache.clone());

    let first = gateway.club_events("u1", "tok", "77").await.unwrap();
    let second = gateway.club_events("u1", "tok", "77").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0].id, "9001");
    assert!(cache.get("u1:events:77").await.unwrap().is_some());
}

#[tokio::test]
async fn test_cache_is_per_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/athlete/clubs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"[{"id": 1, "name": "C"}]"#, "application/json"),
        )
        .expect(2)
        .mount(&server)
        .await;

    let gateway = gateway_with(&server, Arc::new(MemoryCache::new()));
    gateway.clubs("u1", "tok").await.unwrap();
    gateway.clubs("u2", "tok").await.unwrap();
    gateway.clubs("u1", "tok").await.unwrap();
}

#[tokio::test]
async fn test_route_failure_is_soft() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/routes/55"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryCache::new());
    let gateway = gateway_with(&server, cache.clone());

    assert!(gateway.route("u1", "tok", "55").await.is_none());
    // Failures are not cached.
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_route_detail_large_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/routes/3344556677889900112"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            common::route_detail("3344556677889900112"),
            "application/json",
        ))
        .mount(&server)
        .await;

    let gateway = gateway_with(&server, Arc::new(MemoryCache::new()));
    let detail = gateway
        .route("u1", "tok", "3344556677889900112")
        .await
        .unwrap();

    assert_eq!(detail.id.as_deref(), Some("3344556677889900112"));
    assert_eq!(detail.estimated_moving_time, Some(5400.0));
}

#[tokio::test]
async fn test_listing_status_error_is_hard() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/athlete/clubs"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let gateway = gateway_with(&server, Arc::new(MemoryCache::new()));
    let err = gateway.clubs("u1", "tok").await.unwrap_err();

    assert!(matches!(err, StravaError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_rate_limit_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/athlete/clubs"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let gateway = gateway_with(&server, Arc::new(MemoryCache::new()));
    let err = gateway.clubs("u1", "tok").await.unwrap_err();

    assert!(matches!(err, StravaError::RateLimited));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/athlete/clubs"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{not json", "application/json"))
        .mount(&server)
        .await;

    let gateway = gateway_with(&server, Arc::new(MemoryCache::new()));
    let err = gateway.clubs("u1", "tok").await.unwrap_err();

    assert!(matches!(err, StravaError::Decode(_)));
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/clubs/77/group_events"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("[]", "application/json")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = common::test_config(&server.uri());
    config.upstream_timeout = Duration::from_millis(200);
    let gateway = StravaGateway::new(
        StravaClient::new(&config).unwrap(),
        Arc::new(MemoryCache::new()),
        config.cache_ttls,
    );

    let err = gateway.club_events("u1", "tok", "77").await.unwrap_err();
    assert!(matches!(err, StravaError::Timeout));
}

#[tokio::test]
async fn test_broken_cache_falls_through_to_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/athlete/clubs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"[{"id": 5, "name": "C"}]"#, "application/json"),
        )
        .expect(2)
        .mount(&server)
        .await;

    let gateway = gateway_with(&server, Arc::new(BrokenCache));

    assert_eq!(gateway.clubs("u1", "tok").await.unwrap()[0].id, "5");
    assert_eq!(gateway.clubs("u1", "tok").await.unwrap()[0].id, "5");
}
