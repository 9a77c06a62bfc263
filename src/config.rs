// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. Secrets are only held in memory.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which backend the cache and session stores use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageDriver {
    /// Per-process memory, lost on restart.
    Memory,
    /// Firestore collections with server-side TTL eviction.
    Firestore,
}

impl FromStr for StorageDriver {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "firestore" => Ok(Self::Firestore),
            other => Err(ConfigError::Invalid("storage driver", other.to_string())),
        }
    }
}

/// Per-resource cache lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub clubs: Duration,
    pub events: Duration,
    pub route: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            clubs: Duration::from_secs(15 * 60),
            events: Duration::from_secs(15 * 60),
            route: Duration::from_secs(60 * 60),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Server ---
    pub host: String,
    pub port: u16,
    /// Public base URL, used for the OAuth redirect URI.
    pub public_url: String,
    /// Directory of static front-end assets served at `/`.
    pub static_dir: String,

    // --- Strava ---
    pub strava_client_id: String,
    pub strava_client_secret: String,
    pub strava_api_url: String,
    pub strava_oauth_url: String,
    pub strava_scope: String,

    // --- Sessions ---
    /// Master secret; signing and encryption keys are derived from it.
    pub session_secret: Vec<u8>,
    pub session_ttl: Duration,
    pub secure_cookie: bool,
    pub session_driver: StorageDriver,

    // --- Cache ---
    pub cache_driver: StorageDriver,
    pub cache_ttls: CacheTtls,
    pub gcp_project_id: String,

    // --- Pipeline tuning ---
    pub event_window: chrono::Duration,
    pub refresh_buffer: chrono::Duration,
    pub upstream_timeout: Duration,
    pub upstream_max_concurrency: usize,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            public_url: "http://localhost:3000".to_string(),
            static_dir: "public".to_string(),
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            strava_api_url: "https://www.strava.com/api/v3".to_string(),
            strava_oauth_url: "https://www.strava.com/oauth".to_string(),
            strava_scope: "read".to_string(),
            session_secret: b"test_session_secret_32_bytes_min!".to_vec(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            secure_cookie: false,
            session_driver: StorageDriver::Memory,
            cache_driver: StorageDriver::Memory,
            cache_ttls: CacheTtls::default(),
            gcp_project_id: "test-project".to_string(),
            event_window: chrono::Duration::days(30),
            refresh_buffer: chrono::Duration::seconds(300),
            upstream_timeout: Duration::from_secs(10),
            upstream_max_concurrency: 8,
        }
    }

    /// OAuth redirect URI registered with Strava.
    pub fn redirect_uri(&self) -> String {
        format!("{}/callback", self.public_url.trim_end_matches('/'))
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = parse_or("PORT", 3000)?;
        let defaults = CacheTtls::default();

        let session_secret = required("SESSION_SECRET")?.into_bytes();
        if session_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "SESSION_SECRET",
                "must be at least 32 bytes".to_string(),
            ));
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "public".to_string()),

            strava_client_id: required("CLIENT_ID")?,
            strava_client_secret: required("CLIENT_SECRET")?,
            strava_api_url: env::var("STRAVA_API_URL")
                .unwrap_or_else(|_| "https://www.strava.com/api/v3".to_string()),
            strava_oauth_url: env::var("STRAVA_OAUTH_URL")
                .unwrap_or_else(|_| "https://www.strava.com/oauth".to_string()),
            strava_scope: env::var("STRAVA_SCOPE").unwrap_or_else(|_| "read".to_string()),

            session_secret,
            session_ttl: Duration::from_secs(parse_or("SESSION_TTL_SECS", 24 * 60 * 60)?),
            secure_cookie: parse_or("SESSION_SECURE_COOKIE", false)?,
            session_driver: parse_or("SESSION_DRIVER", StorageDriver::Memory)?,

            cache_driver: parse_or("CACHE_DRIVER", StorageDriver::Memory)?,
            cache_ttls: CacheTtls {
                clubs: ttl_ms("CACHE_TTL_CLUBS", defaults.clubs)?,
                events: ttl_ms("CACHE_TTL_EVENTS", defaults.events)?,
                route: ttl_ms("CACHE_TTL_ROUTE", defaults.route)?,
            },
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),

            event_window: chrono::Duration::days(parse_or("EVENT_WINDOW_DAYS", 30)?),
            refresh_buffer: chrono::Duration::seconds(parse_or("TOKEN_REFRESH_BUFFER_SECS", 300)?),
            upstream_timeout: Duration::from_secs(parse_or("UPSTREAM_TIMEOUT_SECS", 10)?),
            upstream_max_concurrency: parse_or("UPSTREAM_MAX_CONCURRENCY", 8usize)?.max(1),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

fn parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        _ => Ok(default),
    }
}

fn ttl_ms(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let millis: u64 = parse_or(name, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("CLIENT_ID", "test_id");
        env::set_var("CLIENT_SECRET", "test_secret");
        env::set_var("SESSION_SECRET", "test_session_secret_32_bytes_min!");
        env::set_var("CACHE_TTL_ROUTE", "120000");
        env::set_var("CACHE_DRIVER", "Memory");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.strava_client_id, "test_id");
        assert_eq!(config.strava_client_secret, "test_secret");
        assert_eq!(config.cache_driver, StorageDriver::Memory);
        assert_eq!(config.cache_ttls.route, Duration::from_secs(120));
        assert_eq!(config.cache_ttls.clubs, Duration::from_secs(900));
        assert_eq!(config.refresh_buffer, chrono::Duration::seconds(300));
        assert_eq!(config.event_window, chrono::Duration::days(30));
    }

    #[test]
    fn test_storage_driver_parse() {
        assert_eq!("firestore".parse::<StorageDriver>().unwrap(), StorageDriver::Firestore);
        assert_eq!(" memory ".parse::<StorageDriver>().unwrap(), StorageDriver::Memory);
        assert!("mongodb".parse::<StorageDriver>().is_err());
    }

    #[test]
    fn test_redirect_uri_strips_trailing_slash() {
        let mut config = Config::test_default();
        config.public_url = "https://events.example.com/".to_string();
        assert_eq!(config.redirect_uri(), "https://events.example.com/callback");
    }
}
