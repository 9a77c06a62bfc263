// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Only the authentication errors and the generic failure are visible to
//! clients. Cache and enrichment problems are absorbed before they get here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No token bundle in the session.
    #[error("Not logged in")]
    AuthRequired,

    /// The refresh exchange failed; the client must log in again.
    #[error("Session expired. Please log in again.")]
    SessionExpired,

    /// Clubs or club events could not be listed.
    #[error("Upstream listing failed: {0}")]
    UpstreamListing(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthRequired | AppError::SessionExpired => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamListing(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match &self {
            AppError::AuthRequired => "Not logged in".to_string(),
            AppError::SessionExpired => {
                tracing::info!("Rejecting request, session expired");
                "Session expired. Please log in again.".to_string()
            }
            AppError::BadRequest(msg) => msg.clone(),
            AppError::UpstreamListing(msg) => {
                tracing::error!(error = %msg, "Upstream listing failed");
                "Something went wrong".to_string()
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                "Something went wrong".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                "Something went wrong".to_string()
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
