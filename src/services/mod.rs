// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod credentials;
pub mod crypto;
pub mod events;
pub mod gateway;
pub mod occurrence;
pub mod session;
pub mod strava;

pub use credentials::{CredentialManager, TokenExchange};
pub use crypto::{SessionKeys, TokenCipher};
pub use events::EventPipeline;
pub use gateway::StravaGateway;
pub use occurrence::{resolve_occurrence, OccurrenceWindow};
pub use session::{FirestoreSessionBackend, MemorySessionBackend, SessionBackend, SessionStore};
pub use strava::{StravaClient, StravaError, TokenResponse};
