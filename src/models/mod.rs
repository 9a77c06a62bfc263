// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod club;
pub mod event;
pub mod route;
pub mod session;

pub use club::Club;
pub use event::{ClubInfo, EnrichedEvent, RawEvent, RouteStub};
pub use route::{RouteDetail, RouteInfo};
pub use session::{AthleteProfile, SealedTokens, Session, StoredSession, TokenBundle};
