// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Group event models: the upstream shape and the enriched shape served to
//! the calendar.

use crate::models::{Club, RouteInfo};
use crate::parsing::{opt_string_id, string_id};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Route summary embedded in a group event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct RouteStub {
    #[serde(default, deserialize_with = "opt_string_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Metres
    #[serde(default)]
    pub distance: Option<f64>,
    /// Metres
    #[serde(default)]
    pub elevation_gain: Option<f64>,
}

/// Group event as returned by `GET /clubs/{id}/group_events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(deserialize_with = "string_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub skill_levels: Option<i64>,
    #[serde(default)]
    pub terrain: Option<i64>,
    #[serde(default)]
    pub women_only: Option<bool>,
    #[serde(default)]
    pub private: Option<bool>,
    #[serde(default)]
    pub joined: Option<bool>,
    #[serde(default)]
    pub route: Option<RouteStub>,
    /// Candidate start times (RFC3339, UTC)
    #[serde(default)]
    pub upcoming_occurrences: Option<Vec<String>>,
}

/// Club name and logo shown next to each event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct ClubInfo {
    pub name: String,
    pub logo: String,
}

/// Event served by `GET /events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct EnrichedEvent {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub activity_type: Option<String>,
    pub address: Option<String>,
    pub skill_levels: Option<i64>,
    pub terrain: Option<i64>,
    pub women_only: Option<bool>,
    pub private: Option<bool>,
    pub joined: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteStub>,
    /// Resolved occurrence, ISO-8601 UTC
    pub start_date: String,
    pub strava_event_url: String,
    pub club_info: ClubInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_info: Option<RouteInfo>,
}

impl EnrichedEvent {
    /// Map an upstream event onto the served shape for a resolved occurrence.
    ///
    /// `route_info` is left empty; the pipeline fills it in afterwards.
    pub fn from_raw(raw: RawEvent, club: &Club, start: DateTime<Utc>) -> Self {
        Self {
            strava_event_url: club.event_url(&raw.id),
            start_date: format_utc_rfc3339(start),
            club_info: ClubInfo {
                name: club.name.clone().unwrap_or_default(),
                logo: club.profile_medium.clone().unwrap_or_default(),
            },
            route_info: None,
            id: raw.id,
            title: raw.title,
            description: raw.description,
            activity_type: raw.activity_type,
            address: raw.address,
            skill_levels: raw.skill_levels,
            terrain: raw.terrain,
            women_only: raw.women_only,
            private: raw.private,
            joined: raw.joined,
            route: raw.route,
        }
    }

    /// Route id, when the event has one to enrich.
    pub fn route_id(&self) -> Option<&str> {
        self.route.as_ref()?.id.as_deref().filter(|id| !id.is_empty())
    }
}
