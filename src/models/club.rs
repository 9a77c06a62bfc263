// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Club model (Strava `GET /athlete/clubs`).

use crate::parsing::string_id;
use serde::{Deserialize, Serialize};

/// A club the athlete belongs to.
///
/// Ids are opaque strings; Strava ids can exceed 2^53.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Club {
    #[serde(deserialize_with = "string_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Medium-sized club logo URL
    #[serde(default)]
    pub profile_medium: Option<String>,
}

impl Club {
    /// Deep link to one of this club's group events.
    pub fn event_url(&self, event_id: &str) -> String {
        format!(
            "https://www.strava.com/clubs/{}/group_events/{}",
            self.id, event_id
        )
    }
}
