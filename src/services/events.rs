// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upcoming club event aggregation.
//!
//! clubs → per-club events (concurrent) → occurrence resolution →
//! per-event route enrichment (concurrent) → one list sorted by start.

use crate::error::AppError;
use crate::models::{Club, EnrichedEvent, RouteInfo};
use crate::services::gateway::StravaGateway;
use crate::services::occurrence::{resolve_occurrence, OccurrenceWindow};
use chrono::{DateTime, Duration, Utc};
use futures_util::future::{join_all, try_join_all};

/// Builds the `/events` response for one user.
#[derive(Clone)]
pub struct EventPipeline {
    gateway: StravaGateway,
    window_length: Duration,
}

impl EventPipeline {
    pub fn new(gateway: StravaGateway, window_length: Duration) -> Self {
        Self {
            gateway,
            window_length,
        }
    }

    /// Upcoming events across all of the user's clubs.
    pub async fn upcoming_events(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Vec<EnrichedEvent>, AppError> {
        self.upcoming_events_at(user_id, access_token, Utc::now())
            .await
    }

    /// As [`EventPipeline::upcoming_events`], with an explicit "now".
    pub async fn upcoming_events_at(
        &self,
        user_id: &str,
        access_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<EnrichedEvent>, AppError> {
        let window = OccurrenceWindow::starting_at(now, self.window_length);

        let clubs = self
            .gateway
            .clubs(user_id, access_token)
            .await
            .map_err(|e| AppError::UpstreamListing(format!("clubs: {}", e)))?;

        let per_club = try_join_all(
            clubs
                .iter()
                .map(|club| self.events_for_club(user_id, access_token, club, &window)),
        )
        .await?;

        let mut events: Vec<(DateTime<Utc>, EnrichedEvent)> =
            per_club.into_iter().flatten().collect();
        events.sort_by_key(|(start, _)| *start);

        tracing::debug!(
            user_id,
            clubs = clubs.len(),
            events = events.len(),
            "Aggregated upcoming events"
        );

        Ok(events.into_iter().map(|(_, event)| event).collect())
    }

    async fn events_for_club(
        &self,
        user_id: &str,
        access_token: &str,
        club: &Club,
        window: &OccurrenceWindow,
    ) -> Result<Vec<(DateTime<Utc>, EnrichedEvent)>, AppError> {
        let raw_events = self
            .gateway
            .club_events(user_id, access_token, &club.id)
            .await
            .map_err(|e| AppError::UpstreamListing(format!("club {} events: {}", club.id, e)))?;

        let resolved = raw_events.into_iter().filter_map(|raw| {
            let occurrences = raw.upcoming_occurrences.as_deref().unwrap_or_default();
            let start = resolve_occurrence(occurrences, window)?;
            Some((start, EnrichedEvent::from_raw(raw, club, start)))
        });

        Ok(join_all(resolved.map(|(start, event)| async move {
            (start, self.attach_route_info(user_id, access_token, event).await)
        }))
        .await)
    }

    async fn attach_route_info(
        &self,
        user_id: &str,
        access_token: &str,
        mut event: EnrichedEvent,
    ) -> EnrichedEvent {
        let Some(route_id) = event.route_id().map(str::to_string) else {
            return event;
        };

        let activity_type = event.activity_type.as_deref();
        let info = match self.gateway.route(user_id, access_token, &route_id).await {
            Some(detail) => RouteInfo::detailed(&detail, activity_type),
            None => RouteInfo::basic(event.route.as_ref(), activity_type),
        };
        event.route_info = Some(info);
        event
    }
}
