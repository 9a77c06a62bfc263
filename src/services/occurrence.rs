// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Picks the occurrence of a recurring group event to show.

use crate::time_utils::parse_utc_rfc3339;
use chrono::{DateTime, Duration, Utc};

/// Forward-looking window, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl OccurrenceWindow {
    pub fn starting_at(now: DateTime<Utc>, length: Duration) -> Self {
        Self {
            start: now,
            end: now + length,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// First candidate, in list order, that parses and falls inside `window`.
///
/// Candidates are not assumed to be sorted. Unparsable entries are skipped.
pub fn resolve_occurrence<S: AsRef<str>>(
    candidates: &[S],
    window: &OccurrenceWindow,
) -> Option<DateTime<Utc>> {
    candidates
        .iter()
        .filter_map(|c| parse_utc_rfc3339(c.as_ref()))
        .find(|instant| window.contains(*instant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::format_utc_rfc3339;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn window() -> OccurrenceWindow {
        OccurrenceWindow::starting_at(now(), Duration::days(30))
    }

    #[test]
    fn test_past_only_resolves_to_none() {
        let past = vec![format_utc_rfc3339(now() - Duration::days(1))];
        assert_eq!(resolve_occurrence(&past, &window()), None);
    }

    #[test]
    fn test_single_future_occurrence() {
        let start = now() + Duration::days(5);
        let candidates = vec![format_utc_rfc3339(start)];
        assert_eq!(resolve_occurrence(&candidates, &window()), Some(start));
    }

    #[test]
    fn test_first_in_list_order_wins() {
        let later = now() + Duration::days(10);
        let sooner = now() + Duration::days(2);
        let candidates = vec![format_utc_rfc3339(later), format_utc_rfc3339(sooner)];
        assert_eq!(resolve_occurrence(&candidates, &window()), Some(later));
    }

    #[test]
    fn test_window_is_inclusive() {
        let w = window();
        assert!(w.contains(w.start));
        assert!(w.contains(w.end));
        assert!(!w.contains(w.end + Duration::milliseconds(1)));
        assert!(!w.contains(w.start - Duration::milliseconds(1)));
    }

    #[test]
    fn test_skips_unparsable_and_out_of_window() {
        let inside = now() + Duration::days(3);
        let candidates = vec![
            "not a date".to_string(),
            format_utc_rfc3339(now() + Duration::days(45)),
            "2026-03-04T12:00:00+00:00".to_string(),
        ];
        assert_eq!(resolve_occurrence(&candidates, &window()), Some(inside));
    }

    #[test]
    fn test_empty_list() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(resolve_occurrence(&empty, &window()), None);
    }
}
