// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route detail (Strava `GET /routes/{id}`) and the display strings derived
//! from it.

use crate::models::RouteStub;
use crate::parsing::opt_string_id;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const NOT_AVAILABLE: &str = "N/A";
const UNNAMED_ROUTE: &str = "Unnamed Route";
const DEFAULT_ACTIVITY: &str = "Ride";

/// Detailed route record. Geometry and segments are not decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDetail {
    #[serde(default, deserialize_with = "opt_string_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub elevation_gain: Option<f64>,
    #[serde(default, rename = "type")]
    pub route_type: Option<i64>,
    #[serde(default)]
    pub sub_type: Option<i64>,
    /// Seconds
    #[serde(default)]
    pub estimated_moving_time: Option<f64>,
    /// Percent
    #[serde(default)]
    pub maximum_grade: Option<f64>,
    #[serde(default)]
    pub elevation_high: Option<f64>,
    #[serde(default)]
    pub elevation_low: Option<f64>,
}

/// Human-readable route summary attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct RouteInfo {
    pub name: String,
    pub distance: String,
    pub elevation_gain: String,
    pub activity_type: String,
    pub estimated_moving_time: String,
    pub max_slope: String,
    pub elevation_high: String,
    pub elevation_low: String,
}

impl RouteInfo {
    /// Full summary from a successful route detail fetch.
    pub fn detailed(detail: &RouteDetail, event_activity_type: Option<&str>) -> Self {
        let activity_type = route_type_label(detail.route_type, detail.sub_type)
            .or_else(|| event_activity_type.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_ACTIVITY.to_string());

        Self {
            name: route_name(detail.name.as_deref()),
            distance: format_distance(detail.distance),
            elevation_gain: format_meters(detail.elevation_gain),
            activity_type,
            estimated_moving_time: format_moving_time(detail.estimated_moving_time),
            max_slope: format_grade(detail.maximum_grade),
            elevation_high: format_meters(detail.elevation_high),
            elevation_low: format_meters(detail.elevation_low),
        }
    }

    /// Fallback summary from the stub already on the event, used when the
    /// detail fetch failed.
    pub fn basic(stub: Option<&RouteStub>, event_activity_type: Option<&str>) -> Self {
        Self {
            name: route_name(stub.and_then(|r| r.name.as_deref())),
            distance: format_distance(stub.and_then(|r| r.distance)),
            elevation_gain: format_meters(stub.and_then(|r| r.elevation_gain)),
            activity_type: event_activity_type
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_ACTIVITY)
                .to_string(),
            estimated_moving_time: NOT_AVAILABLE.to_string(),
            max_slope: NOT_AVAILABLE.to_string(),
            elevation_high: NOT_AVAILABLE.to_string(),
            elevation_low: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Zero and missing values both render as "N/A".
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && v.is_finite())
}

/// Round half up, matching how the calendar front-end rounds.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn route_name(name: Option<&str>) -> String {
    name.filter(|n| !n.is_empty())
        .unwrap_or(UNNAMED_ROUTE)
        .to_string()
}

fn format_distance(meters: Option<f64>) -> String {
    present(meters)
        .map(|m| format!("{:.1} km", m / 1000.0))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn format_meters(meters: Option<f64>) -> String {
    present(meters)
        .map(|m| format!("{}m", round_half_up(m)))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn format_grade(grade: Option<f64>) -> String {
    present(grade)
        .map(|g| format!("{}%", g))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn format_moving_time(seconds: Option<f64>) -> String {
    let Some(total) = present(seconds).map(|s| s.max(0.0) as u64) else {
        return NOT_AVAILABLE.to_string();
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

fn route_type_name(code: i64) -> Option<&'static str> {
    Some(match code {
        1 => "Ride",
        2 => "Run",
        3 => "Walk",
        4 => "Hike",
        5 => "Trail",
        6 => "Gravel Ride",
        7 => "Mountain Biking",
        8 => "E-Mountain Biking",
        _ => return None,
    })
}

fn route_sub_type_name(code: i64) -> Option<&'static str> {
    Some(match code {
        1 => "Road",
        2 => "Mountain Bike",
        3 => "Cross",
        4 => "Trail",
        5 => "Mixed",
        _ => return None,
    })
}

/// "Ride / Road" style label. `None` when the route carries neither code.
fn route_type_label(route_type: Option<i64>, sub_type: Option<i64>) -> Option<String> {
    if route_type.is_none() && sub_type.is_none() {
        return None;
    }
    let label = |code: Option<i64>, names: fn(i64) -> Option<&'static str>| match code {
        Some(c) => names(c)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Unknown: {}", c)),
        None => "Unknown".to_string(),
    };
    Some(format!(
        "{} / {}",
        label(route_type, route_type_name),
        label(sub_type, route_sub_type_name)
    ))
}
