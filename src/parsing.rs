// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON decoding that keeps large numeric ids intact.
//!
//! Strava ids can exceed 2^53, which the browser cannot represent exactly.
//! Bare numeric `id` values of 16 or more digits are quoted before parsing,
//! so they travel through the cache and out to the client as strings.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::borrow::Cow;
use std::sync::LazyLock;

static LARGE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""id"\s*:\s*(\d{16,})"#).expect("valid id pattern"));

/// Quote bare numeric `id` fields of 16+ digits.
pub fn quote_large_ids(json: &str) -> Cow<'_, str> {
    LARGE_ID.replace_all(json, r#""id":"$1""#)
}

/// Parse JSON text after quoting large ids.
pub fn parse_json_with_string_ids<T: DeserializeOwned>(json: &str) -> serde_json::Result<T> {
    serde_json::from_str(&quote_large_ids(json))
}

/// Deserialize an id that may arrive as a JSON string or number.
pub fn string_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Str(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Str(s) => s,
        RawId::Unsigned(n) => n.to_string(),
        RawId::Signed(n) => n.to_string(),
    })
}

/// Like [`string_id`], for optional fields.
pub fn opt_string_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrap(#[serde(deserialize_with = "string_id")] String);

    Ok(Option::<Wrap>::deserialize(deserializer)?.map(|Wrap(id)| id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_seventeen_digit_id_becomes_string() {
        let value: Value =
            parse_json_with_string_ids(r#"[{"id": 12345678901234567, "name": "Club"}]"#).unwrap();
        assert_eq!(value[0]["id"], Value::String("12345678901234567".to_string()));
    }

    #[test]
    fn test_small_ids_left_alone() {
        let value: Value = parse_json_with_string_ids(r#"{"id": 42, "route": {"id":123}}"#).unwrap();
        assert_eq!(value["id"], Value::from(42));
        assert_eq!(value["route"]["id"], Value::from(123));
    }

    #[test]
    fn test_nested_and_compact_ids_quoted() {
        let text = r#"{"route":{"id":3344556677889900112},"athlete_id":1234567890123456789}"#;
        let value: Value = parse_json_with_string_ids(text).unwrap();
        assert_eq!(value["route"]["id"], "3344556677889900112");
        // Only fields literally named "id" are rewritten.
        assert!(value["athlete_id"].is_number());
    }

    #[test]
    fn test_string_id_accepts_both_shapes() {
        #[derive(Deserialize)]
        struct Thing {
            #[serde(deserialize_with = "string_id")]
            id: String,
            #[serde(default, deserialize_with = "opt_string_id")]
            other: Option<String>,
        }

        let a: Thing = serde_json::from_str(r#"{"id": 7, "other": "9"}"#).unwrap();
        assert_eq!(a.id, "7");
        assert_eq!(a.other.as_deref(), Some("9"));

        let b: Thing = serde_json::from_str(r#"{"id": "12345678901234567"}"#).unwrap();
        assert_eq!(b.id, "12345678901234567");
        assert_eq!(b.other, None);
    }
}
