// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Canonical timestamp type and normalization.
//!
//! Stored documents carry `createdAt`/`updatedAt` in whatever shape the
//! writer produced: an RFC3339 string, epoch milliseconds, or a server
//! timestamp wrapper (`{ "seconds": .., "nanoseconds": .. }`, or the
//! underscore-prefixed REST variant). Everything is normalized to a single
//! UTC instant at deserialization time so downstream comparisons only ever
//! see one type.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A normalized point in time, comparable across all source representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current instant.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Build from a server-timestamp wrapper (`seconds` + `nanoseconds`).
    pub fn from_seconds(seconds: i64, nanos: u32) -> Self {
        Self(DateTime::from_timestamp(seconds, nanos).unwrap_or_default())
    }

    /// Build from epoch milliseconds (native date value).
    pub fn from_millis(millis: i64) -> Self {
        Self(Utc.timestamp_millis_opt(millis).single().unwrap_or_default())
    }

    /// Parse an ISO 8601 / RFC3339 string.
    pub fn parse_iso(raw: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .ok()
    }

    /// Epoch milliseconds, the canonical numeric comparison key.
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn to_rfc3339(&self) -> String {
        format_utc_rfc3339(self.0)
    }
}

impl Default for Timestamp {
    /// Epoch zero; unresolvable timestamps sort first.
    fn default() -> Self {
        Self(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an RFC3339 string, epoch milliseconds, or a seconds/nanoseconds object")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Timestamp, E> {
        Timestamp::parse_iso(v).ok_or_else(|| E::custom(format!("invalid timestamp: {v}")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Timestamp, E> {
        Ok(Timestamp::from_millis(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Timestamp, E> {
        i64::try_from(v)
            .map(Timestamp::from_millis)
            .map_err(|_| E::custom("timestamp out of range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Timestamp, E> {
        Ok(Timestamp::from_millis(v as i64))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Timestamp, E> {
        Ok(Timestamp::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Timestamp, E> {
        Ok(Timestamp::default())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Timestamp, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Timestamp, A::Error> {
        let mut seconds: Option<i64> = None;
        let mut nanos: u32 = 0;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "seconds" | "_seconds" => seconds = Some(map.next_value::<f64>()? as i64),
                "nanoseconds" | "_nanoseconds" => nanos = map.next_value::<f64>()? as u32,
                _ => {
                    map.next_value::<de::IgnoredAny>()?;
                }
            }
        }

        let seconds = seconds.ok_or_else(|| de::Error::missing_field("seconds"))?;
        Ok(Timestamp::from_seconds(seconds, nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wrapper_and_native_date_compare_equal() {
        let wrapper: Timestamp = serde_json::from_value(json!({ "seconds": 1_700_000_000 })).unwrap();
        let native: Timestamp = serde_json::from_value(json!(1_700_000_000_i64 * 1000)).unwrap();

        assert_eq!(wrapper, native);
        assert_eq!(wrapper.as_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_rest_wrapper_and_iso_string() {
        let rest: Timestamp =
            serde_json::from_value(json!({ "_seconds": 1_700_000_000, "_nanoseconds": 0 })).unwrap();
        let iso: Timestamp = serde_json::from_value(json!("2023-11-14T22:13:20Z")).unwrap();

        assert_eq!(rest, iso);
    }

    #[test]
    fn test_nanoseconds_are_kept() {
        let a = Timestamp::from_seconds(10, 500_000_000);
        let b = Timestamp::from_seconds(10, 0);
        assert!(a > b);
        assert_eq!(a.as_millis(), 10_500);
    }

    #[test]
    fn test_null_is_epoch_zero() {
        let ts: Timestamp = serde_json::from_value(serde_json::Value::Null).unwrap();
        assert_eq!(ts.as_millis(), 0);
    }

    #[test]
    fn test_invalid_string_is_rejected() {
        let result: Result<Timestamp, _> = serde_json::from_value(json!("yesterday"));
        assert!(result.is_err());
    }

    #[test]
    fn test_serializes_as_rfc3339() {
        let ts = Timestamp::from_seconds(1_700_000_000, 0);
        assert_eq!(serde_json::to_value(ts).unwrap(), json!("2023-11-14T22:13:20.000Z"));
    }
}
