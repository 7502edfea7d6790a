// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! `HH:MM:SS` (de)serialization for optional durations.

use chrono::TimeDelta;
use serde::{Deserialize, Deserializer, Serializer};

/// Format a duration as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_hms(duration: TimeDelta) -> String {
    let total = duration.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Parse `HH:MM:SS`, ignoring any fractional seconds.
pub fn parse_hms(s: &str) -> Option<TimeDelta> {
    let mut parts = s.trim().split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds = parts.next()?;
    let seconds: i64 = seconds.split('.').next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some(TimeDelta::seconds(hours * 3600 + minutes * 60 + seconds))
}

/// Null-safe sum: `None` when no input carries a value.
pub fn sum_durations<'a>(
    values: impl IntoIterator<Item = &'a Option<TimeDelta>>,
) -> Option<TimeDelta> {
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, d| Some(acc.unwrap_or_else(TimeDelta::zero) + *d))
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<TimeDelta>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_str(&format_hms(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<TimeDelta>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            parse_hms(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {}", s)))
        })
        .transpose()
    }
}

pub mod required {
    use super::*;

    pub fn serialize<S: Serializer>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_hms(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_hms(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {}", s)))
    }
}
