// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Named field access for activities, including computed fields.
//!
//! Filters address activity fields by name. Every name is resolved through a
//! closed registry built once at startup, so a typo in a filter fails with
//! [`DbError::UnknownField`] instead of silently matching nothing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{DbError, Result};
use crate::models::duration::format_hms;
use crate::models::Activity;

/// Value of a field, as seen by filters.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Time(DateTime<Utc>),
    List(Vec<String>),
}

impl FieldValue {
    /// Compare against a textual operand from a filter expression.
    ///
    /// Lists match when they contain the operand, text matches case-insensitively.
    pub fn matches_str(&self, operand: &str) -> bool {
        match self {
            FieldValue::Null => operand.is_empty() || operand == "null",
            FieldValue::Bool(b) => operand.parse::<bool>().map(|o| o == *b).unwrap_or(false),
            FieldValue::Int(i) => operand.parse::<i64>().map(|o| o == *i).unwrap_or(false),
            FieldValue::Float(f) => operand
                .parse::<f64>()
                .map(|o| (o - f).abs() < f64::EPSILON)
                .unwrap_or(false),
            FieldValue::Text(s) => s.eq_ignore_ascii_case(operand),
            FieldValue::Time(t) => t.to_rfc3339().starts_with(operand),
            FieldValue::List(items) => items.iter().any(|i| i.eq_ignore_ascii_case(operand)),
        }
    }

    /// Numeric view used by ordering comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Time(t) => Some(t.timestamp() as f64),
            _ => None,
        }
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Time(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

type Resolver = fn(&Activity) -> FieldValue;

/// Registered field: a pure function of an activity plus a description.
#[derive(Clone)]
pub struct FieldDef {
    pub name: &'static str,
    pub description: &'static str,
    pub virtual_field: bool,
    resolver: Resolver,
}

impl FieldDef {
    pub fn resolve(&self, activity: &Activity) -> FieldValue {
        (self.resolver)(activity)
    }
}

impl std::fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("virtual_field", &self.virtual_field)
            .finish()
    }
}

/// Closed name → resolver registry.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: BTreeMap<&'static str, FieldDef>,
}

macro_rules! stored {
    ($name:literal, $desc:literal, $resolver:expr) => {
        FieldDef {
            name: $name,
            description: $desc,
            virtual_field: false,
            resolver: $resolver,
        }
    };
}

macro_rules! computed {
    ($name:literal, $desc:literal, $resolver:expr) => {
        FieldDef {
            name: $name,
            description: $desc,
            virtual_field: true,
            resolver: $resolver,
        }
    };
}

impl FieldRegistry {
    /// Registry of all stored activity fields plus the standard computed ones.
    pub fn standard() -> Self {
        let defs = vec![
            stored!("id", "db id", |a| a.id.into()),
            stored!("name", "activity name", |a| a.name.clone().into()),
            stored!("type", "activity type key", |a| a
                .activity_type
                .map(|t| t.key())
                .into()),
            stored!("description", "free text description", |a| a.description.clone().into()),
            stored!("tags", "tags", |a| a.tags.clone().into()),
            stored!("equipment", "equipment", |a| a.equipment.clone().into()),
            stored!("location_country", "country", |a| a.location_country.clone().into()),
            stored!("location_city", "city", |a| a.location_city.clone().into()),
            stored!("location_place", "place", |a| a.location_place.clone().into()),
            stored!("route", "route name", |a| a.route.clone().into()),
            stored!("time", "start time (UTC)", |a| a.time.into()),
            stored!("time_end", "end time (UTC)", |a| a.time_end.into()),
            stored!("timezone", "timezone name", |a| a.timezone.clone().into()),
            stored!("distance", "distance in meters", |a| a.distance.into()),
            stored!("ascent", "ascent in meters", |a| a.ascent.into()),
            stored!("descent", "descent in meters", |a| a.descent.into()),
            stored!("elevation_max", "maximum elevation", |a| a.elevation_max.into()),
            stored!("elevation_min", "minimum elevation", |a| a.elevation_min.into()),
            stored!("speed", "average speed", |a| a.speed.into()),
            stored!("speed_max", "maximum speed", |a| a.speed_max.into()),
            stored!("heartrate", "average heart rate", |a| a.heartrate.into()),
            stored!("heartrate_max", "maximum heart rate", |a| a.heartrate_max.into()),
            stored!("heartrate_min", "minimum heart rate", |a| a.heartrate_min.into()),
            stored!("calories", "calories", |a| a.calories.into()),
            stored!("raw_id", "source id", |a| a.raw_id.into()),
            stored!("raw_name", "source file name", |a| a.raw_name.clone().into()),
            stored!("uids", "external identifiers", |a| a
                .uids
                .iter()
                .map(|u| u.to_string())
                .collect::<Vec<_>>()
                .into()),
            computed!("classifiers", "services this activity was found on", |a| a
                .classifiers()
                .into()),
            computed!("multipart", "whether the activity has several parts", |a| a
                .multipart()
                .into()),
            computed!("duration", "duration as HH:MM:SS", |a| a
                .duration
                .map(format_hms)
                .into()),
            computed!("duration_moving", "moving duration as HH:MM:SS", |a| a
                .duration_moving
                .map(format_hms)
                .into()),
            computed!("year", "year of the start time", |a| a
                .time
                .map(|t| t.format("%Y").to_string())
                .into()),
        ];

        Self {
            fields: defs.into_iter().map(|d| (d.name, d)).collect(),
        }
    }

    /// Look up a field definition.
    pub fn get(&self, name: &str) -> Result<&FieldDef> {
        self.fields
            .get(name)
            .ok_or_else(|| DbError::UnknownField(name.to_string()))
    }

    /// Resolve a named field on an activity.
    pub fn value(&self, name: &str, activity: &Activity) -> Result<FieldValue> {
        Ok(self.get(name)?.resolve(activity))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Uid;

    #[test]
    fn test_stored_and_computed_fields() {
        let registry = FieldRegistry::standard();
        let activity = Activity {
            name: Some("Morning Ride".into()),
            distance: Some(12_000.0),
            uids: vec![Uid::new("polar", 1), Uid::new("strava", 2)],
            ..Default::default()
        };

        assert_eq!(
            registry.value("name", &activity).unwrap(),
            FieldValue::Text("Morning Ride".into())
        );
        assert_eq!(registry.value("distance", &activity).unwrap(), FieldValue::Float(12_000.0));
        assert_eq!(registry.value("calories", &activity).unwrap(), FieldValue::Null);
        assert_eq!(
            registry.value("classifiers", &activity).unwrap(),
            FieldValue::List(vec!["polar".into(), "strava".into()])
        );
        assert_eq!(registry.value("multipart", &activity).unwrap(), FieldValue::Bool(false));
        assert!(registry.get("classifiers").unwrap().virtual_field);
    }

    #[test]
    fn test_unknown_field_fails() {
        let registry = FieldRegistry::standard();
        let err = registry.value("distanse", &Activity::default()).unwrap_err();
        assert!(matches!(err, DbError::UnknownField(name) if name == "distanse"));
    }

    #[test]
    fn test_matches_str() {
        assert!(FieldValue::List(vec!["Polar".into()]).matches_str("polar"));
        assert!(FieldValue::Bool(true).matches_str("true"));
        assert!(FieldValue::Int(3).matches_str("3"));
        assert!(!FieldValue::Text("run".into()).matches_str("ride"));
        assert!(FieldValue::Null.matches_str("null"));
    }
}
