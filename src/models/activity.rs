// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalized activity record and its three merge operations.
//!
//! - [`Activity::union`] deduplicates records describing the same workout
//!   coming from different services.
//! - [`Activity::add`] aggregates sequential records (laps) into one.
//! - [`Activity::from_parts`] composes a multi-stage activity from its legs.

use std::collections::{BTreeMap, BTreeSet};
use std::iter;

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::duration::{self, sum_durations};
use super::uid::{normalize_uids, Uid};

/// Activity type catalogue, persisted by its snake_case key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Aerobics,
    Badminton,
    Ballet,
    Baseball,
    Basketball,
    Biathlon,
    Bike,
    BikeEbike,
    BikeErgo,
    BikeHand,
    BikeMountain,
    BikeRoad,
    Canoe,
    Climb,
    Crossfit,
    Drive,
    Ergo,
    Golf,
    Gym,
    Gymnastics,
    Hike,
    IceSkate,
    InlineSkate,
    Kayak,
    Kitesurf,
    Multisport,
    Paddle,
    PaddleStandup,
    Rollski,
    RollskiClassic,
    RollskiFree,
    Row,
    RowErgo,
    Run,
    RunBaby,
    RunErgo,
    Sail,
    Soccer,
    Skateboard,
    Ski,
    Snowboard,
    Snowshoe,
    Swim,
    SwimIndoor,
    SwimOutdoor,
    Surf,
    SurfWind,
    Test,
    Triathlon,
    Walk,
    Xcski,
    XcskiBackcountry,
    XcskiClassic,
    XcskiFree,
    Yoga,
    Other,
    #[serde(other)]
    Unknown,
}

impl ActivityType {
    /// Parse a persisted key; unknown keys map to [`ActivityType::Unknown`].
    pub fn from_key(key: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(key.to_string()))
            .unwrap_or(ActivityType::Unknown)
    }

    /// The persisted key of this type.
    pub fn key(&self) -> String {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(s)) => s,
            _ => "unknown".to_string(),
        }
    }

    pub fn display_name(&self) -> &'static str {
        use ActivityType::*;
        match self {
            Aerobics => "Aerobics",
            Badminton => "Badminton",
            Ballet => "Ballet",
            Baseball => "Baseball",
            Basketball => "Basketball",
            Biathlon => "Biathlon",
            Bike => "Cycling",
            BikeEbike => "E-Biking",
            BikeErgo => "Ergometer",
            BikeHand => "Handbiking",
            BikeMountain => "Mountain Biking",
            BikeRoad => "Road Cycling",
            Canoe => "Canoe",
            Climb => "Climbing",
            Crossfit => "Crossfit",
            Drive => "Driving",
            Ergo => "Ergotrainer",
            Golf => "Golf",
            Gym => "Strength Training",
            Gymnastics => "Gymnastics",
            Hike => "Hiking",
            IceSkate => "Ice Skating",
            InlineSkate => "Inline Skating",
            Kayak => "Kayak",
            Kitesurf => "Kitesurf",
            Multisport => "Multisport",
            Paddle => "Paddling",
            PaddleStandup => "Standup Paddling",
            Rollski => "Roller Skiing",
            RollskiClassic => "Roller Skiing - Classic",
            RollskiFree => "Roller Skiing - Freestyle",
            Row => "Rowing",
            RowErgo => "Rowing Ergometer",
            Run => "Run",
            RunBaby => "Run with Babyjogger",
            RunErgo => "Treadmill Run",
            Sail => "Sailing",
            Soccer => "Soccer",
            Skateboard => "Skateboard",
            Ski => "Alpine Ski",
            Snowboard => "Snowboard",
            Snowshoe => "Snowshoe",
            Swim => "Swimming",
            SwimIndoor => "Indoor Swimming",
            SwimOutdoor => "Openwater Swimming",
            Surf => "Surfing",
            SurfWind => "Windsurfing",
            Test => "Fitness Test",
            Triathlon => "Triathlon",
            Walk => "Walking",
            Xcski => "Cross Country Skiing",
            XcskiBackcountry => "Cross Country Skiing - Backcountry",
            XcskiClassic => "Cross Country Skiing - Classic",
            XcskiFree => "Cross Country Skiing - Freestyle",
            Yoga => "Yoga",
            Other => "Other",
            Unknown => "Unknown",
        }
    }
}

/// Uids belonging to one leg of a multipart activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityPart {
    pub uids: Vec<Uid>,
    /// Time between the end of the previous part and the start of this one
    #[serde(with = "duration::required")]
    pub gap: TimeDelta,
}

impl ActivityPart {
    pub fn new(mut uids: Vec<Uid>, gap: TimeDelta) -> Self {
        normalize_uids(&mut uids);
        Self { uids, gap }
    }

    /// Group uids into parts: uids sharing `classifier:local_id` land in the same part,
    /// whatever their file suffix.
    pub fn group(uids: &[Uid]) -> Vec<ActivityPart> {
        let mut groups: BTreeMap<Uid, Vec<Uid>> = BTreeMap::new();
        for uid in uids {
            groups.entry(uid.head()).or_default().push(uid.clone());
        }
        groups
            .into_values()
            .map(|uids| ActivityPart::new(uids, TimeDelta::zero()))
            .collect()
    }
}

/// One workout, normalized across services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Activity {
    /// Db-local id, assigned on insert and persisted as the record key
    #[serde(skip)]
    pub id: Option<u64>,
    /// External identifiers, always sorted and unique
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uids: Vec<Uid>,

    // ─── Description ─────────────────────────────────────────────
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<ActivityType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub equipment: Vec<String>,

    // ─── Location ────────────────────────────────────────────────
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_latitude_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_longitude_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_latitude_end: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_longitude_end: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    // ─── Time ────────────────────────────────────────────────────
    /// Start time (UTC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// End time (UTC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<DateTime<Utc>>,
    /// Start time in the activity's local timezone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localtime: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localtime_end: Option<DateTime<FixedOffset>>,
    /// IANA timezone name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub duration: Option<TimeDelta>,
    #[serde(with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub duration_moving: Option<TimeDelta>,

    // ─── Measurements ────────────────────────────────────────────
    /// Distance in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartrate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartrate_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartrate_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,

    // ─── Source payload ──────────────────────────────────────────
    /// Structured source data; kept in memory only
    #[serde(skip)]
    pub raw: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_name: Option<String>,

    // ─── Composition ─────────────────────────────────────────────
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<ActivityPart>,
}

/// First (or, when forced, last) present value among the sources.
fn pick<T: Clone>(
    sources: &[&Activity],
    force: bool,
    get: impl Fn(&Activity) -> &Option<T>,
) -> Option<T> {
    let mut present = sources.iter().filter_map(|a| get(*a).as_ref());
    if force {
        present.last().cloned()
    } else {
        present.next().cloned()
    }
}

/// Like [`pick`], with empty lists counting as absent.
fn pick_list<T: Clone>(
    sources: &[&Activity],
    force: bool,
    get: impl Fn(&Activity) -> &Vec<T>,
) -> Vec<T> {
    let mut present = sources.iter().map(|a| get(*a)).filter(|l| !l.is_empty());
    let chosen = if force { present.last() } else { present.next() };
    chosen.cloned().unwrap_or_default()
}

fn sum_present<T, I>(values: I) -> Option<T>
where
    T: Copy + std::ops::Add<Output = T>,
    I: IntoIterator<Item = Option<T>>,
{
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.map_or(v, |a| a + v)))
}

fn max_present<T: Copy + PartialOrd, I: IntoIterator<Item = Option<T>>>(values: I) -> Option<T> {
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, v| match acc {
            Some(a) if a >= v => Some(a),
            _ => Some(v),
        })
}

fn min_present<T: Copy + PartialOrd, I: IntoIterator<Item = Option<T>>>(values: I) -> Option<T> {
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, v| match acc {
            Some(a) if a <= v => Some(a),
            _ => Some(v),
        })
}

impl Activity {
    /// Create an empty activity carrying the given uids.
    pub fn with_uids(uids: impl IntoIterator<Item = Uid>) -> Self {
        let mut activity = Activity {
            uids: uids.into_iter().collect(),
            ..Default::default()
        };
        normalize_uids(&mut activity.uids);
        activity
    }

    // ─── Identity ────────────────────────────────────────────────

    /// Distinct classifiers of all uids, sorted.
    pub fn classifiers(&self) -> Vec<String> {
        self.uids
            .iter()
            .map(|u| u.classifier().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn has_classifier(&self, classifier: &str) -> bool {
        self.uids.iter().any(|u| u.classifier() == classifier)
    }

    /// Whether any of the given uids is one of ours.
    pub fn shares_uid(&self, uids: &[Uid]) -> bool {
        uids.iter().any(|u| self.uids.contains(u))
    }

    pub fn add_uid(&mut self, uid: Uid) {
        self.uids.push(uid);
        normalize_uids(&mut self.uids);
    }

    /// True when the activity has several parts, or when its uids name more than one
    /// activity of the same service (different local ids, or different part numbers).
    pub fn multipart(&self) -> bool {
        if self.parts.len() > 1 {
            return true;
        }

        let mut local_ids: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut part_numbers = BTreeSet::new();
        for uid in &self.uids {
            if let Some(local_id) = uid.local_id() {
                local_ids.entry(uid.classifier()).or_default().insert(local_id);
            }
            if let Some(part) = uid.part() {
                part_numbers.insert(part);
            }
        }
        local_ids.values().any(|ids| ids.len() > 1) || part_numbers.len() > 1
    }

    // ─── Tags ────────────────────────────────────────────────────

    pub fn tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
            self.tags.sort();
        }
    }

    pub fn untag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    // ─── Merge: union ────────────────────────────────────────────

    /// Field-by-field merge of `self` with `others`, returning a new record.
    ///
    /// Without `force` the first present value in `[self, others..]` wins and `id`
    /// stays ours. With `force` the last present value wins, `id` included; an
    /// absent value never overwrites a present one. Uids are always the sorted union.
    pub fn union(&self, others: &[&Activity], force: bool) -> Activity {
        let sources: Vec<&Activity> = iter::once(self).chain(others.iter().copied()).collect();
        Self::merge_sources(&sources, force, self.id)
    }

    /// In-place variant of [`Activity::union`].
    pub fn union_in_place(&mut self, others: &[&Activity], force: bool) -> &mut Self {
        *self = self.union(others, force);
        self
    }

    /// Build a record by merging `records` in order, without a base record.
    /// The id is left unset unless `force` picks one up.
    pub fn from_merge(records: &[&Activity], force: bool) -> Activity {
        Self::merge_sources(records, force, None)
    }

    fn merge_sources(sources: &[&Activity], force: bool, base_id: Option<u64>) -> Activity {
        let mut merged = Activity {
            id: if force {
                pick(sources, true, |a| &a.id)
            } else {
                base_id
            },
            uids: sources.iter().flat_map(|a| a.uids.iter().cloned()).collect(),
            ..Default::default()
        };
        normalize_uids(&mut merged.uids);

        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $( merged.$field = pick(sources, force, |a| &a.$field); )*
            };
        }
        macro_rules! merge_lists {
            ($($field:ident),* $(,)?) => {
                $( merged.$field = pick_list(sources, force, |a| &a.$field); )*
            };
        }

        merge!(
            name,
            activity_type,
            description,
            location_country,
            location_state,
            location_city,
            location_place,
            location_latitude_start,
            location_longitude_start,
            location_latitude_end,
            location_longitude_end,
            route,
            time,
            time_end,
            localtime,
            localtime_end,
            timezone,
            duration,
            duration_moving,
            distance,
            ascent,
            descent,
            elevation_max,
            elevation_min,
            speed,
            speed_max,
            heartrate,
            heartrate_max,
            heartrate_min,
            calories,
            raw,
            raw_id,
            raw_name,
        );
        merge_lists!(tags, equipment, parts);

        merged
    }

    // ─── Merge: add ──────────────────────────────────────────────

    /// Aggregate `self` and `others` as consecutive segments of one workout.
    ///
    /// Start is the earliest start, end times are cleared, distances, climbs, calories
    /// and durations are summed, extremes take max/min. Sums and extremes stay `None`
    /// when no record has a value. Everything else keeps `self`'s value.
    pub fn add(&self, others: &[&Activity]) -> Activity {
        let all: Vec<&Activity> = iter::once(self).chain(others.iter().copied()).collect();
        let mut result = self.clone();

        let earliest = all
            .iter()
            .filter(|a| a.time.is_some())
            .min_by_key(|a| a.time);
        result.time = earliest.and_then(|a| a.time);
        result.localtime = earliest.and_then(|a| a.localtime).or(self.localtime);
        result.time_end = None;
        result.localtime_end = None;

        result.distance = sum_present(all.iter().map(|a| a.distance));
        result.ascent = sum_present(all.iter().map(|a| a.ascent));
        result.descent = sum_present(all.iter().map(|a| a.descent));
        result.calories = sum_present(all.iter().map(|a| a.calories));
        result.elevation_max = max_present(all.iter().map(|a| a.elevation_max));
        result.duration = sum_durations(all.iter().map(|a| &a.duration));
        result.duration_moving = sum_durations(all.iter().map(|a| &a.duration_moving));
        result.heartrate_max = max_present(all.iter().map(|a| a.heartrate_max));
        result.heartrate_min = min_present(all.iter().map(|a| a.heartrate_min));

        result
    }

    /// In-place variant of [`Activity::add`].
    pub fn add_in_place(&mut self, others: &[&Activity]) -> &mut Self {
        *self = self.add(others);
        self
    }

    // ─── Merge: parts ────────────────────────────────────────────

    /// Compose an activity from its legs, which must already be sorted by time.
    pub fn from_parts(parts: &[&Activity]) -> Activity {
        let (Some(first), Some(last)) = (parts.first(), parts.last()) else {
            return Activity::default();
        };

        let mut composite = Activity {
            time: first.time,
            localtime: first.localtime,
            time_end: last.time_end,
            localtime_end: last.localtime_end,
            timezone: first.timezone.clone(),
            uids: parts.iter().flat_map(|p| p.uids.iter().cloned()).collect(),
            ..Default::default()
        };
        normalize_uids(&mut composite.uids);

        composite.duration = sum_durations(parts.iter().map(|p| &p.duration));
        composite.duration_moving = sum_durations(parts.iter().map(|p| &p.duration_moving));

        composite.distance = sum_present(parts.iter().map(|p| p.distance));
        composite.ascent = sum_present(parts.iter().map(|p| p.ascent));
        composite.descent = sum_present(parts.iter().map(|p| p.descent));
        composite.elevation_max = max_present(parts.iter().map(|p| p.elevation_max));
        composite.elevation_min = min_present(parts.iter().map(|p| p.elevation_min));
        composite.speed_max = max_present(parts.iter().map(|p| p.speed_max));
        composite.heartrate_max = max_present(parts.iter().map(|p| p.heartrate_max));
        composite.heartrate_min = min_present(parts.iter().map(|p| p.heartrate_min));
        composite.calories = sum_present(parts.iter().map(|p| p.calories));

        let mut previous_end: Option<DateTime<Utc>> = None;
        for part in parts {
            let gap = match (previous_end, part.time) {
                (Some(end), Some(start)) if start > end => start - end,
                _ => TimeDelta::zero(),
            };
            composite.parts.push(ActivityPart::new(part.uids.clone(), gap));
            previous_end = part.time_end.or(previous_end);
        }

        composite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn uid(s: &str) -> Uid {
        s.parse().unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 2, 22, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_union_first_present_wins() {
        let src1 = Activity {
            id: Some(1),
            name: Some("One".into()),
            ..Default::default()
        };
        let src2 = Activity {
            id: Some(2),
            distance: Some(10.0),
            calories: Some(20),
            ..Default::default()
        };
        let src3 = Activity {
            id: Some(3),
            calories: Some(100),
            heartrate: Some(100),
            ..Default::default()
        };

        let target = src1.union(&[&src2, &src3], false);
        assert_eq!(target.name.as_deref(), Some("One"));
        assert_eq!(target.distance, Some(10.0));
        assert_eq!(target.calories, Some(20));
        assert_eq!(target.heartrate, Some(100));
        assert_eq!(target.id, Some(1));
        // inputs untouched
        assert!(src1.calories.is_none());
    }

    #[test]
    fn test_union_force_last_present_wins() {
        let src1 = Activity {
            id: Some(1),
            name: Some("One".into()),
            ..Default::default()
        };
        let src2 = Activity {
            id: Some(2),
            distance: Some(10.0),
            calories: Some(20),
            ..Default::default()
        };
        let src3 = Activity {
            id: Some(3),
            calories: Some(100),
            heartrate: Some(100),
            ..Default::default()
        };

        let target = src1.union(&[&src2, &src3], true);
        assert_eq!(target.name.as_deref(), Some("One"));
        assert_eq!(target.distance, Some(10.0));
        assert_eq!(target.calories, Some(100));
        assert_eq!(target.id, Some(3));
    }

    #[test]
    fn test_union_merges_uids_sorted() {
        let a = Activity::with_uids([uid("strava:5"), uid("polar:2")]);
        let b = Activity::with_uids([uid("polar:2"), uid("polar:1")]);
        let merged = a.union(&[&b], false);
        assert_eq!(merged.uids, vec![uid("polar:1"), uid("polar:2"), uid("strava:5")]);
    }

    #[test]
    fn test_union_in_place_mutates_self() {
        let mut a = Activity {
            id: Some(7),
            ..Default::default()
        };
        let b = Activity {
            name: Some("Evening Run".into()),
            ..Default::default()
        };
        a.union_in_place(&[&b], false);
        assert_eq!(a.name.as_deref(), Some("Evening Run"));
        assert_eq!(a.id, Some(7));
    }

    #[test]
    fn test_from_merge_leaves_id_unset() {
        let src1 = Activity {
            id: Some(1),
            name: Some("One".into()),
            ..Default::default()
        };
        let src2 = Activity {
            id: Some(2),
            calories: Some(20),
            ..Default::default()
        };
        let target = Activity::from_merge(&[&src1, &src2], false);
        assert_eq!(target.id, None);
        assert_eq!(target.name.as_deref(), Some("One"));
        assert_eq!(target.calories, Some(20));
    }

    #[test]
    fn test_union_lists_treat_empty_as_absent() {
        let a = Activity::default();
        let b = Activity {
            tags: vec!["race".into()],
            ..Default::default()
        };
        let c = Activity {
            tags: vec!["commute".into()],
            ..Default::default()
        };
        assert_eq!(a.union(&[&b, &c], false).tags, vec!["race".to_string()]);
        assert_eq!(a.union(&[&b, &c], true).tags, vec!["commute".to_string()]);
    }

    #[test]
    fn test_add() {
        let src1 = Activity {
            time: Some(at(7)),
            time_end: Some(at(8)),
            distance: Some(10.0),
            duration: Some(TimeDelta::hours(1)),
            heartrate_max: Some(180),
            heartrate_min: Some(100),
            ..Default::default()
        };
        let src2 = Activity {
            time: Some(at(8)),
            distance: Some(20.0),
            duration: Some(TimeDelta::minutes(80)),
            ..Default::default()
        };
        let src3 = Activity {
            time: Some(at(9)),
            heartrate_max: Some(160),
            heartrate_min: Some(80),
            ..Default::default()
        };

        let target = Activity::default().add(&[&src3, &src1, &src2]);
        assert_eq!(target.time, Some(at(7)));
        assert_eq!(target.time_end, None);
        assert_eq!(target.distance, Some(30.0));
        assert_eq!(target.ascent, None);
        assert_eq!(target.elevation_max, None);
        assert_eq!(target.duration, Some(TimeDelta::minutes(140)));
        assert_eq!(target.duration_moving, None);
        assert_eq!(target.heartrate_max, Some(180));
        assert_eq!(target.heartrate_min, Some(80));
    }

    #[test]
    fn test_add_never_fabricates_zero() {
        let a = Activity::default();
        let b = Activity::default();
        let sum = a.add(&[&b]);
        assert_eq!(sum.distance, None);
        assert_eq!(sum.calories, None);
    }

    #[test]
    fn test_add_keeps_unaggregated_fields_of_self() {
        let a = Activity {
            name: Some("Laps".into()),
            speed: Some(3.0),
            ..Default::default()
        };
        let b = Activity {
            name: Some("Lap 2".into()),
            speed: Some(4.0),
            ..Default::default()
        };
        let sum = a.add(&[&b]);
        assert_eq!(sum.name.as_deref(), Some("Laps"));
        assert_eq!(sum.speed, Some(3.0));
    }

    #[test]
    fn test_from_parts() {
        let swim = Activity {
            uids: vec![uid("polar:1")],
            time: Some(at(7)),
            time_end: Some(at(8)),
            timezone: Some("Europe/Berlin".into()),
            distance: Some(1500.0),
            duration: Some(TimeDelta::hours(1)),
            heartrate_max: Some(150),
            ..Default::default()
        };
        let bike = Activity {
            uids: vec![uid("polar:2")],
            time: Some(at(9)),
            time_end: Some(at(11)),
            timezone: Some("Europe/London".into()),
            distance: Some(40000.0),
            duration: Some(TimeDelta::hours(2)),
            elevation_min: Some(12.0),
            heartrate_max: Some(170),
            calories: Some(900),
            ..Default::default()
        };

        let tri = Activity::from_parts(&[&swim, &bike]);
        assert_eq!(tri.time, Some(at(7)));
        assert_eq!(tri.time_end, Some(at(11)));
        assert_eq!(tri.timezone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(tri.distance, Some(41500.0));
        assert_eq!(tri.duration, Some(TimeDelta::hours(3)));
        assert_eq!(tri.elevation_min, Some(12.0));
        assert_eq!(tri.heartrate_max, Some(170));
        assert_eq!(tri.calories, Some(900));
        assert_eq!(tri.ascent, None);
        assert_eq!(tri.parts.len(), 2);
        assert_eq!(tri.parts[0].gap, TimeDelta::zero());
        assert_eq!(tri.parts[1].gap, TimeDelta::hours(1));
        assert!(tri.multipart());
    }

    #[test]
    fn test_from_parts_empty() {
        assert_eq!(Activity::from_parts(&[]), Activity::default());
    }

    #[test]
    fn test_multipart_and_classifiers() {
        let single = Activity::with_uids([uid("polar:1"), uid("strava:9"), uid("polar:1?1.gpx")]);
        assert!(!single.multipart());
        assert_eq!(single.classifiers(), vec!["polar".to_string(), "strava".to_string()]);

        let two = Activity::with_uids([uid("polar:1"), uid("polar:2")]);
        assert!(two.multipart());

        let numbered = Activity::with_uids([uid("polar:1#1"), uid("polar:1#2")]);
        assert!(numbered.multipart());
    }

    #[test]
    fn test_part_grouping_ignores_file_suffix() {
        let parts = ActivityPart::group(&[
            uid("polar:1?1.gpx"),
            uid("polar:2"),
            uid("polar:1"),
            uid("polar:1?1.tcx"),
        ]);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].uids.len(), 3);
        assert_eq!(parts[1].uids, vec![uid("polar:2")]);
    }

    #[test]
    fn test_tags_sorted_unique() {
        let mut a = Activity::default();
        a.tag("zwift");
        a.tag("commute");
        a.tag("zwift");
        assert_eq!(a.tags, vec!["commute".to_string(), "zwift".to_string()]);
        a.untag("zwift");
        assert_eq!(a.tags, vec!["commute".to_string()]);
    }

    #[test]
    fn test_activity_type_keys() {
        assert_eq!(ActivityType::from_key("bike_road"), ActivityType::BikeRoad);
        assert_eq!(ActivityType::from_key("no_such_sport"), ActivityType::Unknown);
        assert_eq!(ActivityType::XcskiClassic.key(), "xcski_classic");
        assert_eq!(ActivityType::Gym.display_name(), "Strength Training");
    }

    #[test]
    fn test_serialization_skips_absent_fields() {
        let a = Activity {
            id: Some(4),
            uids: vec![uid("polar:1")],
            duration: Some(TimeDelta::minutes(90)),
            activity_type: Some(ActivityType::Run),
            ..Default::default()
        };
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "uids": ["polar:1"], "type": "run", "duration": "01:30:00" })
        );
        let back: Activity = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, None);
        assert_eq!(back.duration, Some(TimeDelta::minutes(90)));
    }
}
