// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! External identifiers of the form `classifier[:local_id][?path][#part]`.
//!
//! A bare classifier (`polar`) names a service, `polar:1234` names one
//! activity on that service, `polar:1234?1234.gpx` names a file belonging to
//! it and `polar:1234#2` names the second part of a multipart activity.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DbError;

fn uid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<classifier>[A-Za-z0-9_\-]+)(:(?P<local_id>[^?#/]*))?([?/](?P<path>[^#]+))?(#(?P<part>\d+))?$")
            .expect("uid pattern is valid")
    })
}

/// Parsed external identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid {
    classifier: String,
    local_id: Option<String>,
    path: Option<String>,
    part: Option<u32>,
}

impl Uid {
    /// Build a uid naming one activity of a service.
    pub fn new(classifier: impl Into<String>, local_id: impl ToString) -> Self {
        Self {
            classifier: classifier.into(),
            local_id: Some(local_id.to_string()),
            path: None,
            part: None,
        }
    }

    /// Return a copy of this uid pointing at a file below the activity.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Return a copy of this uid pointing at one part of the activity.
    pub fn with_part(mut self, part: u32) -> Self {
        self.part = Some(part);
        self
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    /// Local id as a number, when the service uses numeric ids.
    pub fn numeric_local_id(&self) -> Option<u64> {
        self.local_id.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn part(&self) -> Option<u32> {
        self.part
    }

    /// `classifier:local_id` without path or part suffix.
    pub fn head(&self) -> Uid {
        Uid {
            classifier: self.classifier.clone(),
            local_id: self.local_id.clone(),
            path: None,
            part: None,
        }
    }

    pub fn denotes_service(&self) -> bool {
        self.local_id.is_none() && self.path.is_none() && self.part.is_none()
    }

    pub fn denotes_activity(&self) -> bool {
        self.local_id.is_some() && self.path.is_none() && self.part.is_none()
    }

    pub fn denotes_resource(&self) -> bool {
        self.local_id.is_some() && self.path.is_some()
    }

    pub fn denotes_part(&self) -> bool {
        self.local_id.is_some() && self.part.is_some()
    }

    fn compare_local_ids(a: Option<&str>, b: Option<&str>) -> Ordering {
        match (a, b) {
            // numeric ids first, by value; ties and the rest by text
            (Some(a), Some(b)) => match (a.parse::<u64>(), b.parse::<u64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
                (Ok(_), Err(_)) => Ordering::Less,
                (Err(_), Ok(_)) => Ordering::Greater,
                (Err(_), Err(_)) => a.cmp(b),
            },
            (a, b) => a.cmp(&b),
        }
    }
}

impl Ord for Uid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.classifier
            .cmp(&other.classifier)
            .then_with(|| {
                Self::compare_local_ids(self.local_id.as_deref(), other.local_id.as_deref())
            })
            .then_with(|| self.path.cmp(&other.path))
            .then_with(|| self.part.cmp(&other.part))
    }
}

impl PartialOrd for Uid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.classifier)?;
        if let Some(local_id) = &self.local_id {
            write!(f, ":{}", local_id)?;
        }
        if let Some(path) = &self.path {
            write!(f, "?{}", path)?;
        }
        if let Some(part) = self.part {
            write!(f, "#{}", part)?;
        }
        Ok(())
    }
}

impl FromStr for Uid {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = uid_pattern()
            .captures(s.trim())
            .ok_or_else(|| DbError::InvalidUid(s.to_string()))?;

        let part = captures
            .name("part")
            .map(|m| m.as_str().parse::<u32>())
            .transpose()
            .map_err(|_| DbError::InvalidUid(s.to_string()))?;

        Ok(Self {
            classifier: captures["classifier"].to_string(),
            local_id: captures
                .name("local_id")
                .map(|m| m.as_str())
                .filter(|m| !m.is_empty())
                .map(String::from),
            path: captures.name("path").map(|m| m.as_str().to_string()),
            part,
        })
    }
}

impl TryFrom<String> for Uid {
    type Error = DbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.to_string()
    }
}

/// Sort and deduplicate a list of uids in place.
pub fn normalize_uids(uids: &mut Vec<Uid>) {
    uids.sort();
    uids.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> Uid {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_service() {
        let u = uid("polar");
        assert_eq!(u.classifier(), "polar");
        assert!(u.local_id().is_none());
        assert!(u.denotes_service());
        assert_eq!(u.to_string(), "polar");

        // trailing colon still names the service
        assert!(uid("polar:").denotes_service());
    }

    #[test]
    fn test_parse_activity_resource_part() {
        let u = uid("polar:101");
        assert_eq!(u.numeric_local_id(), Some(101));
        assert!(u.denotes_activity());

        let u = uid("polar:101?recording.gpx");
        assert_eq!(u.path(), Some("recording.gpx"));
        assert!(u.denotes_resource());
        assert_eq!(u.to_string(), "polar:101?recording.gpx");

        let u = uid("polar:101#2");
        assert_eq!(u.part(), Some(2));
        assert!(u.denotes_part());
        assert_eq!(u.head(), uid("polar:101"));
    }

    #[test]
    fn test_slash_path_is_accepted() {
        let u = uid("polar:101/recording.gpx");
        assert_eq!(u.path(), Some("recording.gpx"));
        assert_eq!(u.to_string(), "polar:101?recording.gpx");
    }

    #[test]
    fn test_builder_matches_parse() {
        assert_eq!(Uid::new("polar", 101).to_string(), "polar:101");
        assert_eq!(
            Uid::new("polar", 101).with_path("recording.gpx").with_part(1).to_string(),
            "polar:101?recording.gpx#1"
        );
    }

    #[test]
    fn test_invalid_uids() {
        assert!("".parse::<Uid>().is_err());
        assert!(":101".parse::<Uid>().is_err());
        assert!("polar:101#x".parse::<Uid>().is_err());
    }

    #[test]
    fn test_ordering_is_numeric_within_classifier() {
        assert!(uid("polar:101") < uid("polar:102"));
        assert!(uid("polar:102") < uid("strava:101"));
        assert!(uid("polar:9") < uid("polar:10"));
        assert!(uid("waze:20200101") < uid("waze:20200102"));
    }

    #[test]
    fn test_ordering_agrees_with_equality() {
        assert_ne!(uid("polar:01"), uid("polar:1"));
        assert_ne!(uid("polar:01").cmp(&uid("polar:1")), Ordering::Equal);
        assert!(uid("polar:1") < uid("polar:01"));
    }

    #[test]
    fn test_ordering_mixed_local_ids_is_transitive() {
        // numeric ids sort before non-numeric ones
        assert!(uid("polar:9") < uid("polar:10"));
        assert!(uid("polar:10") < uid("polar:1a"));
        assert!(uid("polar:9") < uid("polar:1a"));
        assert!(uid("polar:1a") < uid("polar:1b"));
    }

    #[test]
    fn test_normalize_mixed_local_ids_removes_duplicates() {
        let mut uids = Vec::new();
        for _ in 0..3 {
            uids.extend([uid("polar:10"), uid("polar:1a"), uid("polar:9")]);
        }
        normalize_uids(&mut uids);
        assert_eq!(uids, vec![uid("polar:9"), uid("polar:10"), uid("polar:1a")]);
    }

    #[test]
    fn test_normalize_uids() {
        let mut uids = vec![uid("strava:1"), uid("polar:10"), uid("polar:9"), uid("strava:1")];
        normalize_uids(&mut uids);
        assert_eq!(uids, vec![uid("polar:9"), uid("polar:10"), uid("strava:1")]);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&uid("polar:101?a.gpx")).unwrap();
        assert_eq!(json, "\"polar:101?a.gpx\"");
        let back: Uid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uid("polar:101?a.gpx"));
        assert!(serde_json::from_str::<Uid>("\":bad\"").is_err());
    }
}
