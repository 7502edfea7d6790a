// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Resource type registry.
//!
//! Services register the MIME-like types of the files they produce and flag
//! which of them are summaries (aggregate documents) and which are recordings
//! (time series tracks). The db asks the registry rather than hard-coding types.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

fn type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\w+/(?:vnd\.(?P<vendor>\w+)[.+])?(?:(?P<subtype>\w+)\+)?(?P<suffix>\w+)$")
            .expect("resource type pattern is valid")
    })
}

/// Classification of a registered resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceType {
    /// Full type string, e.g. `application/vnd.polar+json`
    pub type_name: String,
    pub vendor: Option<String>,
    pub subtype: Option<String>,
    pub suffix: Option<String>,
    /// Human readable name
    pub name: Option<String>,
    pub summary: bool,
    pub recording: bool,
}

impl ResourceType {
    /// Parse `type/[vnd.vendor.][subtype+]suffix`.
    pub fn parse(type_name: &str) -> Self {
        let mut rt = ResourceType {
            type_name: type_name.to_string(),
            ..Default::default()
        };
        if let Some(captures) = type_pattern().captures(type_name) {
            rt.vendor = captures.name("vendor").map(|m| m.as_str().to_string());
            rt.subtype = captures.name("subtype").map(|m| m.as_str().to_string());
            rt.suffix = captures.name("suffix").map(|m| m.as_str().to_string());
        }
        rt
    }

    pub fn summary(mut self) -> Self {
        self.summary = true;
        self
    }

    pub fn recording(mut self) -> Self {
        self.recording = true;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// File extension for resources of this type.
    pub fn extension(&self) -> Option<String> {
        match (&self.subtype, &self.suffix, &self.vendor) {
            (Some(subtype), Some(_), None) => Some(subtype.clone()),
            (Some(subtype), Some(suffix), Some(_)) => Some(format!("{}.{}", subtype, suffix)),
            (None, suffix, _) => suffix.clone(),
            (Some(_), None, _) => None,
        }
    }
}

/// Lookup seam used by the db to classify resources.
pub trait ResourceTypeLookup {
    fn lookup(&self, type_name: &str) -> Option<&ResourceType>;

    fn is_summary(&self, type_name: &str) -> bool {
        self.lookup(type_name).is_some_and(|rt| rt.summary)
    }

    fn is_recording(&self, type_name: &str) -> bool {
        self.lookup(type_name).is_some_and(|rt| rt.recording)
    }
}

/// In-memory registry of resource types.
#[derive(Debug, Clone, Default)]
pub struct ResourceTypes {
    types: HashMap<String, ResourceType>,
}

impl ResourceTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the common track and summary formats.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(ResourceType::parse("application/gpx+xml").recording().named("GPX"));
        registry.register(ResourceType::parse("application/tcx+xml").recording().named("TCX"));
        registry.register(ResourceType::parse("application/fit").recording().named("FIT"));
        registry.register(
            ResourceType::parse("application/vnd.polar+json")
                .summary()
                .named("Polar Summary"),
        );
        registry.register(
            ResourceType::parse("application/vnd.strava+json")
                .summary()
                .named("Strava Summary"),
        );
        registry.register(
            ResourceType::parse("application/vnd.waze+txt")
                .recording()
                .named("Waze Drive"),
        );
        registry
    }

    /// Add or replace a type.
    pub fn register(&mut self, rt: ResourceType) {
        tracing::debug!(
            type_name = %rt.type_name,
            summary = rt.summary,
            recording = rt.recording,
            "Registered resource type"
        );
        self.types.insert(rt.type_name.clone(), rt);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl ResourceTypeLookup for ResourceTypes {
    fn lookup(&self, type_name: &str) -> Option<&ResourceType> {
        self.types.get(type_name)
    }
}
