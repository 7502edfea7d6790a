// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Files belonging to an activity (raw downloads, tracks, summaries).

use serde::{Deserialize, Serialize};

use super::uid::Uid;

/// Download status of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceStatus {
    #[default]
    Unknown,
    Exists,
    NoContent,
    NotFound,
}

impl ResourceStatus {
    /// HTTP-like status code.
    pub fn code(&self) -> u16 {
        match self {
            ResourceStatus::Unknown => 100,
            ResourceStatus::Exists => 200,
            ResourceStatus::NoContent => 204,
            ResourceStatus::NotFound => 404,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            200 => ResourceStatus::Exists,
            204 => ResourceStatus::NoContent,
            404 => ResourceStatus::NotFound,
            _ => ResourceStatus::Unknown,
        }
    }
}

/// One artifact of an activity. `(uid, path)` is unique within a db.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    #[serde(skip)]
    pub id: Option<u64>,
    /// Uid of the owning activity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uid>,
    /// File name distinguishing this resource among its siblings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// MIME-like type, resolved through the resource type registry
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Where the resource was fetched from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(skip)]
    pub status: ResourceStatus,
    /// File content, loaded on demand and never stored in the db
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
}

impl Resource {
    pub fn new(uid: Uid, path: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            uid: Some(uid),
            path: Some(path.into()),
            resource_type: Some(resource_type.into()),
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self.status = ResourceStatus::Exists;
        self
    }

    pub fn classifier(&self) -> Option<&str> {
        self.uid.as_ref().map(|u| u.classifier())
    }

    pub fn local_id(&self) -> Option<&str> {
        self.uid.as_ref().and_then(|u| u.local_id())
    }

    /// Whether this resource is identified by exactly this uid and path.
    pub fn is_at(&self, uid: &Uid, path: &str) -> bool {
        self.uid.as_ref() == Some(uid) && self.path.as_deref() == Some(path)
    }

    /// Owning uid extended by this resource's path (`polar:1?1.gpx`).
    pub fn uid_path(&self) -> Option<Uid> {
        let uid = self.uid.clone()?;
        Some(match &self.path {
            Some(path) => uid.with_path(path.clone()),
            None => uid,
        })
    }

    /// Content decoded as UTF-8, if loaded and valid.
    pub fn as_text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .and_then(|c| std::str::from_utf8(c).ok())
    }
}
