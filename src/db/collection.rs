// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Id-keyed record collections.
//!
//! Records are persisted as a JSON object keyed by the decimal id; the id
//! itself is not part of the record body and is restored from the key on load.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DbError, Result};
use crate::models::{Activity, Resource};

/// A record stored in a [`Collection`].
pub trait Record: Clone + Serialize + DeserializeOwned {
    fn id(&self) -> Option<u64>;
    fn set_id(&mut self, id: Option<u64>);
}

impl Record for Activity {
    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: Option<u64>) {
        self.id = id;
    }
}

impl Record for Resource {
    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: Option<u64>) {
        self.id = id;
    }
}

/// Smallest positive integer not present in `ids`.
pub fn next_id<'a>(ids: impl IntoIterator<Item = &'a u64>) -> u64 {
    let mut candidate = 1;
    // ids arrive sorted from a BTreeMap; sort anyway for arbitrary inputs
    let mut ids: Vec<u64> = ids.into_iter().copied().collect();
    ids.sort_unstable();
    for id in ids {
        if id == candidate {
            candidate += 1;
        } else if id > candidate {
            break;
        }
    }
    candidate
}

/// Records of one kind, ordered by id.
#[derive(Debug, Clone)]
pub struct Collection<T: Record> {
    records: BTreeMap<u64, T>,
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> u64 {
        next_id(self.records.keys())
    }

    /// Store a record under a freshly allocated id and return the id.
    pub fn insert(&mut self, mut record: T) -> u64 {
        let id = self.next_id();
        record.set_id(Some(id));
        self.records.insert(id, record);
        id
    }

    /// Store a record under an existing id, replacing whatever was there.
    pub fn replace(&mut self, id: u64, mut record: T) -> Option<T> {
        record.set_id(Some(id));
        self.records.insert(id, record)
    }

    pub fn remove(&mut self, id: u64) -> Option<T> {
        self.records.remove(&id)
    }

    pub fn get(&self, id: u64) -> Option<&T> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut T> {
        self.records.get_mut(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.records.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.records.values_mut()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.records.keys().copied().collect()
    }

    pub fn as_map(&self) -> &BTreeMap<u64, T> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize as `{"<id>": record, ...}`.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        let mut map = serde_json::Map::new();
        for (id, record) in &self.records {
            map.insert(id.to_string(), serde_json::to_value(record)?);
        }
        Ok(serde_json::Value::Object(map))
    }

    /// Parse `{"<id>": record, ...}`, restoring ids from the keys.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let raw: BTreeMap<String, T> = serde_json::from_slice(data)?;
        let mut records = BTreeMap::new();
        for (key, mut record) in raw {
            let id = key
                .parse::<u64>()
                .map_err(|_| DbError::database(format!("Invalid record id: {}", key)))?;
            record.set_id(Some(id));
            records.insert(id, record);
        }
        Ok(Self { records })
    }
}
