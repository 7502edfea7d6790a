// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity database with typed operations.
//!
//! Provides high-level operations for:
//! - Activities (insert, upsert by shared uid, removal)
//! - Resources (insert, upsert by `(uid, path)`, removal)
//! - Queries (lookups by id/uid, classifier and rule based finds)
//! - Persistence (commit to the overlay, save to durable storage)

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde_json::{Map, Value};

use crate::db::collection::Collection;
use crate::db::layered::{LayeredStore, StoreMode};
use crate::db::{
    to_json_bytes, ACTIVITIES_NAME, INDEX_NAME, METADATA_NAME, RESOURCES_NAME, SCHEMA_NAME,
};
use crate::error::{DbError, Result};
use crate::models::{Activity, Resource, Uid};
use crate::registry::{ResourceTypeLookup, ResourceTypes};
use crate::rules::{KeywordRules, RuleParser};

/// Activity database.
///
/// Mutations stay in memory until [`ActivityDb::commit`] writes them to the
/// overlay, and reach durable storage only on [`ActivityDb::save`].
pub struct ActivityDb {
    store: LayeredStore,
    activities: Collection<Activity>,
    resources: Collection<Resource>,
    metadata: Map<String, Value>,
    schema: Map<String, Value>,
    resource_types: Box<dyn ResourceTypeLookup>,
    rules: Box<dyn RuleParser>,
}

impl ActivityDb {
    /// Open the db at `path`, or an ephemeral in-memory db when `path` is `None`.
    ///
    /// A read-only db takes a snapshot of `path` and never writes to disk; it
    /// fails with [`DbError::ReadOnlyPathMissing`] when `path` does not exist.
    pub fn open(path: Option<&Path>, read_only: bool) -> Result<Self> {
        let store = LayeredStore::open(path, read_only)?;
        let mut db = Self {
            store,
            activities: Collection::new(),
            resources: Collection::new(),
            metadata: Map::new(),
            schema: Map::new(),
            resource_types: Box::new(ResourceTypes::standard()),
            rules: Box::new(KeywordRules::default()),
        };
        db.load()?;

        tracing::info!(
            mode = ?db.store.mode(),
            path = ?db.store.path(),
            activities = db.activities.len(),
            resources = db.resources.len(),
            "Opened activity db"
        );

        Ok(db)
    }

    /// Create an ephemeral db (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(None, false)
    }

    /// Replace the resource type registry used to classify summaries and recordings.
    pub fn with_resource_types(
        mut self,
        resource_types: impl ResourceTypeLookup + 'static,
    ) -> Self {
        self.resource_types = Box::new(resource_types);
        self
    }

    /// Replace the parser used by [`ActivityDb::find`].
    pub fn with_rules(mut self, rules: impl RuleParser + 'static) -> Self {
        self.rules = Box::new(rules);
        self
    }

    /// (Re)load all collections from the store, discarding uncommitted changes.
    pub fn load(&mut self) -> Result<()> {
        self.activities = Collection::from_slice(&self.store.read(ACTIVITIES_NAME)?)?;
        self.resources = Collection::from_slice(&self.store.read(RESOURCES_NAME)?)?;
        self.metadata = serde_json::from_slice(&self.store.read(METADATA_NAME)?)?;
        self.schema = serde_json::from_slice(&self.store.read(SCHEMA_NAME)?)?;
        tracing::debug!(
            activities = self.activities.len(),
            resources = self.resources.len(),
            "Loaded db"
        );
        Ok(())
    }

    /// Reopen the store from durable storage and reload, e.g. after files were
    /// replaced on disk. Ephemeral dbs are left as they are.
    pub fn reopen(&mut self) -> Result<()> {
        let Some(path) = self.store.path().map(Path::to_path_buf) else {
            return Ok(());
        };
        let read_only = self.store.mode() == StoreMode::ReadOnly;
        self.store = LayeredStore::open(Some(path.as_path()), read_only)?;
        self.load()
    }

    // ─── Persistence ─────────────────────────────────────────────

    /// Write activities and resources to the overlay. Does nothing unless `do_commit`.
    pub fn commit(&mut self, do_commit: bool) -> Result<()> {
        if !do_commit {
            return Ok(());
        }
        self.commit_activities()?;
        self.commit_resources()
    }

    pub fn commit_activities(&mut self) -> Result<()> {
        let data = to_json_bytes(&self.activities.to_value()?)?;
        self.store.write(ACTIVITIES_NAME, &data)?;
        tracing::debug!(count = self.activities.len(), "Committed activities");
        Ok(())
    }

    pub fn commit_resources(&mut self) -> Result<()> {
        let data = to_json_bytes(&self.resources.to_value()?)?;
        self.store.write(RESOURCES_NAME, &data)?;
        tracing::debug!(count = self.resources.len(), "Committed resources");
        Ok(())
    }

    /// Promote newer overlay files to durable storage.
    ///
    /// Does not commit: uncommitted in-memory changes are not saved.
    pub fn save(&mut self) -> Result<()> {
        let promoted = self.store.promote()?;
        if !promoted.is_empty() {
            tracing::info!(files = ?promoted, path = ?self.store.path(), "Saved db");
        }
        Ok(())
    }

    /// Same as [`ActivityDb::save`].
    pub fn close(mut self) -> Result<()> {
        self.save()
    }

    /// Set a metadata entry and write `metadata.json` to the overlay.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.metadata.insert(key.into(), value.into());
        let data = to_json_bytes(&self.metadata)?;
        self.store.write(METADATA_NAME, &data)
    }

    /// Rewrite `index.json` as an empty object.
    pub fn reset_index(&mut self) -> Result<()> {
        let data = to_json_bytes(&Map::new())?;
        self.store.write(INDEX_NAME, &data)
    }

    pub fn store(&self) -> &LayeredStore {
        &self.store
    }

    pub fn mode(&self) -> StoreMode {
        self.store.mode()
    }

    pub fn path(&self) -> Option<&Path> {
        self.store.path()
    }

    pub fn schema(&self) -> &Map<String, Value> {
        &self.schema
    }

    pub fn schema_version(&self) -> Option<u64> {
        self.schema.get("version").and_then(Value::as_u64)
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Store an activity under a new id. Does not deduplicate.
    pub fn insert_activity(&mut self, activity: Activity) -> u64 {
        let id = self.activities.insert(activity);
        tracing::debug!(id, "Inserted activity");
        id
    }

    pub fn insert_activities(&mut self, activities: Vec<Activity>) -> Vec<u64> {
        activities
            .into_iter()
            .map(|a| self.insert_activity(a))
            .collect()
    }

    /// Merge into the activity sharing a uid with `activity`, or insert it.
    ///
    /// The existing record's present values win. Fails with
    /// [`DbError::MergeConflict`] when the uids match several activities.
    pub fn upsert_activity(&mut self, activity: Activity) -> Result<u64> {
        let matches: Vec<u64> = self
            .activities
            .iter()
            .filter(|a| a.shares_uid(&activity.uids))
            .filter_map(|a| a.id)
            .collect();

        match matches.as_slice() {
            [] => Ok(self.insert_activity(activity)),
            [id] => {
                let id = *id;
                let existing = self.activities.get_mut(id).ok_or_else(|| {
                    DbError::database(format!("Activity {} vanished during upsert", id))
                })?;
                existing.union_in_place(&[&activity], false);
                tracing::debug!(id, "Merged activity");
                Ok(id)
            }
            ids => {
                let uids: Vec<String> = activity.uids.iter().map(|u| u.to_string()).collect();
                tracing::warn!(uids = ?uids, ids = ?ids, "Upsert matches several activities");
                Err(DbError::MergeConflict {
                    uids,
                    ids: ids.to_vec(),
                })
            }
        }
    }

    /// Remove an activity. Its resources are kept.
    pub fn remove_activity(&mut self, id: u64) -> Option<Activity> {
        self.activities.remove(id)
    }

    pub fn remove_activities(&mut self, ids: &[u64], auto_commit: bool) -> Result<Vec<Activity>> {
        let removed = ids
            .iter()
            .filter_map(|id| self.remove_activity(*id))
            .collect();
        self.commit(auto_commit)?;
        Ok(removed)
    }

    /// All activities, ordered by id.
    pub fn activities(&self) -> Vec<&Activity> {
        self.activities.iter().collect()
    }

    /// Mutable access to all activities, for maintenance passes.
    pub fn activities_mut(&mut self) -> impl Iterator<Item = &mut Activity> {
        self.activities.iter_mut()
    }

    pub fn activity_map(&self) -> &BTreeMap<u64, Activity> {
        self.activities.as_map()
    }

    pub fn activity_ids(&self) -> Vec<u64> {
        self.activities.ids()
    }

    /// Map of every activity uid to the id of the activity carrying it.
    pub fn activity_uid_index(&self) -> BTreeMap<Uid, u64> {
        let mut index = BTreeMap::new();
        for activity in self.activities.iter() {
            if let Some(id) = activity.id {
                for uid in &activity.uids {
                    index.insert(uid.clone(), id);
                }
            }
        }
        index
    }

    pub fn contains_activity(&self, uid: &Uid) -> bool {
        self.activities.iter().any(|a| a.uids.contains(uid))
    }

    pub fn get_by_id(&self, id: u64) -> Option<&Activity> {
        self.activities.get(id)
    }

    /// First activity carrying `uid`.
    pub fn get_by_uid(&self, uid: &Uid) -> Option<&Activity> {
        self.activities.iter().find(|a| a.uids.contains(uid))
    }

    /// First activity carrying any of `uids`.
    pub fn get_activity_by_uids(&self, uids: &[Uid]) -> Option<&Activity> {
        self.activities.iter().find(|a| a.shares_uid(uids))
    }

    /// Activities matching all `filters`, ordered by id.
    pub fn find(&self, filters: &[&str]) -> Result<Vec<&Activity>> {
        let mut found = self.activities();
        for rule in self.rules.parse(filters)? {
            found = rule.filter(found);
        }
        Ok(found)
    }

    /// Activities with at least one uid of the given classifier.
    pub fn find_by_classifier(&self, classifier: &str) -> Vec<&Activity> {
        self.activities
            .iter()
            .filter(|a| a.has_classifier(classifier))
            .collect()
    }

    fn timed(&self, classifier: Option<&str>) -> impl Iterator<Item = &Activity> {
        let candidates = match classifier {
            Some(classifier) => self.find_by_classifier(classifier),
            None => self.activities(),
        };
        candidates.into_iter().filter(|a| a.time.is_some())
    }

    /// Oldest activity with a start time, optionally restricted to a classifier.
    pub fn find_first(&self, classifier: Option<&str>) -> Option<&Activity> {
        self.timed(classifier).min_by_key(|a| a.time)
    }

    /// Newest activity with a start time, optionally restricted to a classifier.
    pub fn find_last(&self, classifier: Option<&str>) -> Option<&Activity> {
        self.timed(classifier).max_by_key(|a| a.time)
    }

    // ─── Resource Operations ─────────────────────────────────────

    pub fn insert_resource(&mut self, resource: Resource) -> u64 {
        let id = self.resources.insert(resource);
        tracing::debug!(id, "Inserted resource");
        id
    }

    pub fn insert_resources(&mut self, resources: Vec<Resource>) -> Vec<u64> {
        resources
            .into_iter()
            .map(|r| self.insert_resource(r))
            .collect()
    }

    /// Replace the resource at the same `(uid, path)` outright, or insert it.
    pub fn upsert_resource(&mut self, resource: Resource) -> u64 {
        let existing = match (&resource.uid, &resource.path) {
            (Some(uid), Some(path)) => self.get_resource_by_uid_path(uid, path).and_then(|r| r.id),
            _ => None,
        };

        match existing {
            Some(id) => {
                self.resources.replace(id, resource);
                tracing::debug!(id, "Replaced resource");
                id
            }
            None => self.insert_resource(resource),
        }
    }

    pub fn remove_resource(&mut self, id: u64) -> Option<Resource> {
        self.resources.remove(id)
    }

    pub fn remove_resources(&mut self, ids: &[u64], auto_commit: bool) -> Result<Vec<Resource>> {
        let removed = ids
            .iter()
            .filter_map(|id| self.remove_resource(*id))
            .collect();
        self.commit(auto_commit)?;
        Ok(removed)
    }

    /// All resources, ordered by id.
    pub fn resources(&self) -> Vec<&Resource> {
        self.resources.iter().collect()
    }

    pub fn resource_map(&self) -> &BTreeMap<u64, Resource> {
        self.resources.as_map()
    }

    pub fn resource_ids(&self) -> Vec<u64> {
        self.resources.ids()
    }

    /// Map of every resource uid to the ids of the resources carrying it.
    pub fn resource_uid_index(&self) -> BTreeMap<Uid, Vec<u64>> {
        let mut index: BTreeMap<Uid, Vec<u64>> = BTreeMap::new();
        for resource in self.resources.iter() {
            if let (Some(uid), Some(id)) = (&resource.uid, resource.id) {
                index.entry(uid.clone()).or_default().push(id);
            }
        }
        index
    }

    /// Distinct resource uids, optionally restricted to one classifier.
    pub fn resource_uids(&self, classifier: Option<&str>) -> Vec<Uid> {
        self.resources
            .iter()
            .filter_map(|r| r.uid.as_ref())
            .filter(|u| classifier.is_none_or(|c| u.classifier() == c))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Resources whose uid no activity carries.
    pub fn orphaned_resources(&self) -> Vec<&Resource> {
        let owners: BTreeSet<Uid> = self
            .activities
            .iter()
            .flat_map(|a| a.uids.iter().flat_map(|u| [u.clone(), u.head()]))
            .collect();
        self.resources
            .iter()
            .filter(|r| r.uid.as_ref().is_none_or(|u| !owners.contains(u)))
            .collect()
    }

    pub fn contains_resource(&self, uid: &Uid, path: &str) -> bool {
        self.resources.iter().any(|r| r.is_at(uid, path))
    }

    pub fn get_resource(&self, id: u64) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn get_resources_by_uid(&self, uid: &Uid) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| r.uid.as_ref() == Some(uid))
            .collect()
    }

    /// Resources of each uid in turn, in the order of `uids`.
    pub fn get_resources_by_uids(&self, uids: &[Uid]) -> Vec<&Resource> {
        uids.iter()
            .flat_map(|uid| self.get_resources_by_uid(uid))
            .collect()
    }

    pub fn get_resource_by_uid_path(&self, uid: &Uid, path: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.is_at(uid, path))
    }

    /// First resource of the given type among the resources of `uids`.
    pub fn get_resource_of_type(&self, uids: &[Uid], resource_type: &str) -> Option<&Resource> {
        self.find_all_resources(uids)
            .into_iter()
            .find(|r| r.resource_type.as_deref() == Some(resource_type))
    }

    /// First summary resource of `uid`.
    pub fn get_summary(&self, uid: &Uid) -> Option<&Resource> {
        self.find_summaries(uid).into_iter().next()
    }

    /// All summary resources in the db.
    pub fn summaries(&self) -> Vec<&Resource> {
        self.resources.iter().filter(|r| self.is_summary(r)).collect()
    }

    /// Resources of `uid`, optionally only the one at `path`.
    pub fn find_resources(&self, uid: &Uid, path: Option<&str>) -> Vec<&Resource> {
        self.get_resources_by_uid(uid)
            .into_iter()
            .filter(|r| path.is_none_or(|p| r.path.as_deref() == Some(p)))
            .collect()
    }

    /// Resources of the given type, from `resources` or from the whole db.
    pub fn find_resources_of_type<'a>(
        &'a self,
        resource_type: &str,
        resources: Option<Vec<&'a Resource>>,
    ) -> Vec<&'a Resource> {
        resources
            .unwrap_or_else(|| self.resources())
            .into_iter()
            .filter(|r| r.resource_type.as_deref() == Some(resource_type))
            .collect()
    }

    /// Resources belonging to `activity`.
    ///
    /// A plain activity uid (`polar:1`) selects all resources of that uid, a uid
    /// with a path (`polar:1?1.gpx`) only the resource at that path.
    pub fn find_resources_for(&self, activity: &Activity) -> Vec<&Resource> {
        let heads: BTreeSet<Uid> = activity.uids.iter().map(Uid::head).collect();
        self.resources
            .iter()
            .filter(|r| r.uid.as_ref().is_some_and(|u| heads.contains(u)))
            .filter(|r| {
                r.uid.as_ref().is_some_and(|u| activity.uids.contains(u))
                    || r.uid_path().is_some_and(|u| activity.uids.contains(&u))
            })
            .collect()
    }

    /// Resources whose uid is one of `uids`, ordered by id.
    pub fn find_all_resources(&self, uids: &[Uid]) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| r.uid.as_ref().is_some_and(|u| uids.contains(u)))
            .collect()
    }

    /// Recording resources, from `resources` or from the whole db.
    pub fn find_recordings<'a>(
        &'a self,
        resources: Option<Vec<&'a Resource>>,
    ) -> Vec<&'a Resource> {
        resources
            .unwrap_or_else(|| self.resources())
            .into_iter()
            .filter(|r| self.is_recording(r))
            .collect()
    }

    pub fn find_summaries(&self, uid: &Uid) -> Vec<&Resource> {
        self.find_resources(uid, None)
            .into_iter()
            .filter(|r| self.is_summary(r))
            .collect()
    }

    pub fn find_all_summaries(&self, uids: &[Uid]) -> Vec<&Resource> {
        self.find_all_resources(uids)
            .into_iter()
            .filter(|r| self.is_summary(r))
            .collect()
    }

    /// Resources of any uid of any of `activities`.
    pub fn find_all_resources_for(&self, activities: &[&Activity]) -> Vec<&Resource> {
        let uids: Vec<Uid> = activities
            .iter()
            .flat_map(|a| a.uids.iter().cloned())
            .collect();
        self.find_all_resources(&uids)
    }

    fn is_summary(&self, resource: &Resource) -> bool {
        resource
            .resource_type
            .as_deref()
            .is_some_and(|t| self.resource_types.is_summary(t))
    }

    fn is_recording(&self, resource: &Resource) -> bool {
        resource
            .resource_type
            .as_deref()
            .is_some_and(|t| self.resource_types.is_recording(t))
    }
}

impl std::fmt::Debug for ActivityDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityDb")
            .field("mode", &self.store.mode())
            .field("path", &self.store.path())
            .field("activities", &self.activities.len())
            .field("resources", &self.resources.len())
            .finish()
    }
}
