// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Two-layer copy-on-write file store.
//!
//! The underlay holds durable state, the overlay is an in-memory working
//! copy. Reads see the overlay shadowing the underlay, writes only ever touch
//! the overlay, and [`LayeredStore::promote`] copies overlay files onto the
//! underlay when they are newer. Nothing reaches the underlay until then.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::db::{default_content, DB_FILES};
use crate::error::{DbError, Result};

/// One storage layer of named files with modification times.
pub trait Layer {
    /// File content, or `None` when the file does not exist.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Write a file, stamping it with the current time.
    fn write(&mut self, name: &str, data: &[u8]) -> Result<()>;

    /// Modification time, or `None` when the file does not exist.
    fn modified(&self, name: &str) -> Result<Option<SystemTime>>;

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.modified(name)?.is_some())
    }
}

/// In-memory layer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLayer {
    files: HashMap<String, (Vec<u8>, SystemTime)>,
}

impl MemoryLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file keeping the given modification time (copy with preserved time).
    pub fn insert_with_time(&mut self, name: &str, data: Vec<u8>, modified: SystemTime) {
        self.files.insert(name.to_string(), (data, modified));
    }
}

impl Layer for MemoryLayer {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.get(name).map(|(data, _)| data.clone()))
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.files
            .insert(name.to_string(), (data.to_vec(), SystemTime::now()));
        Ok(())
    }

    fn modified(&self, name: &str) -> Result<Option<SystemTime>> {
        Ok(self.files.get(name).map(|(_, modified)| *modified))
    }
}

/// Layer backed by a directory on local disk.
#[derive(Debug, Clone)]
pub struct DiskLayer {
    root: PathBuf,
}

impl DiskLayer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Layer for DiskLayer {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.root.join(name)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a temp file first, then rename over the target.
    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.root.join(name);
        let temp_path = self.root.join(format!("{}.tmp", name));

        fs::write(&temp_path, data).map_err(|e| {
            DbError::database(format!("Failed to write temp file {:?}: {}", temp_path, e))
        })?;
        fs::rename(&temp_path, &path)
            .map_err(|e| DbError::database(format!("Failed to rename temp file: {}", e)))?;

        Ok(())
    }

    fn modified(&self, name: &str) -> Result<Option<SystemTime>> {
        match fs::metadata(self.root.join(name)) {
            Ok(meta) => Ok(Some(meta.modified()?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// How the store was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Disk underlay, changes can be saved
    Durable,
    /// In-memory snapshot of a disk directory, disk is never written
    ReadOnly,
    /// Both layers in memory
    Ephemeral,
}

/// Underlay + overlay pair holding the db files.
pub struct LayeredStore {
    underlay: Box<dyn Layer>,
    overlay: MemoryLayer,
    mode: StoreMode,
    path: Option<PathBuf>,
}

impl LayeredStore {
    /// Open a store for `path`, or a purely in-memory one when `path` is `None`.
    ///
    /// Missing db files are seeded with their default content.
    pub fn open(path: Option<&Path>, read_only: bool) -> Result<Self> {
        let store = match path {
            Some(path) if read_only => Self::open_read_only(path)?,
            Some(path) => Self::open_durable(path)?,
            None => Self::open_ephemeral()?,
        };
        tracing::debug!(mode = ?store.mode, path = ?store.path, "Opened layered store");
        Ok(store)
    }

    fn open_durable(path: &Path) -> Result<Self> {
        fs::create_dir_all(path).map_err(|e| {
            DbError::database(format!("Failed to create db directory {:?}: {}", path, e))
        })?;

        let mut underlay = DiskLayer::new(path);
        for name in DB_FILES {
            if !underlay.exists(name)? {
                tracing::info!(file = name, path = %path.display(), "Initializing db file");
                underlay.write(name, &default_content(name)?)?;
            }
        }

        let overlay = Self::mirror(&underlay)?;
        Ok(Self {
            underlay: Box::new(underlay),
            overlay,
            mode: StoreMode::Durable,
            path: Some(path.to_path_buf()),
        })
    }

    fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::error!(
                path = %path.display(),
                "Cannot open db in read-only mode: path does not exist"
            );
            return Err(DbError::ReadOnlyPathMissing(path.to_path_buf()));
        }

        let disk = DiskLayer::new(path);
        let mut underlay = MemoryLayer::new();
        for name in DB_FILES {
            match (disk.read(name)?, disk.modified(name)?) {
                (Some(data), Some(modified)) => underlay.insert_with_time(name, data, modified),
                _ => underlay.write(name, &default_content(name)?)?,
            }
        }

        let overlay = Self::mirror(&underlay)?;
        Ok(Self {
            underlay: Box::new(underlay),
            overlay,
            mode: StoreMode::ReadOnly,
            path: Some(path.to_path_buf()),
        })
    }

    fn open_ephemeral() -> Result<Self> {
        let mut underlay = MemoryLayer::new();
        for name in DB_FILES {
            underlay.write(name, &default_content(name)?)?;
        }
        let overlay = Self::mirror(&underlay)?;
        Ok(Self {
            underlay: Box::new(underlay),
            overlay,
            mode: StoreMode::Ephemeral,
            path: None,
        })
    }

    /// Copy all db files of a layer into a fresh overlay, preserving times.
    fn mirror(source: &dyn Layer) -> Result<MemoryLayer> {
        let mut overlay = MemoryLayer::new();
        for name in DB_FILES {
            let data = source
                .read(name)?
                .ok_or_else(|| DbError::MissingFile(name.to_string()))?;
            let modified = source.modified(name)?.unwrap_or_else(SystemTime::now);
            overlay.insert_with_time(name, data, modified);
        }
        Ok(overlay)
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    /// Durable db directory, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn underlay(&self) -> &dyn Layer {
        self.underlay.as_ref()
    }

    pub fn overlay(&self) -> &MemoryLayer {
        &self.overlay
    }

    /// Read through the overlay, falling back to the underlay.
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        if let Some(data) = self.overlay.read(name)? {
            return Ok(data);
        }
        self.underlay
            .read(name)?
            .ok_or_else(|| DbError::MissingFile(name.to_string()))
    }

    /// Write to the overlay.
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.overlay.write(name, data)
    }

    /// Whether the overlay holds a newer version of `name` than the underlay.
    pub fn is_newer(&self, name: &str) -> Result<bool> {
        let Some(overlay_time) = self.overlay.modified(name)? else {
            return Ok(false);
        };
        Ok(match self.underlay.modified(name)? {
            Some(underlay_time) => overlay_time > underlay_time,
            None => true,
        })
    }

    /// Copy newer overlay files onto the underlay. Returns the promoted file names.
    ///
    /// Does nothing unless the store is durable.
    pub fn promote(&mut self) -> Result<Vec<&'static str>> {
        if self.mode != StoreMode::Durable {
            return Ok(Vec::new());
        }

        let mut promoted = Vec::new();
        for name in DB_FILES {
            if !self.is_newer(name)? {
                continue;
            }
            let data = self
                .overlay
                .read(name)?
                .ok_or_else(|| DbError::MissingFile(name.to_string()))?;
            self.underlay.write(name, &data)?;
            tracing::debug!(file = name, bytes = data.len(), "Promoted overlay file");
            promoted.push(name);
        }
        Ok(promoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ACTIVITIES_NAME, SCHEMA_NAME};
    use std::time::Duration;

    #[test]
    fn test_memory_layer_roundtrip() {
        let mut layer = MemoryLayer::new();
        assert!(layer.read("a.json").unwrap().is_none());
        layer.write("a.json", b"{}").unwrap();
        assert_eq!(layer.read("a.json").unwrap().unwrap(), b"{}");
        assert!(layer.exists("a.json").unwrap());
    }

    #[test]
    fn test_ephemeral_store_is_seeded() {
        let store = LayeredStore::open(None, false).unwrap();
        assert_eq!(store.mode(), StoreMode::Ephemeral);
        for name in DB_FILES {
            assert!(store.underlay().exists(name).unwrap());
            assert!(store.overlay().exists(name).unwrap());
        }
        let schema: serde_json::Value =
            serde_json::from_slice(&store.read(SCHEMA_NAME).unwrap()).unwrap();
        assert_eq!(schema["version"], crate::db::SCHEMA_VERSION);
    }

    #[test]
    fn test_writes_only_touch_overlay() {
        let mut store = LayeredStore::open(None, false).unwrap();
        store.write(ACTIVITIES_NAME, b"{\"1\": {}}").unwrap();
        assert_eq!(store.read(ACTIVITIES_NAME).unwrap(), b"{\"1\": {}}");
        assert_ne!(store.underlay().read(ACTIVITIES_NAME).unwrap().unwrap(), b"{\"1\": {}}");
        assert!(store.is_newer(ACTIVITIES_NAME).unwrap());
    }

    #[test]
    fn test_promote_is_noop_when_not_durable() {
        let mut store = LayeredStore::open(None, false).unwrap();
        store.write(ACTIVITIES_NAME, b"{}").unwrap();
        assert!(store.promote().unwrap().is_empty());
    }

    #[test]
    fn test_is_newer_uses_timestamps() {
        let mut store = LayeredStore::open(None, false).unwrap();
        let old = SystemTime::now() - Duration::from_secs(60);
        store.overlay.insert_with_time(ACTIVITIES_NAME, b"{}".to_vec(), old);
        assert!(!store.is_newer(ACTIVITIES_NAME).unwrap());
    }
}
