// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the activity store.

use std::path::PathBuf;

/// Errors raised by the store, its models and its maintenance routines.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot open db in read-only mode, path does not exist: {}", .0.display())]
    ReadOnlyPathMissing(PathBuf),

    #[error("Db file missing from store: {0}")]
    MissingFile(String),

    #[error("Invalid uid: {0}")]
    InvalidUid(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Activity with uids {uids:?} matches several existing activities: {ids:?}")]
    MergeConflict { uids: Vec<String>, ids: Vec<u64> },

    #[error("Unknown maintenance routine: {0}")]
    UnknownMaintenance(String),

    #[error("Backup already exists: {}", .0.display())]
    BackupExists(PathBuf),

    #[error("Db is not durable ({0} mode), changes cannot be saved")]
    NotDurable(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl DbError {
    /// Create a generic database error from a message
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Whether this error was caused by the persisted data itself rather than the environment.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            DbError::Json(_) | DbError::InvalidUid(_) | DbError::MissingFile(_)
        )
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, DbError>;
