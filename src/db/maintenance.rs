// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Db-level commands: backup, restore, status and maintenance routines.
//!
//! Backups live in `<backup_path>/<YYYYMMDD_HHMMSS>/` (UTC) and hold copies of
//! the db files only. The newest backup is the lexicographically last name.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;

use crate::context::AppContext;
use crate::db::layered::{DiskLayer, Layer, StoreMode};
use crate::db::DB_FILES;
use crate::error::{DbError, Result};
use crate::models::uid::normalize_uids;

/// Timestamp format of backup directory names.
pub const BACKUP_FORMAT: &str = "%Y%m%d_%H%M%S";

fn backup_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{8}_\d{6}$").expect("backup pattern is valid"))
}

/// Available maintenance routines and what they do.
pub const MAINTENANCE_ROUTINES: [(&str, &str); 3] = [
    ("remove_orphans", "delete resources no activity refers to"),
    ("reset_index", "rewrite index.json as an empty object"),
    ("sort_uids", "re-sort and deduplicate the uids of every activity"),
];

/// Copy the db files present in `source` into the existing directory `target`.
fn copy_db_files(source: &Path, target: &Path) -> Result<usize> {
    let from = DiskLayer::new(source);
    let mut to = DiskLayer::new(target);
    let mut copied = 0;
    for name in DB_FILES {
        if let Some(data) = from.read(name)? {
            to.write(name, &data)?;
            copied += 1;
        }
    }
    Ok(copied)
}

// ─── Backup / Restore ────────────────────────────────────────────

/// Copy the durable db files into a new timestamped backup directory.
pub fn backup_db(ctx: &mut AppContext) -> Result<PathBuf> {
    let target = ctx
        .backup_path
        .join(Utc::now().format(BACKUP_FORMAT).to_string());

    if !ctx.db_path.is_dir() {
        return Err(DbError::database(format!(
            "Db directory {} does not exist",
            ctx.db_path.display()
        )));
    }

    // a backup directory is never reused
    fs::create_dir_all(&ctx.backup_path)?;
    if let Err(e) = fs::create_dir(&target) {
        return Err(match e.kind() {
            io::ErrorKind::AlreadyExists => DbError::BackupExists(target),
            _ => e.into(),
        });
    }

    let copied = copy_db_files(&ctx.db_path, &target)?;
    tracing::info!(target = %target.display(), files = copied, "Created db backup");
    ctx.print(format!("created database backup in {}", target.display()));
    Ok(target)
}

/// Newest backup directory below `backup_path`, if any.
pub fn latest_backup(backup_path: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(backup_path).ok()?;
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| backup_pattern().is_match(name))
        .max()
        .map(|name| backup_path.join(name))
}

/// Overwrite the db files with the newest backup and reload the db.
///
/// Asks for confirmation unless `ctx.force` is set. Missing backups and copy
/// failures are reported on the console and in the log, never returned as
/// errors. Returns the backup that was restored.
pub fn restore_db(ctx: &mut AppContext) -> Option<PathBuf> {
    let Some(source) = latest_backup(&ctx.backup_path) else {
        tracing::warn!(path = %ctx.backup_path.display(), "No backups found");
        ctx.print(format!("no backups found in {}", ctx.backup_path.display()));
        return None;
    };

    let question = format!(
        "Restore database from {}? The current state will be overwritten.",
        source.display()
    );
    if !ctx.force && !ctx.confirm(&question) {
        tracing::info!(source = %source.display(), "Restore declined");
        return None;
    }

    let restored = fs::create_dir_all(&ctx.db_path)
        .map_err(DbError::from)
        .and_then(|()| copy_db_files(&source, &ctx.db_path));
    if let Err(e) = restored {
        tracing::error!(source = %source.display(), error = %e, "Failed to restore backup");
        ctx.print(format!("failed to restore backup from {}: {}", source.display(), e));
        return None;
    }
    tracing::info!(source = %source.display(), "Db restored");

    if let Err(e) = ctx.db.reopen() {
        tracing::error!(error = %e, "Failed to reload db after restore");
        ctx.print(format!("restored files, but reloading the db failed: {}", e));
    }
    Some(source)
}

// ─── Status ──────────────────────────────────────────────────────

/// Print activity totals, per-classifier counts and the resource total.
pub fn status_db(ctx: &mut AppContext) {
    let mut per_classifier: BTreeMap<String, usize> = BTreeMap::new();
    for activity in ctx.db.activities() {
        for classifier in activity.classifiers() {
            *per_classifier.entry(classifier).or_default() += 1;
        }
    }

    let mut rows = vec![("activities".to_string(), ctx.db.activity_ids().len())];
    rows.extend(
        per_classifier
            .into_iter()
            .map(|(classifier, count)| (format!("activities ({})", classifier), count)),
    );
    rows.push(("resources".to_string(), ctx.db.resource_ids().len()));

    for (label, count) in rows {
        ctx.print(format!("{:<28}{:>8}", label, count));
    }
}

// ─── Maintenance ─────────────────────────────────────────────────

/// List the maintenance routines, or back up and run the named one.
///
/// A run is followed by commit and save, so it needs a durable db.
pub fn maintain_db(ctx: &mut AppContext, maintenance: Option<&str>) -> Result<()> {
    let Some(name) = maintenance else {
        for (name, description) in MAINTENANCE_ROUTINES {
            ctx.print(format!("{:<16}{}", name, description));
        }
        return Ok(());
    };

    if !MAINTENANCE_ROUTINES.iter().any(|(n, _)| *n == name) {
        return Err(DbError::UnknownMaintenance(name.to_string()));
    }

    let mode = ctx.db.mode();
    if mode != StoreMode::Durable {
        tracing::warn!(routine = name, ?mode, "Refusing maintenance on a non-durable db");
        return Err(DbError::NotDurable(format!("{:?}", mode).to_lowercase()));
    }

    backup_db(ctx)?;

    let changed = match name {
        "sort_uids" => sort_uids(ctx),
        "remove_orphans" => remove_orphans(ctx)?,
        "reset_index" => {
            ctx.db.reset_index()?;
            1
        }
        other => return Err(DbError::UnknownMaintenance(other.to_string())),
    };

    ctx.db.commit(true)?;
    ctx.db.save()?;

    tracing::info!(routine = name, changed, "Maintenance finished");
    ctx.print(format!("{}: {} record(s) changed", name, changed));
    Ok(())
}

fn sort_uids(ctx: &mut AppContext) -> usize {
    let mut changed = 0;
    for activity in ctx.db.activities_mut() {
        let before = activity.uids.clone();
        normalize_uids(&mut activity.uids);
        if activity.uids != before {
            changed += 1;
        }
    }
    changed
}

fn remove_orphans(ctx: &mut AppContext) -> Result<usize> {
    let orphans: Vec<u64> = ctx
        .db
        .orphaned_resources()
        .iter()
        .filter_map(|r| r.id)
        .collect();
    for id in &orphans {
        tracing::debug!(id, "Removing orphaned resource");
    }
    Ok(ctx.db.remove_resources(&orphans, false)?.len())
}
