// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use workout_store::models::{Activity, Resource, Uid};
use workout_store::{ActivityDb, AppContext};

/// Parse a uid literal.
#[allow(dead_code)]
pub fn uid(s: &str) -> Uid {
    s.parse().expect("test uid should parse")
}

/// UTC timestamp on a fixed test day.
#[allow(dead_code)]
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 17, hour, minute, 0).unwrap()
}

/// An activity with the given uids and a start time.
#[allow(dead_code)]
pub fn activity(uids: &[&str], name: &str, hour: u32) -> Activity {
    Activity {
        name: Some(name.to_string()),
        time: Some(at(hour, 0)),
        ..Activity::with_uids(uids.iter().map(|u| uid(u)))
    }
}

/// A small mixed db: two polar, one strava, one shared, with resources.
#[allow(dead_code)]
pub fn populate(db: &mut ActivityDb) {
    db.insert_activity(activity(&["polar:1001"], "Morning Run", 7));
    db.insert_activity(activity(&["polar:1002"], "Evening Run", 18));
    db.insert_activity(activity(&["strava:2001"], "Commute", 9));
    db.insert_activity(activity(&["polar:1003", "strava:2002"], "Long Ride", 11));

    db.insert_resource(Resource::new(uid("polar:1001"), "1001.json", "application/vnd.polar+json"));
    db.insert_resource(Resource::new(uid("polar:1001"), "1001.gpx", "application/gpx+xml"));
    db.insert_resource(Resource::new(
        uid("strava:2001"),
        "2001.json",
        "application/vnd.strava+json",
    ));
}

/// Temporary workspace with `db/` and `backup/` directories.
#[allow(dead_code)]
pub struct Workspace {
    pub dir: TempDir,
}

#[allow(dead_code)]
impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("db")
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.path().join("backup")
    }

    pub fn open(&self) -> ActivityDb {
        ActivityDb::open(Some(self.db_path().as_path()), false).expect("Failed to open db")
    }

    /// Context over a fresh read-write db, capturing console output and
    /// answering every confirmation with `answer`.
    pub fn context(&self, force: bool, answer: bool) -> (AppContext, Console) {
        let console = Console::default();
        let ctx = AppContext::new(self.open(), self.db_path(), self.backup_path(), force)
            .with_console(console.clone())
            .with_confirm(move |_| answer);
        (ctx, console)
    }
}

/// Shared in-memory console sink.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct Console(Rc<RefCell<Vec<u8>>>);

#[allow(dead_code)]
impl Console {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Names of all entries in a directory, sorted.
#[allow(dead_code)]
pub fn list_dir(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(path)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().into_string().ok())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
