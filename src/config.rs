// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is read first if present.

use std::env;
use std::path::{Path, PathBuf};

/// Default db directory.
pub const DEFAULT_DB_PATH: &str = "./db";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the db files
    pub db_path: PathBuf,
    /// Directory holding timestamped backups
    pub backup_path: PathBuf,
    /// Open the db without ever writing to disk
    pub read_only: bool,
    /// Skip confirmation prompts
    pub force: bool,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        let db_path = PathBuf::from(DEFAULT_DB_PATH);
        Self {
            backup_path: default_backup_path(&db_path),
            db_path,
            read_only: false,
            force: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let db_path = env::var("WORKOUT_STORE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH));
        let backup_path = env::var("WORKOUT_STORE_BACKUP_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_backup_path(&db_path));

        Ok(Self {
            db_path,
            backup_path,
            read_only: env_flag("WORKOUT_STORE_READ_ONLY")?,
            force: env_flag("WORKOUT_STORE_FORCE")?,
        })
    }
}

/// `backup` directory next to the db directory.
fn default_backup_path(db_path: &Path) -> PathBuf {
    match db_path.parent() {
        Some(parent) => parent.join("backup"),
        None => PathBuf::from("backup"),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

fn env_flag(name: &'static str) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_flag(&value).ok_or(ConfigError::Invalid(name, value)),
        Err(_) => Ok(false),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("WORKOUT_STORE_DB_PATH", "/tmp/workouts/db");
        env::remove_var("WORKOUT_STORE_BACKUP_PATH");
        env::set_var("WORKOUT_STORE_FORCE", "yes");
        env::remove_var("WORKOUT_STORE_READ_ONLY");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.db_path, PathBuf::from("/tmp/workouts/db"));
        assert_eq!(config.backup_path, PathBuf::from("/tmp/workouts/backup"));
        assert!(config.force);
        assert!(!config.read_only);

        env::remove_var("WORKOUT_STORE_DB_PATH");
        env::remove_var("WORKOUT_STORE_FORCE");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("no"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_default_backup_path() {
        assert_eq!(Config::default().backup_path, PathBuf::from("./backup"));
        assert_eq!(default_backup_path(Path::new("db")), PathBuf::from("backup"));
    }
}
