// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application context threaded through the db maintenance commands.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::config::Config;
use crate::db::ActivityDb;
use crate::error::Result;

type ConfirmFn = Box<dyn Fn(&str) -> bool>;

/// Everything a command needs: the open db, its locations and the console.
pub struct AppContext {
    pub db: ActivityDb,
    pub db_path: PathBuf,
    pub backup_path: PathBuf,
    /// Skip confirmation prompts
    pub force: bool,
    /// Human readable output
    pub console: Box<dyn Write>,
    confirm: ConfirmFn,
}

impl AppContext {
    /// Open the db described by `config`, printing to stdout and prompting on stdin.
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = ActivityDb::open(Some(config.db_path.as_path()), config.read_only)?;
        Ok(Self::new(
            db,
            config.db_path.clone(),
            config.backup_path.clone(),
            config.force,
        ))
    }

    pub fn new(db: ActivityDb, db_path: PathBuf, backup_path: PathBuf, force: bool) -> Self {
        Self {
            db,
            db_path,
            backup_path,
            force,
            console: Box::new(io::stdout()),
            confirm: Box::new(prompt_stdin),
        }
    }

    pub fn with_console(mut self, console: impl Write + 'static) -> Self {
        self.console = Box::new(console);
        self
    }

    /// Replace the confirmation prompt (tests answer without a terminal).
    pub fn with_confirm(mut self, confirm: impl Fn(&str) -> bool + 'static) -> Self {
        self.confirm = Box::new(confirm);
        self
    }

    /// Ask the user a yes/no question.
    pub fn confirm(&self, question: &str) -> bool {
        (self.confirm)(question)
    }

    /// Print a line to the console. Console write failures are ignored.
    pub fn print(&mut self, line: impl AsRef<str>) {
        let _ = writeln!(self.console, "{}", line.as_ref());
    }
}

fn prompt_stdin(question: &str) -> bool {
    print!("{} [y/N] ", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
