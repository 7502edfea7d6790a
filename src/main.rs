// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout-Store CLI
//!
//! Inspects and maintains the activity db: status, backup, restore and
//! maintenance routines.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workout_store::{
    config::Config,
    db::maintenance::{backup_db, maintain_db, restore_db, status_db},
    AppContext, DbError,
};

#[derive(Parser)]
#[command(name = "workout-store")]
#[command(author, version, about = "Activity db maintenance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Db directory
    #[arg(long, global = true, env = "WORKOUT_STORE_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Backup directory
    #[arg(long, global = true, env = "WORKOUT_STORE_BACKUP_PATH")]
    backup_path: Option<PathBuf>,

    /// Never write to disk
    #[arg(long, global = true)]
    read_only: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show activity and resource counts
    Status,
    /// Back up the db files
    Backup,
    /// Restore the db files from the newest backup
    Restore {
        /// Do not ask for confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// List maintenance routines, or run one
    Maintain {
        /// Routine to run
        name: Option<String>,
    },
}

fn main() -> ExitCode {
    init_logging();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(DbError::ReadOnlyPathMissing(path)) = e.downcast_ref::<DbError>() {
                eprintln!(
                    "error: cannot open db at {} in read-only mode, the path does not exist",
                    path.display()
                );
            } else {
                eprintln!("error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(db_path) = cli.db_path {
        config.db_path = db_path;
    }
    if let Some(backup_path) = cli.backup_path {
        config.backup_path = backup_path;
    }
    config.read_only |= cli.read_only;
    if let Commands::Restore { force: true } = cli.command {
        config.force = true;
    }

    tracing::debug!(db = %config.db_path.display(), read_only = config.read_only, "Opening db");
    let mut ctx = AppContext::from_config(&config)?;

    match cli.command {
        Commands::Status => status_db(&mut ctx),
        Commands::Backup => {
            backup_db(&mut ctx)?;
        }
        Commands::Restore { .. } => {
            restore_db(&mut ctx);
        }
        Commands::Maintain { name } => maintain_db(&mut ctx, name.as_deref())?,
    }

    Ok(())
}

/// Initialize logging to stderr, JSON formatted when `WORKOUT_STORE_LOG_JSON` is set.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("workout_store=info"));

    let json = std::env::var_os("WORKOUT_STORE_LOG_JSON").is_some();
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
