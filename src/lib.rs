// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Workout-Store: the activity database of a fitness activity aggregator
//!
//! This crate stores workouts collected from several services as JSON files
//! behind a copy-on-write layered store, merges duplicate records by their
//! external uids and provides backup, restore and maintenance commands.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod models;
pub mod registry;
pub mod rules;

pub use context::AppContext;
pub use db::ActivityDb;
pub use error::{DbError, Result};
pub use models::{Activity, Resource, Uid};
