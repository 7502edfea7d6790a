// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the activity store.

pub mod activity;
pub mod duration;
pub mod fields;
pub mod resource;
pub mod uid;

pub use activity::{Activity, ActivityPart, ActivityType};
pub use fields::{FieldRegistry, FieldValue};
pub use resource::{Resource, ResourceStatus};
pub use uid::Uid;
