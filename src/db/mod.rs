// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (JSON files behind a layered store).

pub mod activity_db;
pub mod collection;
pub mod layered;
pub mod maintenance;

pub use activity_db::ActivityDb;
pub use collection::{Collection, Record};
pub use layered::{DiskLayer, Layer, LayeredStore, MemoryLayer, StoreMode};

use serde::Serialize;

use crate::error::{DbError, Result};

/// Db file names as constants.
pub const ACTIVITIES_NAME: &str = "activities.json";
pub const RESOURCES_NAME: &str = "resources.json";
pub const METADATA_NAME: &str = "metadata.json";
pub const SCHEMA_NAME: &str = "schema.json";
/// Reserved for derived indexes
pub const INDEX_NAME: &str = "index.json";

/// Every file making up a db, in promotion order.
pub const DB_FILES: [&str; 5] = [
    ACTIVITIES_NAME,
    RESOURCES_NAME,
    METADATA_NAME,
    SCHEMA_NAME,
    INDEX_NAME,
];

/// Version written to a freshly initialized `schema.json`.
pub const SCHEMA_VERSION: u32 = 12;

/// Stable JSON encoding: sorted keys, 2-space indent, trailing newline.
pub fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    // going through Value sorts object keys
    let value = serde_json::to_value(value)?;
    let mut bytes = serde_json::to_vec_pretty(&value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Initial content of a db file.
pub fn default_content(name: &str) -> Result<Vec<u8>> {
    match name {
        SCHEMA_NAME => to_json_bytes(&serde_json::json!({ "version": SCHEMA_VERSION })),
        ACTIVITIES_NAME | RESOURCES_NAME | METADATA_NAME | INDEX_NAME => {
            to_json_bytes(&serde_json::json!({}))
        }
        other => Err(DbError::MissingFile(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_is_sorted_and_terminated() {
        let bytes = to_json_bytes(&serde_json::json!({ "b": 1, "a": { "d": 2, "c": 3 } })).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "{\n  \"a\": {\n    \"c\": 3,\n    \"d\": 2\n  },\n  \"b\": 1\n}\n"
        );
    }

    #[test]
    fn test_default_content() {
        assert_eq!(default_content(ACTIVITIES_NAME).unwrap(), b"{}\n");
        let schema: serde_json::Value =
            serde_json::from_slice(&default_content(SCHEMA_NAME).unwrap()).unwrap();
        assert_eq!(schema["version"], SCHEMA_VERSION);
        assert!(default_content("other.json").is_err());
    }
}
