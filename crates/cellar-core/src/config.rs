//! Declarative database and table configuration
//!
//! These types describe the schema Cellar keeps in sync with the host
//! store: database name and version, one entry per table, and per-table
//! primary key, secondary indexes, timestamp handling, and seed data.
//!
//! The external (JSON/JS) shape uses camelCase field names and rejects
//! unknown fields, so a malformed configuration fails at deserialization
//! rather than surfacing later as a half-created schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Top-level configuration for one database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Database name passed to the host store.
    pub name: String,
    /// Schema version; bumping it triggers migration on the next open.
    pub version: u32,
    /// Table configurations, one per object store.
    pub tables: Vec<TableConfig>,
}

/// Configuration for a single table (object store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TableConfig {
    /// Table name, unique within the database.
    pub name: String,
    /// When set, `createdAt`/`updatedAt` (epoch ms) are injected on writes.
    #[serde(default)]
    pub timestamps: bool,
    /// Records inserted once, when the table is first created.
    #[serde(default)]
    pub init_data: Vec<Record>,
    /// Primary key description; defaults to auto-incremented `id`.
    #[serde(default)]
    pub primary_key: PrimaryKey,
    /// Secondary indexes keyed by field name.
    #[serde(default)]
    pub indexes: BTreeMap<String, IndexSpec>,
}

impl TableConfig {
    /// A table with the default primary key and no extras.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamps: false,
            init_data: Vec::new(),
            primary_key: PrimaryKey::default(),
            indexes: BTreeMap::new(),
        }
    }
}

/// Primary key description for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct PrimaryKey {
    /// Field holding the key.
    #[serde(default = "default_key_name")]
    pub name: String,
    /// When set, the host generates keys for records that omit the field.
    #[serde(default = "default_true")]
    pub auto_increment: bool,
    /// Uniqueness flag, kept for config parity; primary keys are always
    /// unique in the host store.
    #[serde(default = "default_true")]
    pub unique: bool,
}

impl Default for PrimaryKey {
    fn default() -> Self {
        Self {
            name: default_key_name(),
            auto_increment: true,
            unique: true,
        }
    }
}

/// Options for one secondary index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct IndexSpec {
    /// Reject duplicate values for this field.
    #[serde(default)]
    pub unique: bool,
    /// Index each element of an array-valued field separately.
    #[serde(default)]
    pub multi_entry: bool,
}

fn default_key_name() -> String {
    "id".to_string()
}

fn default_true() -> bool {
    true
}
