//! Cellar core - the host-independent half of the Cellar storage layer
//!
//! This crate holds everything that does not touch the browser: declarative
//! table configuration, normalization of typed-model metadata into the
//! plain config shape, fail-fast validation, the record type with its
//! timestamp and primary-key helpers, the multi-key stable sorter, and the
//! composed select pipeline (filter, then sort, then limit).
//!
//! The companion crate `cellar-indexeddb` binds this layer to IndexedDB.
//!
//! # Example
//!
//! ```rust
//! use cellar_core::{
//!     apply_select, validate, DatabaseConfig, Record, SelectOptions, TableConfig, Where,
//! };
//!
//! let config = DatabaseConfig {
//!     name: "library".to_string(),
//!     version: 1,
//!     tables: vec![TableConfig::new("books")],
//! };
//! validate(&config).unwrap();
//!
//! let shelf: Vec<Record> = ["b", "a", "c"]
//!     .iter()
//!     .map(|t| match serde_json::json!({ "title": t }) {
//!         serde_json::Value::Object(map) => map,
//!         _ => unreachable!(),
//!     })
//!     .collect();
//!
//! let options = SelectOptions {
//!     sort_by: vec!["title".to_string()],
//!     limit: Some(2),
//!     ..SelectOptions::default()
//! };
//! let picked = apply_select(shelf, options);
//! assert_eq!(picked.len(), 2);
//! assert_eq!(picked[0]["title"], "a");
//! # let _ = Where::Match(Record::new());
//! ```

pub mod config;
pub mod error;
pub mod meta;
pub mod query;
pub mod record;
pub mod sort;
pub mod validate;

pub use config::{DatabaseConfig, IndexSpec, PrimaryKey, TableConfig};
pub use error::{ConfigError, ValidationError};
pub use meta::{
    normalize, ClassDescriptor, IndexOptions, ModelMetadata, PrimaryKeyOptions,
    PropertyDescriptor, TableDef, TableModel,
};
pub use query::{apply_select, SelectOptions, Where};
pub use record::{touch_insert, touch_update, verify, Record, CREATED_AT, UPDATED_AT};
pub use sort::sort_records;
pub use validate::validate;
