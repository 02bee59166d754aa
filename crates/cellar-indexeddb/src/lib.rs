//! Promise-style IndexedDB layer for Cellar (browser WASM)
//!
//! This crate binds the host-independent `cellar-core` layer to the
//! browser's IndexedDB: it owns the connection lifecycle, runs schema
//! migration inside the host's upgrade transaction, and hands out
//! per-table [`Model`] facades whose CRUD and query calls each wrap one
//! host request as a future.
//!
//! Durability, transaction atomicity, indexing, and version/blocking
//! semantics all belong to the host engine; this layer only adapts them.
//! Concurrent calls are not coordinated with each other, cancellation is
//! not supported, and a blocked open is surfaced, never retried.
//!
//! # Example
//!
//! ```rust,ignore
//! use cellar_core::{SelectOptions, TableConfig, TableDef};
//! use cellar_indexeddb::Database;
//!
//! let db = Database::new("library", 1, vec![
//!     TableDef::Config(TableConfig::new("books")),
//! ])?;
//! db.connect().await?;
//!
//! let books = db.model_by_name("books")?;
//! let stored = books.insert(&record).await?;
//! let found = books.select_by_pk(&stored["id"]).await?;
//! assert!(found.is_some());
//! ```

pub mod database;
pub mod error;
pub mod model;

mod idb;
mod migrate;

pub use database::{Connection, Database};
pub use error::{Error, Result};
pub use model::Model;

// Re-export the core layer so callers need only one dependency.
pub use cellar_core as core;
pub use cellar_core::{
    ClassDescriptor, DatabaseConfig, IndexOptions, IndexSpec, PrimaryKey, PrimaryKeyOptions,
    PropertyDescriptor, Record, SelectOptions, TableConfig, TableDef, TableModel, Where,
};
