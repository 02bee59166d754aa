//! Database: configuration owner and connection lifecycle
//!
//! A `Database` validates its configuration synchronously at construction,
//! opens (and if needed migrates) the underlying store on `connect()`, and
//! hands out per-table [`Model`](crate::model::Model) facades bound to the
//! shared connection.

use std::cell::RefCell;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{IdbDatabase, IdbVersionChangeEvent};

use cellar_core::{
    normalize, validate, DatabaseConfig, Record, TableConfig, TableDef, TableModel,
    ValidationError,
};

use crate::error::{Error, Result};
use crate::model::Model;
use crate::{idb, migrate};

/// An open handle to the host database.
///
/// Shared between the owning [`Database`] and every [`Model`] it hands
/// out; single-threaded, so plain `Rc` sharing suffices. The handle keeps
/// its `versionchange` observer alive for as long as it exists.
pub struct Connection {
    db: IdbDatabase,
    _onversionchange: Closure<dyn FnMut(IdbVersionChangeEvent)>,
}

impl Connection {
    fn new(db: IdbDatabase) -> Self {
        // Another process requesting a newer version would otherwise stay
        // blocked forever; close this connection defensively and let the
        // caller reconnect.
        let db_to_close = db.clone();
        let on_version_change: Closure<dyn FnMut(IdbVersionChangeEvent)> =
            Closure::wrap(Box::new(move |_event: IdbVersionChangeEvent| {
                debug!("version change requested elsewhere; closing connection");
                db_to_close.close();
            }) as Box<dyn FnMut(IdbVersionChangeEvent)>);

        db.set_onversionchange(Some(on_version_change.as_ref().unchecked_ref()));

        Self {
            db,
            _onversionchange: on_version_change,
        }
    }

    pub(crate) fn db(&self) -> &IdbDatabase {
        &self.db
    }

    /// Close the underlying host connection.
    pub fn close(&self) {
        self.db.close();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Unhook the observer before it is invalidated; a version change
        // arriving after this drop must not call into a dead closure, and
        // an abandoned handle must not keep other tabs' upgrades blocked.
        self.db.set_onversionchange(None);
        self.db.close();
    }
}

/// A configured database: schema registry plus connection lifecycle.
pub struct Database {
    config: DatabaseConfig,
    connection: RefCell<Option<Rc<Connection>>>,
}

impl Database {
    /// Build a database from table definitions (plain configs or models).
    ///
    /// Normalizes and validates synchronously; an invalid or mixed-style
    /// configuration fails here, before any store is touched.
    pub fn new(name: impl Into<String>, version: u32, tables: Vec<TableDef>) -> Result<Self> {
        let tables = normalize(tables)?;
        Self::from_config(DatabaseConfig {
            name: name.into(),
            version,
            tables,
        })
    }

    /// Build a database from an already-normalized configuration.
    pub fn from_config(config: DatabaseConfig) -> Result<Self> {
        validate(&config)?;
        Ok(Self {
            config,
            connection: RefCell::new(None),
        })
    }

    /// Database name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configured schema version.
    pub fn version(&self) -> u32 {
        self.config.version
    }

    /// Names of the configured tables, in configuration order.
    pub fn table_names(&self) -> Vec<&str> {
        self.config.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Whether `connect()` has resolved on this instance.
    pub fn is_connected(&self) -> bool {
        self.connection.borrow().is_some()
    }

    /// Open the database, migrating the schema when the version is newer.
    ///
    /// Resolves with the shared connection handle (and returns the same
    /// handle on repeated calls). Rejects with [`Error::Environment`] when
    /// the host has no IndexedDB, [`Error::OpenBlocked`] when another
    /// connection holds an incompatible version (close it and call again;
    /// there is no auto-retry), or [`Error::Storage`] for anything the
    /// host reports.
    pub async fn connect(&self) -> Result<Rc<Connection>> {
        if let Some(connection) = self.connection.borrow().as_ref() {
            return Ok(Rc::clone(connection));
        }

        debug!(database = %self.config.name, version = self.config.version, "opening");

        // Upgrade callbacks cannot reject the open request themselves, so
        // a migration failure is parked here and raised afterwards.
        let migration_failure: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
        let failure_slot = Rc::clone(&migration_failure);
        let config = self.config.clone();

        let db = idb::open_with_version(
            &self.config.name,
            self.config.version,
            move |event: IdbVersionChangeEvent| {
                if let Err(msg) = migrate::run_upgrade(&event, &config) {
                    *failure_slot.borrow_mut() = Some(msg);
                }
            },
        )
        .await?;

        if let Some(msg) = migration_failure.borrow_mut().take() {
            db.close();
            return Err(Error::Storage(format!("migration failed: {msg}")));
        }

        // An interleaved connect() may have stored a handle while this
        // open was in flight; keep that one and release this open.
        if let Some(existing) = self.connection.borrow().as_ref() {
            db.close();
            return Ok(Rc::clone(existing));
        }

        let connection = Rc::new(Connection::new(db));
        *self.connection.borrow_mut() = Some(Rc::clone(&connection));
        Ok(connection)
    }

    /// Get a plain-record model for a configured table.
    ///
    /// Fails with [`Error::NotFound`] for a name outside the registry and
    /// [`Error::State`] before `connect()` has resolved.
    pub fn model_by_name(&self, table: &str) -> Result<Model> {
        self.model_for(table)
    }

    /// Get a typed model for a table configured from `T`'s metadata.
    ///
    /// Results are decoded into `T`, so callers get their own shape back
    /// instead of plain records.
    pub fn model<T>(&self) -> Result<Model<T>>
    where
        T: TableModel + Serialize + DeserializeOwned,
    {
        let name = T::class_meta().name;
        self.model_for(&name)
    }

    fn model_for<T>(&self, table: &str) -> Result<Model<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let config = self
            .config
            .tables
            .iter()
            .find(|t| t.name == table)
            .cloned()
            .ok_or_else(|| Error::NotFound(table.to_string()))?;

        let connection = self
            .connection
            .borrow()
            .as_ref()
            .map(Rc::clone)
            .ok_or_else(|| Error::State("connect() has not resolved yet".to_string()))?;

        Ok(Model::new(connection, config))
    }

    /// Check the primary-key presence invariant for a record against the
    /// first table in the list.
    pub fn verify(
        record: &Record,
        tables: &[TableConfig],
    ) -> std::result::Result<(), ValidationError> {
        cellar_core::verify(record, tables)
    }

    /// Delete the named database.
    ///
    /// Resolves with a confirmation message; rejects with
    /// [`Error::OpenBlocked`] while open connections hold it.
    pub async fn remove_database(name: &str) -> Result<String> {
        debug!(database = %name, "removing");
        idb::delete_database(name).await
    }

    /// Close the connection and forget it; a later `connect()` reopens.
    pub fn close(&self) {
        if let Some(connection) = self.connection.borrow_mut().take() {
            connection.close();
        }
    }
}
