//! Schema migration, executed inside the host's upgrade transaction
//!
//! Runs when the requested version exceeds the stored one (or on first
//! creation). The sync is one-directional and non-preserving: stores
//! absent from the new configuration are dropped outright, missing stores
//! are created, and every configured index is re-created best-effort so
//! repeated upgrades stay idempotent. Seed data goes only into stores
//! created by this very upgrade.

use serde::Serialize;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    IdbDatabase, IdbObjectStore, IdbOpenDbRequest, IdbTransaction, IdbVersionChangeEvent,
};

use cellar_core::{touch_insert, verify, DatabaseConfig, TableConfig};

use crate::error::js_message;

/// Apply the configured schema to the database being upgraded.
///
/// Called from the `upgradeneeded` handler; the returned error string is
/// captured by the caller and surfaced once the open request settles,
/// since nothing can be rejected from inside the callback itself.
pub(crate) fn run_upgrade(
    event: &IdbVersionChangeEvent,
    config: &DatabaseConfig,
) -> Result<(), String> {
    let request: IdbOpenDbRequest = event
        .target()
        .ok_or_else(|| "upgrade event has no target".to_string())?
        .unchecked_into();

    let db: IdbDatabase = request
        .result()
        .map_err(|e| js_message(&e))?
        .unchecked_into();

    let tx: IdbTransaction = request
        .transaction()
        .ok_or_else(|| "upgrade event has no transaction".to_string())?;

    let old_version = event.old_version();
    debug!(
        database = %config.name,
        old_version,
        new_version = config.version,
        "running schema migration"
    );

    // 1. Drop stores that are no longer configured, data included; this
    //    is a schema sync, not a data-migration framework.
    if old_version > 0.0 {
        let configured: Vec<&str> = config.tables.iter().map(|t| t.name.as_str()).collect();
        for existing in store_names(&db) {
            if !configured.contains(&existing.as_str()) {
                debug!(table = %existing, "dropping store absent from configuration");
                db.delete_object_store(&existing)
                    .map_err(|e| js_message(&e))?;
            }
        }
    }

    for table in &config.tables {
        // 2. Create missing stores; reuse existing ones as-is.
        let fresh = !db.object_store_names().contains(&table.name);
        let store = if fresh {
            create_store(&db, table)?
        } else {
            tx.object_store(&table.name).map_err(|e| js_message(&e))?
        };

        // 3. Indexes are re-created best-effort; a duplicate-index failure
        //    on an already-provisioned store is expected and swallowed.
        for (field, spec) in &table.indexes {
            let params = web_sys::IdbIndexParameters::new();
            set_param(&params, "unique", &JsValue::from_bool(spec.unique))?;
            set_param(&params, "multiEntry", &JsValue::from_bool(spec.multi_entry))?;

            if let Err(err) =
                store.create_index_with_str_and_optional_parameters(field, field, &params)
            {
                warn!(
                    table = %table.name,
                    index = %field,
                    reason = %js_message(&err),
                    "index creation skipped"
                );
            }
        }

        // 4. Seed data, only for stores created by this upgrade.
        if fresh {
            seed_store(&store, table)?;
        }
    }

    Ok(())
}

fn store_names(db: &IdbDatabase) -> Vec<String> {
    let list = db.object_store_names();
    (0..list.length()).filter_map(|i| list.get(i)).collect()
}

fn create_store(db: &IdbDatabase, table: &TableConfig) -> Result<IdbObjectStore, String> {
    let params = web_sys::IdbObjectStoreParameters::new();
    set_param(&params, "keyPath", &JsValue::from_str(&table.primary_key.name))?;
    set_param(
        &params,
        "autoIncrement",
        &JsValue::from_bool(table.primary_key.auto_increment),
    )?;

    debug!(table = %table.name, key = %table.primary_key.name, "creating store");
    db.create_object_store_with_optional_parameters(&table.name, &params)
        .map_err(|e| js_message(&e))
}

fn seed_store(store: &IdbObjectStore, table: &TableConfig) -> Result<(), String> {
    for record in &table.init_data {
        // A record violating the primary-key invariant aborts that insert
        // only; the rest of the seed data still goes in.
        if let Err(err) = verify(record, std::slice::from_ref(table)) {
            warn!(table = %table.name, reason = %err, "seed record skipped");
            continue;
        }

        let mut record = record.clone();
        if table.timestamps {
            touch_insert(&mut record, js_sys::Date::now() as i64);
        }

        let js = record
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| e.to_string())?;
        store.add(&js).map_err(|e| js_message(&e))?;
    }
    Ok(())
}

fn set_param(target: &JsValue, key: &str, value: &JsValue) -> Result<(), String> {
    js_sys::Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|e| js_message(&e))
}
