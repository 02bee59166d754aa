//! Model: the per-table CRUD and query facade
//!
//! A `Model` is a stateless view over one `(connection, table config)`
//! pair. Every operation opens a fresh single-store transaction scoped to
//! that call; there is no cross-call transaction reuse and no coordination
//! between concurrent calls beyond what the host provides per transaction.
//!
//! Typed models (`Model<T>`) round-trip records through serde so callers
//! get their own type back; the default `Model` works on plain records.

use std::marker::PhantomData;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use web_sys::IdbTransactionMode;

use cellar_core::{
    apply_select, touch_insert, touch_update, verify, Record, SelectOptions, TableConfig,
};

use crate::database::Connection;
use crate::error::{Error, Result};
use crate::idb;

/// CRUD/query facade for one table.
pub struct Model<T = Record> {
    connection: Rc<Connection>,
    table: TableConfig,
    _marker: PhantomData<T>,
}

impl<T> Model<T>
where
    T: Serialize + DeserializeOwned,
{
    pub(crate) fn new(connection: Rc<Connection>, table: TableConfig) -> Self {
        Self {
            connection,
            table,
            _marker: PhantomData,
        }
    }

    /// The table this model is bound to.
    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    /// Insert a record.
    ///
    /// Checks the primary-key invariant, injects timestamps when enabled,
    /// and returns the input augmented with the host-generated key when
    /// auto-increment produced one. Host failures (uniqueness violations
    /// and the like) surface as [`Error::Storage`].
    pub async fn insert(&self, value: &T) -> Result<T> {
        let mut record = to_record(value)?;
        verify(&record, std::slice::from_ref(&self.table))?;
        if self.table.timestamps {
            touch_insert(&mut record, now_ms());
        }

        let js = record_to_js(&record)?;
        let (tx, store) = self.transaction(IdbTransactionMode::Readwrite)?;
        let req = store.add(&js)?;
        let key = idb::await_request(&req).await?;
        idb::await_transaction(&tx).await?;

        let pk = &self.table.primary_key.name;
        if !key.is_undefined() && !key.is_null() && !record.contains_key(pk) {
            record.insert(pk.clone(), js_to_value(key)?);
        }
        from_record(record)
    }

    /// Point lookup by primary key.
    pub async fn select_by_pk(&self, key: &Value) -> Result<Option<T>> {
        let js_key = value_to_js(key)?;
        let (tx, store) = self.transaction(IdbTransactionMode::Readonly)?;
        let req = store.get(&js_key)?;
        let result = idb::await_request(&req).await?;
        idb::await_transaction(&tx).await?;
        decode_optional(result)
    }

    /// Point lookup via a secondary index; first match wins on duplicates.
    pub async fn select_by_index(&self, index: &str, value: &Value) -> Result<Option<T>> {
        let js_value = value_to_js(value)?;
        let (tx, store) = self.transaction(IdbTransactionMode::Readonly)?;
        let idx = store.index(index)?;
        let req = idx.get(&js_value)?;
        let result = idb::await_request(&req).await?;
        idb::await_transaction(&tx).await?;
        decode_optional(result)
    }

    /// All matches via a secondary index.
    pub async fn select_by_index_all(&self, index: &str, value: &Value) -> Result<Vec<T>> {
        let js_value = value_to_js(value)?;
        let (tx, store) = self.transaction(IdbTransactionMode::Readonly)?;
        let idx = store.index(index)?;
        let req = idx.get_all_with_key(&js_value)?;
        let result = idb::await_request(&req).await?;
        idb::await_transaction(&tx).await?;

        let records = js_to_records(result)?;
        records.into_iter().map(from_record).collect()
    }

    /// Full table scan.
    pub async fn select_all(&self) -> Result<Vec<T>> {
        self.all_records()
            .await?
            .into_iter()
            .map(from_record)
            .collect()
    }

    /// Composed query over a full scan: filter, then sort, then limit.
    pub async fn select(&self, options: SelectOptions) -> Result<Vec<T>> {
        let records = apply_select(self.all_records().await?, options);
        records.into_iter().map(from_record).collect()
    }

    /// Shallow-merge a partial update over the stored record and persist.
    ///
    /// When no record exists under `key`, the merge base is empty and the
    /// partial alone (plus `updatedAt`) is persisted; whether the host
    /// accepts a record without its key is then the host's call. Kept as
    /// documented behavior.
    pub async fn update_by_pk(&self, key: &Value, partial: Record) -> Result<T> {
        let js_key = value_to_js(key)?;

        let (tx, store) = self.transaction(IdbTransactionMode::Readwrite)?;
        let req = store.get(&js_key)?;
        let existing = idb::await_request(&req).await?;

        let mut merged: Record = if existing.is_undefined() || existing.is_null() {
            Record::new()
        } else {
            js_to_record(existing)?
        };
        merged.extend(partial);
        if self.table.timestamps {
            touch_update(&mut merged, now_ms());
        }

        let js = record_to_js(&merged)?;
        let put_req = store.put(&js)?;
        idb::await_request(&put_req).await?;
        idb::await_transaction(&tx).await?;

        from_record(merged)
    }

    /// Delete by primary key; resolves with the key whether or not a
    /// record existed (the host delete is idempotent).
    pub async fn delete_by_pk(&self, key: &Value) -> Result<Value> {
        let js_key = value_to_js(key)?;
        let (tx, store) = self.transaction(IdbTransactionMode::Readwrite)?;
        let req = store.delete(&js_key)?;
        idb::await_request(&req).await?;
        idb::await_transaction(&tx).await?;
        Ok(key.clone())
    }

    /// Number of records in the table.
    pub async fn count(&self) -> Result<u32> {
        let (tx, store) = self.transaction(IdbTransactionMode::Readonly)?;
        let req = store.count()?;
        let result = idb::await_request(&req).await?;
        idb::await_transaction(&tx).await?;
        Ok(result.as_f64().unwrap_or(0.0) as u32)
    }

    /// Remove every record in the table.
    pub async fn clear(&self) -> Result<()> {
        let (tx, store) = self.transaction(IdbTransactionMode::Readwrite)?;
        let req = store.clear()?;
        idb::await_request(&req).await?;
        idb::await_transaction(&tx).await?;
        Ok(())
    }

    async fn all_records(&self) -> Result<Vec<Record>> {
        let (tx, store) = self.transaction(IdbTransactionMode::Readonly)?;
        let req = store.get_all()?;
        let result = idb::await_request(&req).await?;
        idb::await_transaction(&tx).await?;
        js_to_records(result)
    }

    fn transaction(
        &self,
        mode: IdbTransactionMode,
    ) -> Result<(web_sys::IdbTransaction, web_sys::IdbObjectStore)> {
        idb::transaction(self.connection.db(), &self.table.name, mode)
    }
}

fn now_ms() -> i64 {
    js_sys::Date::now() as i64
}

fn to_record<T: Serialize>(value: &T) -> Result<Record> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::Serialization(
            "record must serialize to an object".to_string(),
        )),
        Err(e) => Err(Error::Serialization(e.to_string())),
    }
}

fn from_record<T: DeserializeOwned>(record: Record) -> Result<T> {
    serde_json::from_value(Value::Object(record)).map_err(|e| Error::Serialization(e.to_string()))
}

fn record_to_js(record: &Record) -> Result<JsValue> {
    // json_compatible keeps maps as plain JS objects rather than JS Maps,
    // which is what keyPath lookups and indexes operate on.
    record
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(Error::from)
}

fn value_to_js(value: &Value) -> Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(Error::from)
}

fn js_to_value(js: JsValue) -> Result<Value> {
    let value: Value = serde_wasm_bindgen::from_value(js)?;
    Ok(canonical(value))
}

fn js_to_record(js: JsValue) -> Result<Record> {
    match js_to_value(js)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Serialization(
            "stored value is not an object".to_string(),
        )),
    }
}

fn js_to_records(js: JsValue) -> Result<Vec<Record>> {
    match js_to_value(js)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                _ => Err(Error::Serialization(
                    "stored value is not an object".to_string(),
                )),
            })
            .collect(),
        _ => Err(Error::Serialization(
            "result is not an array of records".to_string(),
        )),
    }
}

fn decode_optional<T: DeserializeOwned>(js: JsValue) -> Result<Option<T>> {
    if js.is_undefined() || js.is_null() {
        return Ok(None);
    }
    Ok(Some(from_record(js_to_record(js)?)?))
}

/// Largest integer JS represents exactly (Number.MAX_SAFE_INTEGER).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// JS numbers arrive as f64; fold integral values back into integers so
/// generated keys and epoch-millisecond timestamps round-trip as the
/// integers they were written as.
fn canonical(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
                Value::from(f as i64)
            }
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(canonical).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, canonical(v))).collect())
        }
        other => other,
    }
}
