//! Record helpers: timestamp injection and the primary-key invariant
//!
//! A record is a plain field-name-to-value map. Timestamps are epoch
//! milliseconds under `createdAt`/`updatedAt`; the caller supplies the
//! clock so this layer stays free of platform calls.

use serde_json::Value;

use crate::config::TableConfig;
use crate::error::ValidationError;

/// A plain record: field name to JSON value.
pub type Record = serde_json::Map<String, Value>;

/// Field injected on insert when timestamps are enabled.
pub const CREATED_AT: &str = "createdAt";

/// Field injected on insert and refreshed on update.
pub const UPDATED_AT: &str = "updatedAt";

/// Inject both timestamp fields for a freshly inserted record.
pub fn touch_insert(record: &mut Record, now_ms: i64) {
    record.insert(CREATED_AT.to_string(), Value::from(now_ms));
    record.insert(UPDATED_AT.to_string(), Value::from(now_ms));
}

/// Refresh `updatedAt` for an updated record.
pub fn touch_update(record: &mut Record, now_ms: i64) {
    record.insert(UPDATED_AT.to_string(), Value::from(now_ms));
}

/// Check the primary-key presence invariant against the first table.
///
/// When the table does not auto-increment its key, every inserted record
/// must carry a non-null value for the key field. An empty table list is
/// itself an error.
pub fn verify(record: &Record, tables: &[TableConfig]) -> Result<(), ValidationError> {
    let table = tables.first().ok_or(ValidationError::NoTables)?;

    if table.primary_key.auto_increment {
        return Ok(());
    }

    match record.get(&table.primary_key.name) {
        Some(value) if !value.is_null() => Ok(()),
        _ => Err(ValidationError::MissingPrimaryKey {
            table: table.name.clone(),
            field: table.primary_key.name.clone(),
        }),
    }
}
