//! Structural validation for a normalized database configuration
//!
//! Runs once at `Database` construction, before any store is opened, so a
//! bad configuration never leaves a partially created schema behind.

use std::collections::HashSet;

use crate::config::DatabaseConfig;
use crate::error::ConfigError;

/// Validate a normalized configuration, failing fast on the first violation.
pub fn validate(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::EmptyDatabaseName);
    }
    if config.version < 1 {
        return Err(ConfigError::BadVersion(config.version));
    }
    if config.tables.is_empty() {
        return Err(ConfigError::NoTables);
    }

    let mut seen = HashSet::new();
    for table in &config.tables {
        if table.name.is_empty() {
            return Err(ConfigError::Schema {
                table: "<unnamed>".to_string(),
                reason: "table name must not be empty".to_string(),
            });
        }
        if !seen.insert(table.name.as_str()) {
            return Err(ConfigError::DuplicateTable(table.name.clone()));
        }
        if table.primary_key.name.is_empty() {
            return Err(ConfigError::Schema {
                table: table.name.clone(),
                reason: "primary key field name must not be empty".to_string(),
            });
        }
        for field in table.indexes.keys() {
            if field.is_empty() {
                return Err(ConfigError::Schema {
                    table: table.name.clone(),
                    reason: "index field name must not be empty".to_string(),
                });
            }
            if field == &table.primary_key.name {
                return Err(ConfigError::Schema {
                    table: table.name.clone(),
                    reason: format!("field `{field}` cannot be both primary key and index"),
                });
            }
        }
    }

    Ok(())
}
