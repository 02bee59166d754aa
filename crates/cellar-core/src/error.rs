//! Configuration and record validation errors

use thiserror::Error;

/// Errors raised while normalizing or validating a database configuration.
///
/// These are construction-time errors: they are reported synchronously,
/// before any store is opened, and are fatal to the `Database` instance.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// The table list is empty
    #[error("database configuration requires at least one table")]
    NoTables,

    /// Plain table configs and model metadata were mixed in one call
    #[error("table definitions must be all plain configs or all models, not a mix")]
    MixedStyles,

    /// Two tables share a name
    #[error("duplicate table name: {0}")]
    DuplicateTable(String),

    /// The database name is empty
    #[error("database name must not be empty")]
    EmptyDatabaseName,

    /// The version is below the minimum
    #[error("database version must be at least 1, got {0}")]
    BadVersion(u32),

    /// A model declared more than one primary-key property
    #[error("model `{0}` declares more than one primary key")]
    MultiplePrimaryKeys(String),

    /// A field-level violation inside one table's configuration
    #[error("table `{table}`: {reason}")]
    Schema { table: String, reason: String },
}

/// Errors raised by the primary-key invariant check on a record.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// No table configuration was supplied to check against
    #[error("no table configuration available to verify the record against")]
    NoTables,

    /// A non-auto-increment table received a record without its key
    #[error("table `{table}` requires primary key field `{field}` on inserted records")]
    MissingPrimaryKey { table: String, field: String },
}
