//! Error types for the IndexedDB layer

use cellar_core::{ConfigError, ValidationError};
use thiserror::Error;

/// Result type for IndexedDB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while opening, migrating, or querying a database.
///
/// Configuration and record-validation failures come from `cellar-core`;
/// everything the host engine reports is carried through as `Storage` with
/// the host's own message as the reason.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or mixed-style table configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Primary-key invariant violated on a record
    #[error("record validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// IndexedDB is not available in this environment
    #[error("IndexedDB not available: {0}")]
    Environment(String),

    /// Another connection prevents opening, upgrading, or deleting;
    /// callers must close competing connections, there is no retry
    #[error("open blocked by another connection: {0}")]
    OpenBlocked(String),

    /// Requested table name or model is not part of the configured registry
    #[error("unknown table: {0}")]
    NotFound(String),

    /// Operation attempted before `connect()` resolved
    #[error("connection not ready: {0}")]
    State(String),

    /// Host-engine-reported failure, propagated verbatim
    #[error("storage error: {0}")]
    Storage(String),

    /// Record could not cross the serde/JsValue boundary
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<wasm_bindgen::JsValue> for Error {
    fn from(val: wasm_bindgen::JsValue) -> Self {
        Error::Storage(js_message(&val))
    }
}

impl From<serde_wasm_bindgen::Error> for Error {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Best-effort human-readable message for an arbitrary JS value.
pub(crate) fn js_message(val: &wasm_bindgen::JsValue) -> String {
    if let Some(s) = val.as_string() {
        return s;
    }
    js_sys::JSON::stringify(val)
        .map(String::from)
        .unwrap_or_else(|_| format!("{val:?}"))
}
