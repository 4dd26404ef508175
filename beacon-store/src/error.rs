//! Error types raised while opening or loading the `SQLite` store.
#![forbid(unsafe_code)]

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::schema::SchemaError;

/// Errors raised by [`SqliteStore`](crate::SqliteStore) setup and import
/// operations.
///
/// Trait methods report [`beacon_core::StoreError`] instead, so engine code
/// never depends on `rusqlite`.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Opening the database file failed.
    #[error("failed to open SQLite database at {path}")]
    Open {
        /// Requested database path.
        path: Utf8PathBuf,
        /// Source error from `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Schema initialisation failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A statement failed.
    #[error("failed to {operation}")]
    Query {
        /// Description of the failed operation.
        operation: &'static str,
        /// Source error from `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A profile document could not be encoded.
    #[error("failed to encode profile {id}")]
    Encode {
        /// Identity of the affected profile.
        id: String,
        /// Source error from `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// A record had no usable identity.
    #[error("profile record at position {position} has an empty id")]
    MissingId {
        /// Zero-based position in the imported batch.
        position: usize,
    },
    /// The connection mutex was poisoned by a panicking holder.
    #[error("SQLite connection lock is poisoned")]
    Poisoned,
}
