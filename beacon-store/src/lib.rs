//! `SQLite` persistence for the Beacon discovery engine.
//!
//! Responsibilities:
//! - Implement the `beacon-core` profile, interaction, and preference store
//!   traits over a single `SQLite` database.
//! - Normalise imported profile documents at the storage boundary.
//! - Own the schema and its version stamp.
//!
//! Boundaries:
//! - No scoring or learning rules; those live in `beacon-scorer`.
//! - Trait methods surface [`beacon_core::StoreError`] only.
//!
//! Invariants:
//! - Timestamps are stored as fixed-width UTC RFC 3339 text, so lexical
//!   order is chronological order.
//! - Interaction identifiers increase in insertion order.

#![forbid(unsafe_code)]

mod error;
mod record;
mod schema;
mod sqlite;

pub use error::SqliteStoreError;
pub use record::ProfileRecord;
pub use schema::{SCHEMA_VERSION, SchemaError, initialise_schema};
pub use sqlite::SqliteStore;
