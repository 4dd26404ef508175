#![forbid(unsafe_code)]

use rusqlite::{Connection, Error as SqliteError, OptionalExtension};
use thiserror::Error;

/// Version recorded by [`initialise_schema`].
pub const SCHEMA_VERSION: i64 = 1;

/// Initialise the Beacon schema inside an existing `SQLite` database.
///
/// The function enables foreign keys, creates the profile, block,
/// interaction, and preference-model tables with their indexes, and records
/// the schema version. Re-running it against an up-to-date database is a
/// no-op; a database stamped with another version is rejected.
///
/// # Examples
/// ```
/// use beacon_store::{SCHEMA_VERSION, initialise_schema};
/// use rusqlite::Connection;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create schema");
/// initialise_schema(&mut conn).expect("schema initialisation is idempotent");
///
/// let version: i64 = conn
///     .query_row("SELECT version FROM beacon_schema_version", [], |row| row.get(0))
///     .expect("read schema version");
/// assert_eq!(version, SCHEMA_VERSION);
/// ```
///
/// # Errors
/// Returns [`SchemaError`] when a migration step fails or the stored version
/// differs from [`SCHEMA_VERSION`].
pub fn initialise_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| SchemaError::ForeignKeys { source })?;

    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_tables(&transaction)?;
    create_indexes(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_tables(transaction: &rusqlite::Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create profiles",
        "CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY CHECK (length(trim(id)) > 0),
            document TEXT NOT NULL,
            visible INTEGER NOT NULL DEFAULT 1,
            onboarded INTEGER NOT NULL DEFAULT 1
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create blocks",
        "CREATE TABLE IF NOT EXISTS blocks (
            user_id TEXT NOT NULL,
            blocked_id TEXT NOT NULL,
            PRIMARY KEY (user_id, blocked_id)
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create interactions",
        "CREATE TABLE IF NOT EXISTS interactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            target_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            created_at TEXT NOT NULL,
            distance_km REAL,
            lat REAL,
            lng REAL,
            duration_seconds INTEGER,
            metadata TEXT NOT NULL DEFAULT 'null'
        )",
    )?;
    run_migration_step(
        transaction,
        "create preference_models",
        "CREATE TABLE IF NOT EXISTS preference_models (
            user_id TEXT PRIMARY KEY,
            model TEXT NOT NULL,
            updated_at TEXT NOT NULL
        ) WITHOUT ROWID",
    )
}

fn create_indexes(transaction: &rusqlite::Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "index interactions by user",
        "CREATE INDEX IF NOT EXISTS idx_interactions_user_recent
            ON interactions(user_id, created_at DESC, id DESC)",
    )?;
    run_migration_step(
        transaction,
        "index visible profiles",
        "CREATE INDEX IF NOT EXISTS idx_profiles_visible
            ON profiles(visible, onboarded, id)",
    )
}

fn ensure_schema_version(transaction: &rusqlite::Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS beacon_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM beacon_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO beacon_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| SchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &rusqlite::Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}

/// Errors raised when initialising the Beacon schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Enabling foreign keys failed.
    #[error("failed to enable SQLite foreign keys")]
    ForeignKeys {
        /// Source error from `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A migration statement failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Name of the failed step.
        step: &'static str,
        /// Source error from `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database was created by an incompatible version.
    #[error(
        "expected Beacon schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch {
        /// Version this build understands.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
}
