//! `SQLite` implementation of the profile, interaction, and preference stores.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use beacon_core::{
    CandidateProfile, InteractionEvent, InteractionKind, InteractionStore, LearnedPreferenceModel,
    NewInteraction, PreferenceStore, ProfileStore, StoreError,
};
use camino::Utf8Path;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use geo::Coord;
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::error::SqliteStoreError;
use crate::record::ProfileRecord;
use crate::schema::initialise_schema;

const PROFILE_COLUMNS: &str = "SELECT document FROM profiles";

/// Store backed by a single `SQLite` connection.
///
/// The connection sits behind a mutex so one store can serve concurrent
/// callers; every trait call holds the lock for exactly one statement or
/// transaction.
///
/// # Examples
/// ```
/// use beacon_core::{ProfileStore, CandidateProfile};
/// use beacon_store::{ProfileRecord, SqliteStore};
///
/// let store = SqliteStore::open_in_memory().expect("open store");
/// let record = ProfileRecord::from(&CandidateProfile::new("ada").with_tags(["music"]));
/// store.import_profiles([record]).expect("import");
/// let profile = store.profile("ada").expect("read").expect("present");
/// assert!(profile.tags.contains("music"));
/// ```
#[derive(Debug)]
pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and initialise its schema.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError::Open`] when the file cannot be opened and
    /// [`SqliteStoreError::Schema`] when initialisation fails.
    pub fn open(path: &Utf8Path) -> Result<Self, SqliteStoreError> {
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| SqliteStoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_connection(connection)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError`] when the database cannot be created.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteStoreError::Open {
                path: ":memory:".into(),
                source,
            })?;
        Self::from_connection(connection)
    }

    /// Wrap an existing connection, initialising the schema first.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError::Schema`] when initialisation fails.
    pub fn from_connection(mut connection: Connection) -> Result<Self, SqliteStoreError> {
        initialise_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Insert or replace profiles and their block-lists in one transaction.
    ///
    /// A record's block-list replaces any previously stored one. Returns the
    /// number of records written.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError::MissingId`] for a blank identity,
    /// [`SqliteStoreError::Encode`] when a document cannot be serialised, and
    /// [`SqliteStoreError::Query`] when a statement fails. Nothing is written
    /// when any record fails.
    pub fn import_profiles<I>(&self, records: I) -> Result<usize, SqliteStoreError>
    where
        I: IntoIterator<Item = ProfileRecord>,
    {
        let mut connection = self.connection.lock().map_err(|_| SqliteStoreError::Poisoned)?;
        let transaction = connection
            .transaction()
            .map_err(|source| query("begin import transaction", source))?;
        let mut written = 0_usize;
        for (position, record) in records.into_iter().enumerate() {
            write_record(&transaction, position, record)?;
            written += 1;
        }
        transaction
            .commit()
            .map_err(|source| query("commit import transaction", source))?;
        debug!("imported {written} profile records");
        Ok(written)
    }

    /// Record that `user_id` blocked `blocked_id`.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError::Query`] when the insert fails.
    pub fn block(&self, user_id: &str, blocked_id: &str) -> Result<(), SqliteStoreError> {
        let connection = self.connection.lock().map_err(|_| SqliteStoreError::Poisoned)?;
        connection
            .execute(
                "INSERT OR IGNORE INTO blocks (user_id, blocked_id) VALUES (?1, ?2)",
                params![user_id, blocked_id],
            )
            .map(|_| ())
            .map_err(|source| query("insert block", source))
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::Corrupt {
            operation,
            reason: "connection lock poisoned".to_owned(),
        })
    }
}

const fn query(operation: &'static str, source: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Query { operation, source }
}

fn write_record(
    transaction: &rusqlite::Transaction<'_>,
    position: usize,
    record: ProfileRecord,
) -> Result<(), SqliteStoreError> {
    let blocked = record.blocked_ids();
    let (visible, onboarded) = (record.visible, record.onboarded);
    let profile = record.into_profile();
    if profile.id.is_empty() {
        return Err(SqliteStoreError::MissingId { position });
    }
    let document = serde_json::to_string(&ProfileRecord::from(&profile)).map_err(|source| {
        SqliteStoreError::Encode {
            id: profile.id.clone(),
            source,
        }
    })?;

    transaction
        .prepare_cached(
            "INSERT INTO profiles (id, document, visible, onboarded) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                document = excluded.document,
                visible = excluded.visible,
                onboarded = excluded.onboarded",
        )
        .and_then(|mut statement| {
            statement.execute(params![profile.id, document, visible, onboarded])
        })
        .map_err(|source| query("upsert profile", source))?;
    transaction
        .execute("DELETE FROM blocks WHERE user_id = ?1", [&profile.id])
        .map_err(|source| query("clear blocks", source))?;
    let mut insert_block = transaction
        .prepare_cached("INSERT OR IGNORE INTO blocks (user_id, blocked_id) VALUES (?1, ?2)")
        .map_err(|source| query("prepare insert block", source))?;
    for blocked_id in &blocked {
        insert_block
            .execute(params![profile.id, blocked_id])
            .map_err(|source| query("insert block", source))?;
    }
    Ok(())
}

fn decode_profile(operation: &'static str, document: &str) -> Result<CandidateProfile, StoreError> {
    serde_json::from_str::<ProfileRecord>(document)
        .map(ProfileRecord::into_profile)
        .map_err(|err| StoreError::Corrupt {
            operation,
            reason: err.to_string(),
        })
}

fn query_profiles(
    connection: &Connection,
    operation: &'static str,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<CandidateProfile>, StoreError> {
    let mut statement = connection
        .prepare_cached(sql)
        .map_err(|err| StoreError::backend(operation, err))?;
    let documents = statement
        .query_map(params, |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|err| StoreError::backend(operation, err))?;
    documents
        .iter()
        .map(|document| decode_profile(operation, document))
        .collect()
}

impl ProfileStore for SqliteStore {
    fn profile(&self, id: &str) -> Result<Option<CandidateProfile>, StoreError> {
        const OPERATION: &str = "read profile";
        let connection = self.lock(OPERATION)?;
        let document: Option<String> = connection
            .query_row(
                &format!("{PROFILE_COLUMNS} WHERE id = ?1"),
                [id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| StoreError::backend(OPERATION, err))?;
        document
            .map(|doc| decode_profile(OPERATION, &doc))
            .transpose()
    }

    fn visible_profiles(&self) -> Result<Vec<CandidateProfile>, StoreError> {
        const OPERATION: &str = "read visible profiles";
        let connection = self.lock(OPERATION)?;
        query_profiles(
            &connection,
            OPERATION,
            &format!("{PROFILE_COLUMNS} WHERE visible = 1 AND onboarded = 1 ORDER BY id"),
            [],
        )
    }

    fn profiles_by_ids(&self, ids: &[String]) -> Result<Vec<CandidateProfile>, StoreError> {
        const OPERATION: &str = "read profiles by id";
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let connection = self.lock(OPERATION)?;
        query_profiles(
            &connection,
            OPERATION,
            &format!("{PROFILE_COLUMNS} WHERE id IN ({placeholders}) ORDER BY id"),
            params_from_iter(ids),
        )
    }

    fn blocked_ids(&self, id: &str) -> Result<BTreeSet<String>, StoreError> {
        const OPERATION: &str = "read block-list";
        let connection = self.lock(OPERATION)?;
        let mut statement = connection
            .prepare_cached("SELECT blocked_id FROM blocks WHERE user_id = ?1")
            .map_err(|err| StoreError::backend(OPERATION, err))?;
        statement
            .query_map([id], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<BTreeSet<_>, _>>())
            .map_err(|err| StoreError::backend(OPERATION, err))
    }
}

fn encode_timestamp(at: DateTime<Utc>) -> String {
    // Fixed-width UTC strings sort chronologically.
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(operation: &'static str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| StoreError::Corrupt {
            operation,
            reason: format!("bad timestamp {raw:?}: {err}"),
        })
}

/// Raw interaction row before timestamp and metadata decoding.
struct InteractionRow {
    id: i64,
    user_id: String,
    target_id: String,
    kind: String,
    created_at: String,
    distance_km: Option<f64>,
    lat: Option<f64>,
    lng: Option<f64>,
    duration_seconds: Option<u32>,
    metadata: String,
}

impl InteractionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            target_id: row.get(2)?,
            kind: row.get(3)?,
            created_at: row.get(4)?,
            distance_km: row.get(5)?,
            lat: row.get(6)?,
            lng: row.get(7)?,
            duration_seconds: row.get(8)?,
            metadata: row.get(9)?,
        })
    }

    fn into_event(self, operation: &'static str) -> Result<InteractionEvent, StoreError> {
        let id = u64::try_from(self.id).map_err(|_| StoreError::Corrupt {
            operation,
            reason: format!("negative interaction id {}", self.id),
        })?;
        let metadata =
            serde_json::from_str(&self.metadata).map_err(|err| StoreError::Corrupt {
                operation,
                reason: err.to_string(),
            })?;
        Ok(InteractionEvent {
            id,
            user_id: self.user_id,
            target_id: self.target_id,
            kind: InteractionKind::from(self.kind),
            created_at: decode_timestamp(operation, &self.created_at)?,
            distance_km: self.distance_km,
            location: self.lat.zip(self.lng).map(|(y, x)| Coord { x, y }),
            duration_seconds: self.duration_seconds,
            metadata,
        })
    }
}

impl InteractionStore for SqliteStore {
    fn append_interaction(
        &self,
        interaction: NewInteraction,
    ) -> Result<InteractionEvent, StoreError> {
        const OPERATION: &str = "append interaction";
        let metadata = serde_json::to_string(&interaction.metadata).map_err(|err| {
            StoreError::Corrupt {
                operation: OPERATION,
                reason: err.to_string(),
            }
        })?;
        // Stored timestamps carry microseconds; return what a read would see.
        let stored = NewInteraction {
            created_at: interaction.created_at.trunc_subsecs(6),
            ..interaction
        };
        let connection = self.lock(OPERATION)?;
        connection
            .prepare_cached(
                "INSERT INTO interactions
                    (user_id, target_id, kind, created_at, distance_km, lat, lng, duration_seconds, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .and_then(|mut statement| {
                statement.execute(params![
                    stored.user_id,
                    stored.target_id,
                    stored.kind.as_str(),
                    encode_timestamp(stored.created_at),
                    stored.distance_km,
                    stored.location.map(|coord| coord.y),
                    stored.location.map(|coord| coord.x),
                    stored.duration_seconds,
                    metadata,
                ])
            })
            .map_err(|err| StoreError::backend(OPERATION, err))?;
        let row_id = connection.last_insert_rowid();
        let id = u64::try_from(row_id).map_err(|_| StoreError::Corrupt {
            operation: OPERATION,
            reason: format!("negative interaction id {row_id}"),
        })?;
        Ok(InteractionEvent::from_new(id, stored))
    }

    fn recent_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionEvent>, StoreError> {
        const OPERATION: &str = "read recent interactions";
        let row_limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let connection = self.lock(OPERATION)?;
        let mut statement = connection
            .prepare_cached(
                "SELECT id, user_id, target_id, kind, created_at, distance_km, lat, lng,
                        duration_seconds, metadata
                 FROM interactions
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
            )
            .map_err(|err| StoreError::backend(OPERATION, err))?;
        let rows = statement
            .query_map(params![user_id, row_limit], InteractionRow::from_row)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|err| StoreError::backend(OPERATION, err))?;
        rows.into_iter()
            .map(|row| row.into_event(OPERATION))
            .collect()
    }

    fn interacting_users(&self) -> Result<Vec<String>, StoreError> {
        const OPERATION: &str = "list interacting users";
        let connection = self.lock(OPERATION)?;
        let mut statement = connection
            .prepare_cached("SELECT DISTINCT user_id FROM interactions ORDER BY user_id")
            .map_err(|err| StoreError::backend(OPERATION, err))?;
        statement
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|err| StoreError::backend(OPERATION, err))
    }
}

impl PreferenceStore for SqliteStore {
    fn preferences(&self, user_id: &str) -> Result<Option<LearnedPreferenceModel>, StoreError> {
        const OPERATION: &str = "read preference model";
        let connection = self.lock(OPERATION)?;
        let document: Option<String> = connection
            .query_row(
                "SELECT model FROM preference_models WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| StoreError::backend(OPERATION, err))?;
        document
            .map(|doc| {
                serde_json::from_str(&doc).map_err(|err| StoreError::Corrupt {
                    operation: OPERATION,
                    reason: err.to_string(),
                })
            })
            .transpose()
    }

    fn save_preferences(&self, model: &LearnedPreferenceModel) -> Result<(), StoreError> {
        const OPERATION: &str = "save preference model";
        let document = serde_json::to_string(model).map_err(|err| StoreError::Corrupt {
            operation: OPERATION,
            reason: err.to_string(),
        })?;
        let connection = self.lock(OPERATION)?;
        connection
            .execute(
                "INSERT INTO preference_models (user_id, model, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                    model = excluded.model,
                    updated_at = excluded.updated_at",
                params![model.user_id, document, encode_timestamp(model.updated_at)],
            )
            .map(|_| ())
            .map_err(|err| StoreError::backend(OPERATION, err))
    }
}
