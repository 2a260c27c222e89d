// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed local mirror.
//!
//! [`LocalMirrorStore`] holds everything the scanner needs while offline:
//! session snapshots, the expected-entity cache, the pending mutation queue,
//! and the dead-letter table of mutations that exhausted their retries.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::error::{Error, Result};
use crate::mutation::{DroppedMutation, MutationQueueItem, NewMutation};
use crate::session::{ExpectedEntity, SessionSnapshot, SessionStatus};

/// SQL schema for the local mirror database.
pub const SCHEMA: &str = r#"
-- Session snapshots downloaded for offline use
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    location TEXT,
    status TEXT NOT NULL DEFAULT 'in_progress',
    started_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Assets each session expects to find
CREATE TABLE IF NOT EXISTS expected_entities (
    session_id TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    name TEXT NOT NULL,
    barcode TEXT,
    expected_location TEXT,
    scanned_at TEXT,
    scanned_by TEXT,
    PRIMARY KEY (session_id, entity_id),
    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
);

-- Pending writes; AUTOINCREMENT keeps ids from being reused
CREATE TABLE IF NOT EXISTS mutation_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL,
    entity_kind TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    payload TEXT NOT NULL,
    enqueued_at TEXT NOT NULL,
    retry_count INTEGER NOT NULL DEFAULT 0
);

-- Mutations dropped after exhausting the retry budget
CREATE TABLE IF NOT EXISTS dropped_mutations (
    id INTEGER PRIMARY KEY,
    operation TEXT NOT NULL,
    entity_kind TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    payload TEXT NOT NULL,
    enqueued_at TEXT NOT NULL,
    retry_count INTEGER NOT NULL,
    last_error TEXT NOT NULL,
    dropped_at TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_expected_barcode ON expected_entities(session_id, barcode);
CREATE INDEX IF NOT EXISTS idx_queue_entity ON mutation_queue(entity_id);
"#;

/// Parse a string value from the database, returning a rusqlite error on parse failure.
fn parse_db<T: std::str::FromStr>(
    value: &str,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    value.parse().map_err(|_| corrupted(format!("invalid value '{value}' in column '{column}'")))
}

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupted(format!("invalid timestamp '{value}' in column '{column}'")))
}

fn parse_timestamp_opt(
    value: Option<String>,
    column: &str,
) -> std::result::Result<Option<DateTime<Utc>>, rusqlite::Error> {
    value.map(|v| parse_timestamp(&v, column)).transpose()
}

fn parse_payload(value: &str) -> std::result::Result<serde_json::Value, rusqlite::Error> {
    serde_json::from_str(value).map_err(|e| corrupted(format!("invalid payload JSON: {e}")))
}

fn corrupted(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(Error::CorruptedData(message)),
    )
}

fn session_from_row(row: &Row<'_>) -> std::result::Result<SessionSnapshot, rusqlite::Error> {
    let status_str: String = row.get(3)?;
    let started_str: String = row.get(4)?;
    let updated_str: String = row.get(5)?;
    Ok(SessionSnapshot {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        status: parse_db(&status_str, "status")?,
        started_at: parse_timestamp(&started_str, "started_at")?,
        updated_at: parse_timestamp(&updated_str, "updated_at")?,
    })
}

fn entity_from_row(row: &Row<'_>) -> std::result::Result<ExpectedEntity, rusqlite::Error> {
    let scanned_at: Option<String> = row.get(5)?;
    Ok(ExpectedEntity {
        session_id: row.get(0)?,
        entity_id: row.get(1)?,
        name: row.get(2)?,
        barcode: row.get(3)?,
        expected_location: row.get(4)?,
        scanned_at: parse_timestamp_opt(scanned_at, "scanned_at")?,
        scanned_by: row.get(6)?,
    })
}

fn mutation_from_row(row: &Row<'_>) -> std::result::Result<MutationQueueItem, rusqlite::Error> {
    let op_str: String = row.get(1)?;
    let kind_str: String = row.get(2)?;
    let payload_str: String = row.get(4)?;
    let enqueued_str: String = row.get(5)?;
    Ok(MutationQueueItem {
        id: row.get(0)?,
        operation: parse_db(&op_str, "operation")?,
        entity_kind: parse_db(&kind_str, "entity_kind")?,
        entity_id: row.get(3)?,
        payload: parse_payload(&payload_str)?,
        enqueued_at: parse_timestamp(&enqueued_str, "enqueued_at")?,
        retry_count: row.get(6)?,
    })
}

fn dropped_from_row(row: &Row<'_>) -> std::result::Result<DroppedMutation, rusqlite::Error> {
    let op_str: String = row.get(1)?;
    let kind_str: String = row.get(2)?;
    let payload_str: String = row.get(4)?;
    let enqueued_str: String = row.get(5)?;
    let dropped_str: String = row.get(8)?;
    Ok(DroppedMutation {
        id: row.get(0)?,
        operation: parse_db(&op_str, "operation")?,
        entity_kind: parse_db(&kind_str, "entity_kind")?,
        entity_id: row.get(3)?,
        payload: parse_payload(&payload_str)?,
        enqueued_at: parse_timestamp(&enqueued_str, "enqueued_at")?,
        retry_count: row.get(6)?,
        last_error: row.get(7)?,
        dropped_at: parse_timestamp(&dropped_str, "dropped_at")?,
    })
}

/// Create every table and index. Safe to run on an existing mirror.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

fn check_entity_sessions(session_id: &str, entities: &[ExpectedEntity]) -> Result<()> {
    match entities.iter().find(|e| e.session_id != session_id) {
        Some(stray) => Err(Error::InvalidInput(format!(
            "entity '{}' belongs to session '{}', not '{session_id}'",
            stray.entity_id, stray.session_id
        ))),
        None => Ok(()),
    }
}

const SESSION_COLUMNS: &str = "id, name, location, status, started_at, updated_at";
const ENTITY_COLUMNS: &str =
    "session_id, entity_id, name, barcode, expected_location, scanned_at, scanned_by";
const QUEUE_COLUMNS: &str =
    "id, operation, entity_kind, entity_id, payload, enqueued_at, retry_count";
const DROPPED_COLUMNS: &str = "id, operation, entity_kind, entity_id, payload, enqueued_at, \
     retry_count, last_error, dropped_at";

/// Durable local storage for offline stock-take work.
pub struct LocalMirrorStore {
    /// The underlying SQLite connection.
    pub conn: Connection,
}

impl LocalMirrorStore {
    /// Open a mirror at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        let store = LocalMirrorStore { conn };
        run_migrations(&store.conn)?;
        Ok(store)
    }

    /// Open an in-memory mirror (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = LocalMirrorStore { conn };
        run_migrations(&store.conn)?;
        Ok(store)
    }

    // -- Sessions --------------------------------------------------------

    /// Insert or replace a session snapshot.
    pub fn upsert_session(&self, session: &SessionSnapshot) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, name, location, status, started_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 location = excluded.location,
                 status = excluded.status,
                 started_at = excluded.started_at,
                 updated_at = excluded.updated_at",
            params![
                session.id,
                session.name,
                session.location,
                session.status.as_str(),
                session.started_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a session snapshot by ID.
    pub fn get_session(&self, id: &str) -> Result<SessionSnapshot> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        let session = self
            .conn
            .query_row(&sql, params![id], session_from_row)
            .optional()?;

        session.ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// List all cached sessions, most recently updated first.
    pub fn list_sessions(&self) -> Result<Vec<SessionSnapshot>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY updated_at DESC, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let sessions = stmt
            .query_map([], session_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Update the status of a cached session.
    pub fn update_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE sessions SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), at.to_rfc3339(), session_id],
        )?;
        if changed == 0 {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }

    /// Remove a session and its expected entities. Returns false if it was not cached.
    ///
    /// Queued mutations for the session are kept; they still need to reach the remote.
    pub fn clear_session(&self, session_id: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM expected_entities WHERE session_id = ?1",
            params![session_id],
        )?;
        let removed = tx.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    // -- Expected entities -----------------------------------------------

    /// Replace the whole expected-entity cache for a session in one transaction.
    pub fn replace_expected_entities(
        &self,
        session_id: &str,
        entities: &[ExpectedEntity],
    ) -> Result<()> {
        check_entity_sessions(session_id, entities)?;
        self.get_session(session_id)?;

        let tx = self.conn.unchecked_transaction()?;
        self.write_expected_entities(session_id, entities)?;
        tx.commit()?;
        Ok(())
    }

    /// Store a downloaded snapshot and its entity cache together.
    ///
    /// Either both land or neither does.
    pub fn download_session(
        &self,
        session: &SessionSnapshot,
        entities: &[ExpectedEntity],
    ) -> Result<()> {
        check_entity_sessions(&session.id, entities)?;

        let tx = self.conn.unchecked_transaction()?;
        self.upsert_session(session)?;
        self.write_expected_entities(&session.id, entities)?;
        tx.commit()?;
        Ok(())
    }

    fn write_expected_entities(&self, session_id: &str, entities: &[ExpectedEntity]) -> Result<()> {
        self.conn.execute(
            "DELETE FROM expected_entities WHERE session_id = ?1",
            params![session_id],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO expected_entities
             (session_id, entity_id, name, barcode, expected_location, scanned_at, scanned_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for entity in entities {
            stmt.execute(params![
                entity.session_id,
                entity.entity_id,
                entity.name,
                entity.barcode,
                entity.expected_location,
                entity.scanned_at.map(|t| t.to_rfc3339()),
                entity.scanned_by,
            ])?;
        }
        Ok(())
    }

    /// List the expected entities of a session, ordered by entity id.
    pub fn list_expected_entities(&self, session_id: &str) -> Result<Vec<ExpectedEntity>> {
        let sql = format!(
            "SELECT {ENTITY_COLUMNS} FROM expected_entities \
             WHERE session_id = ?1 ORDER BY entity_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let entities = stmt
            .query_map(params![session_id], entity_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    /// Look up an expected entity by entity id or barcode.
    ///
    /// An exact entity id match wins over a barcode match.
    pub fn find_expected_entity(
        &self,
        session_id: &str,
        code: &str,
    ) -> Result<Option<ExpectedEntity>> {
        let sql = format!(
            "SELECT {ENTITY_COLUMNS} FROM expected_entities
             WHERE session_id = ?1 AND (entity_id = ?2 OR barcode = ?2)
             ORDER BY entity_id = ?2 DESC, entity_id
             LIMIT 1"
        );
        let entity = self
            .conn
            .query_row(&sql, params![session_id, code], entity_from_row)
            .optional()?;
        Ok(entity)
    }

    /// Record that an expected entity was scanned.
    pub fn mark_entity_scanned(
        &self,
        session_id: &str,
        entity_id: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE expected_entities SET scanned_at = ?1, scanned_by = ?2
             WHERE session_id = ?3 AND entity_id = ?4",
            params![at.to_rfc3339(), actor, session_id, entity_id],
        )?;
        if changed == 0 {
            return Err(Error::EntityNotExpected {
                session_id: session_id.to_string(),
                code: entity_id.to_string(),
            });
        }
        Ok(())
    }

    // -- Mutation queue --------------------------------------------------

    /// Append a mutation to the queue with `retry_count = 0`.
    pub fn append_mutation(&self, mutation: &NewMutation) -> Result<MutationQueueItem> {
        let payload = serde_json::to_string(&mutation.payload)?;
        self.conn.execute(
            "INSERT INTO mutation_queue
             (operation, entity_kind, entity_id, payload, enqueued_at, retry_count)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                mutation.operation.as_str(),
                mutation.entity_kind.as_str(),
                mutation.entity_id,
                payload,
                mutation.enqueued_at.to_rfc3339(),
            ],
        )?;
        Ok(MutationQueueItem {
            id: self.conn.last_insert_rowid(),
            operation: mutation.operation,
            entity_kind: mutation.entity_kind,
            entity_id: mutation.entity_id.clone(),
            payload: mutation.payload.clone(),
            enqueued_at: mutation.enqueued_at,
            retry_count: 0,
        })
    }

    /// List queued mutations in FIFO (ascending id) order.
    pub fn list_mutations(&self) -> Result<Vec<MutationQueueItem>> {
        let sql = format!("SELECT {QUEUE_COLUMNS} FROM mutation_queue ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map([], mutation_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Get a queued mutation by id.
    pub fn get_mutation(&self, id: i64) -> Result<MutationQueueItem> {
        let sql = format!("SELECT {QUEUE_COLUMNS} FROM mutation_queue WHERE id = ?1");
        let item = self
            .conn
            .query_row(&sql, params![id], mutation_from_row)
            .optional()?;
        item.ok_or(Error::MutationNotFound(id))
    }

    /// Remove a mutation. Returns false if no such item was queued.
    pub fn remove_mutation(&self, id: i64) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM mutation_queue WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// Persist a new retry count for a queued mutation.
    pub fn update_retry_count(&self, id: i64, retry_count: u32) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE mutation_queue SET retry_count = ?1 WHERE id = ?2",
            params![retry_count, id],
        )?;
        if changed == 0 {
            return Err(Error::MutationNotFound(id));
        }
        Ok(())
    }

    /// Count queued mutations.
    pub fn pending_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM mutation_queue", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Delete every queued mutation. Returns how many were removed.
    pub fn clear_queue(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM mutation_queue", [])?;
        Ok(removed)
    }

    // -- Dead letters ----------------------------------------------------

    /// Move a mutation from the queue into the dead-letter table.
    ///
    /// The insert and delete happen in one transaction, so the item is never
    /// in both tables or in neither.
    pub fn dead_letter_mutation(
        &self,
        item: &MutationQueueItem,
        last_error: &str,
    ) -> Result<DroppedMutation> {
        let dropped = DroppedMutation {
            id: item.id,
            operation: item.operation,
            entity_kind: item.entity_kind,
            entity_id: item.entity_id.clone(),
            payload: item.payload.clone(),
            enqueued_at: item.enqueued_at,
            retry_count: item.retry_count,
            last_error: last_error.to_string(),
            dropped_at: Utc::now(),
        };
        let payload = serde_json::to_string(&dropped.payload)?;

        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM mutation_queue WHERE id = ?1", params![item.id])?;
        if removed == 0 {
            return Err(Error::MutationNotFound(item.id));
        }
        tx.execute(
            "INSERT OR REPLACE INTO dropped_mutations
             (id, operation, entity_kind, entity_id, payload, enqueued_at,
              retry_count, last_error, dropped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                dropped.id,
                dropped.operation.as_str(),
                dropped.entity_kind.as_str(),
                dropped.entity_id,
                payload,
                dropped.enqueued_at.to_rfc3339(),
                dropped.retry_count,
                dropped.last_error,
                dropped.dropped_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(dropped)
    }

    /// List dead-lettered mutations in the order they were originally queued.
    pub fn list_dropped(&self) -> Result<Vec<DroppedMutation>> {
        let sql = format!("SELECT {DROPPED_COLUMNS} FROM dropped_mutations ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map([], dropped_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Delete every dead-letter record. Returns how many were removed.
    pub fn clear_dropped(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM dropped_mutations", [])?;
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
