// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Authoritative SQLite store.
//!
//! Every write is an upsert or delete keyed by `(session_id, entity_id)` for
//! scans and by `session_id` for sessions, so replaying a mutation any
//! number of times converges on the same rows. Each write reports whether it
//! changed anything; an unchanged write is a redelivery.

use std::path::Path;

use rusqlite::{params, Connection};
use stk_core::{ScanPayload, SessionMutationPayload};

use crate::error::Result;

/// SQL schema for the remote database.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS scans (
    session_id TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    actor TEXT NOT NULL,
    location TEXT,
    scanned_at TEXT NOT NULL,
    PRIMARY KEY (session_id, entity_id)
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    reason TEXT,
    changed_at TEXT NOT NULL
);
"#;

pub struct RemoteDb {
    conn: Connection,
}

impl RemoteDb {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(RemoteDb { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(RemoteDb { conn })
    }

    /// Insert or update a scan. Returns false if the row already matched.
    pub fn upsert_scan(&self, scan: &ScanPayload) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT INTO scans (session_id, entity_id, actor, location, scanned_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(session_id, entity_id) DO UPDATE SET
                 actor = excluded.actor,
                 location = excluded.location,
                 scanned_at = excluded.scanned_at
             WHERE actor IS NOT excluded.actor
                OR location IS NOT excluded.location
                OR scanned_at IS NOT excluded.scanned_at",
            params![
                scan.session_id,
                scan.entity_id,
                scan.actor,
                scan.location,
                scan.scanned_at.to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    /// Delete a scan. Returns false if there was nothing to delete.
    pub fn delete_scan(&self, session_id: &str, entity_id: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM scans WHERE session_id = ?1 AND entity_id = ?2",
            params![session_id, entity_id],
        )?;
        Ok(changed > 0)
    }

    /// Insert or update a session's status. Returns false if the row already matched.
    pub fn upsert_session(&self, mutation: &SessionMutationPayload) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT INTO sessions (session_id, status, reason, changed_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(session_id) DO UPDATE SET
                 status = excluded.status,
                 reason = excluded.reason,
                 changed_at = excluded.changed_at
             WHERE status IS NOT excluded.status
                OR reason IS NOT excluded.reason
                OR changed_at IS NOT excluded.changed_at",
            params![
                mutation.session_id,
                mutation.status.as_str(),
                mutation.reason,
                mutation.changed_at.to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_session(&self, session_id: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM sessions WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
impl RemoteDb {
    pub fn scan_count(&self, session_id: &str) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM scans WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?)
    }

    pub fn scan_actor(&self, session_id: &str, entity_id: &str) -> Result<Option<String>> {
        use rusqlite::OptionalExtension;
        Ok(self
            .conn
            .query_row(
                "SELECT actor FROM scans WHERE session_id = ?1 AND entity_id = ?2",
                params![session_id, entity_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn session_status(&self, session_id: &str) -> Result<Option<String>> {
        use rusqlite::OptionalExtension;
        Ok(self
            .conn
            .query_row(
                "SELECT status FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?)
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
