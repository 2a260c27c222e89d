// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared server state.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use stk_core::{MutationOp, RemoteMutation};

use crate::db::RemoteDb;
use crate::error::{Error, Result};

/// Database file created under the data directory.
pub const DB_FILE: &str = "remote.db";

/// State shared by every connection.
#[derive(Clone)]
pub struct ServerState {
    db: Arc<Mutex<RemoteDb>>,
}

impl ServerState {
    /// Open (or create) the database under `data_dir`.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let db = RemoteDb::open(&data_dir.join(DB_FILE))?;
        Ok(ServerState {
            db: Arc::new(Mutex::new(db)),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Ok(ServerState {
            db: Arc::new(Mutex::new(RemoteDb::open_in_memory()?)),
        })
    }

    /// Apply a mutation. Returns false when it changed nothing.
    pub async fn apply(&self, mutation: &RemoteMutation) -> Result<bool> {
        validate(mutation)?;
        let db = self.db.lock().await;
        let applied = match mutation {
            RemoteMutation::Scan {
                operation: MutationOp::Delete,
                scan,
            } => db.delete_scan(&scan.session_id, &scan.entity_id)?,
            RemoteMutation::Scan { scan, .. } => db.upsert_scan(scan)?,
            RemoteMutation::SessionMutation {
                operation: MutationOp::Delete,
                mutation,
            } => db.delete_session(&mutation.session_id)?,
            RemoteMutation::SessionMutation { mutation, .. } => db.upsert_session(mutation)?,
        };
        debug!(
            kind = %mutation.entity_kind(),
            operation = %mutation.operation(),
            entity_id = mutation.entity_id(),
            applied,
            "applied mutation"
        );
        Ok(applied)
    }

    #[cfg(test)]
    pub async fn db(&self) -> tokio::sync::MutexGuard<'_, RemoteDb> {
        self.db.lock().await
    }
}

fn validate(mutation: &RemoteMutation) -> Result<()> {
    if let RemoteMutation::Scan { scan, .. } = mutation {
        if scan.session_id.trim().is_empty() {
            return Err(Error::InvalidMutation("session_id is empty".into()));
        }
    }
    if mutation.entity_id().trim().is_empty() {
        return Err(Error::InvalidMutation("entity_id is empty".into()));
    }
    Ok(())
}
