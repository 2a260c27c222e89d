// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline write path over the local mirror.
//!
//! Every write the scanner performs lands here first: it updates the cached
//! session snapshot and appends a queue item in the same transaction. Nothing
//! here talks to the remote store.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use stk_core::{
    DroppedMutation, EntityKind, Error, ExpectedEntity, LocalMirrorStore, MutationOp,
    MutationQueueItem, NewMutation, Result, ScanPayload, SessionMutationPayload, SessionSnapshot,
    SessionStatus,
};
use tokio::sync::Mutex;
use tracing::debug;

/// Result of recording a scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// The entity was marked scanned and a mutation queued.
    Recorded {
        entity: ExpectedEntity,
        mutation: MutationQueueItem,
    },
    /// The entity had already been scanned; nothing was queued.
    AlreadyScanned(ExpectedEntity),
}

/// Cloneable handle to the local mirror. Every call is a suspension point.
#[derive(Clone)]
pub struct OfflineGateway {
    store: Arc<Mutex<LocalMirrorStore>>,
}

impl OfflineGateway {
    pub fn new(store: LocalMirrorStore) -> Self {
        OfflineGateway {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Open the mirror database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(LocalMirrorStore::open(path)?))
    }

    /// Cache a session and its expected entities for offline use.
    ///
    /// Idempotent: replaces any existing snapshot and entity cache. The queue
    /// is left untouched.
    pub async fn download_for_offline(
        &self,
        session: &SessionSnapshot,
        expected: &[ExpectedEntity],
    ) -> Result<()> {
        self.store.lock().await.download_session(session, expected)?;
        debug!(session_id = %session.id, entities = expected.len(), "downloaded for offline");
        Ok(())
    }

    /// Append a raw mutation with `retry_count = 0` and `enqueued_at = now`.
    pub async fn queue_mutation(
        &self,
        operation: MutationOp,
        entity_kind: EntityKind,
        entity_id: &str,
        payload: serde_json::Value,
    ) -> Result<MutationQueueItem> {
        let mutation = NewMutation::new(operation, entity_kind, entity_id, payload);
        let item = self.store.lock().await.append_mutation(&mutation)?;
        debug!(id = item.id, %operation, %entity_kind, entity_id, "queued mutation");
        Ok(item)
    }

    /// Validate a scan against the cached session and queue it.
    ///
    /// `code` may be an entity id or a barcode.
    pub async fn record_scan(
        &self,
        session_id: &str,
        code: &str,
        actor: &str,
        location: Option<String>,
    ) -> Result<ScanOutcome> {
        let store = self.store.lock().await;
        let session = store.get_session(session_id)?;
        if session.status.is_terminal() {
            return Err(Error::InvalidInput(format!(
                "session {session_id} is {}; no further scans are accepted",
                session.status
            )));
        }

        let mut entity = store
            .find_expected_entity(session_id, code)?
            .ok_or_else(|| Error::EntityNotExpected {
                session_id: session_id.to_string(),
                code: code.to_string(),
            })?;
        if entity.is_scanned() {
            return Ok(ScanOutcome::AlreadyScanned(entity));
        }

        let now = Utc::now();
        let payload = ScanPayload {
            session_id: session_id.to_string(),
            entity_id: entity.entity_id.clone(),
            actor: actor.to_string(),
            location,
            scanned_at: now,
        };
        let new_mutation = NewMutation::scan(MutationOp::Create, &payload)?;

        let tx = store.conn.unchecked_transaction()?;
        store.mark_entity_scanned(session_id, &entity.entity_id, actor, now)?;
        let mutation = store.append_mutation(&new_mutation)?;
        tx.commit()?;

        entity.scanned_at = Some(now);
        entity.scanned_by = Some(actor.to_string());
        debug!(session_id, entity_id = %entity.entity_id, id = mutation.id, "recorded scan");
        Ok(ScanOutcome::Recorded { entity, mutation })
    }

    /// Change a cached session's status and queue the change.
    pub async fn change_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        reason: Option<String>,
    ) -> Result<MutationQueueItem> {
        let store = self.store.lock().await;
        store.get_session(session_id)?;

        let now = Utc::now();
        let payload = SessionMutationPayload {
            session_id: session_id.to_string(),
            status,
            reason,
            changed_at: now,
        };
        let new_mutation = NewMutation::session(MutationOp::Update, &payload)?;

        let tx = store.conn.unchecked_transaction()?;
        store.update_session_status(session_id, status, now)?;
        let mutation = store.append_mutation(&new_mutation)?;
        tx.commit()?;

        debug!(session_id, %status, id = mutation.id, "queued status change");
        Ok(mutation)
    }

    /// Drop a cached session. Queued mutations are kept.
    pub async fn clear_session(&self, session_id: &str) -> Result<bool> {
        self.store.lock().await.clear_session(session_id)
    }

    pub async fn session(&self, session_id: &str) -> Result<SessionSnapshot> {
        self.store.lock().await.get_session(session_id)
    }

    pub async fn sessions(&self) -> Result<Vec<SessionSnapshot>> {
        self.store.lock().await.list_sessions()
    }

    pub async fn expected_entities(&self, session_id: &str) -> Result<Vec<ExpectedEntity>> {
        self.store.lock().await.list_expected_entities(session_id)
    }

    pub async fn pending_count(&self) -> Result<usize> {
        self.store.lock().await.pending_count()
    }

    /// Queued mutations in FIFO order.
    pub async fn list_pending(&self) -> Result<Vec<MutationQueueItem>> {
        self.store.lock().await.list_mutations()
    }

    pub async fn remove(&self, id: i64) -> Result<bool> {
        self.store.lock().await.remove_mutation(id)
    }

    pub async fn update_retry_count(&self, id: i64, retry_count: u32) -> Result<()> {
        self.store.lock().await.update_retry_count(id, retry_count)
    }

    pub async fn clear_queue(&self) -> Result<usize> {
        self.store.lock().await.clear_queue()
    }

    /// Move `item` out of the queue into the dead-letter table.
    pub async fn dead_letter(
        &self,
        item: &MutationQueueItem,
        last_error: &str,
    ) -> Result<DroppedMutation> {
        self.store.lock().await.dead_letter_mutation(item, last_error)
    }

    pub async fn dropped(&self) -> Result<Vec<DroppedMutation>> {
        self.store.lock().await.list_dropped()
    }

    pub async fn clear_dropped(&self) -> Result<usize> {
        self.store.lock().await.clear_dropped()
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
