// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use stk_core::{
    ExpectedEntity, LocalMirrorStore, MutationOp, ScanPayload, SessionMutationPayload,
    SessionSnapshot, SessionStatus,
};

use super::gateway::OfflineGateway;
use super::remote::{RemoteError, RemoteResult, RemoteStore};
use super::transport::BoxFuture;

pub const SESSION: &str = "st-1";

pub fn scan_payload(session_id: &str, entity_id: &str) -> ScanPayload {
    ScanPayload {
        session_id: session_id.to_string(),
        entity_id: entity_id.to_string(),
        actor: "tester".to_string(),
        location: None,
        scanned_at: Utc::now(),
    }
}

pub fn session_payload(session_id: &str, status: SessionStatus) -> SessionMutationPayload {
    SessionMutationPayload {
        session_id: session_id.to_string(),
        status,
        reason: None,
        changed_at: Utc::now(),
    }
}

/// An in-memory gateway holding session `st-1` with assets `asset-1`..`asset-3`.
///
/// `asset-1` carries barcode `BC-1`.
pub async fn gateway_with_session() -> OfflineGateway {
    let gateway = OfflineGateway::new(LocalMirrorStore::open_in_memory().unwrap());
    let session = SessionSnapshot::new(SESSION, "Warehouse A", Utc::now());
    let expected: Vec<ExpectedEntity> = (1..=3)
        .map(|n| {
            let mut entity =
                ExpectedEntity::new(SESSION, format!("asset-{n}"), format!("Asset {n}"));
            if n == 1 {
                entity.barcode = Some("BC-1".to_string());
            }
            entity
        })
        .collect();
    gateway
        .download_for_offline(&session, &expected)
        .await
        .unwrap();
    gateway
}

/// A remote call as observed by [`MockRemoteStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Scan(MutationOp, ScanPayload),
    Session(MutationOp, SessionMutationPayload),
    Ping,
}

impl RemoteCall {
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            RemoteCall::Scan(_, scan) => Some(&scan.entity_id),
            RemoteCall::Session(_, mutation) => Some(&mutation.session_id),
            RemoteCall::Ping => None,
        }
    }
}

/// Scriptable [`RemoteStore`] with a call log.
#[derive(Default)]
pub struct MockRemoteStore {
    calls: Mutex<Vec<RemoteCall>>,
    /// Every apply fails while set.
    fail_all: AtomicBool,
    /// The next N applies fail.
    fail_next: AtomicUsize,
    /// Applies for these entity ids always fail.
    fail_entities: Mutex<HashSet<String>>,
    /// Pings fail while set.
    unreachable: AtomicBool,
    delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    pub fn fail_entity(&self, entity_id: &str) {
        self.fail_entities
            .lock()
            .unwrap()
            .insert(entity_id.to_string());
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Every call sleeps this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Apply calls only, in order.
    pub fn applied_entities(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|c| c.entity_id().map(str::to_string))
            .collect()
    }

    /// Highest number of calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn should_fail(&self, entity_id: &str) -> bool {
        if self.fail_all.load(Ordering::SeqCst) {
            return true;
        }
        if self.fail_entities.lock().unwrap().contains(entity_id) {
            return true;
        }
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn call(&self, call: RemoteCall) -> RemoteResult<()> {
        let entity_id = call.entity_id().map(str::to_string);
        self.calls.lock().unwrap().push(call);

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match entity_id {
            Some(id) if self.should_fail(&id) => {
                Err(RemoteError::Rejected(format!("scripted failure for {id}")))
            }
            Some(_) => Ok(()),
            None if self.unreachable.load(Ordering::SeqCst) => Err(RemoteError::ConnectionClosed),
            None => Ok(()),
        }
    }
}

impl RemoteStore for MockRemoteStore {
    fn apply_scan(&self, op: MutationOp, scan: ScanPayload) -> BoxFuture<'_, RemoteResult<()>> {
        Box::pin(self.call(RemoteCall::Scan(op, scan)))
    }

    fn apply_session_mutation(
        &self,
        op: MutationOp,
        mutation: SessionMutationPayload,
    ) -> BoxFuture<'_, RemoteResult<()>> {
        Box::pin(self.call(RemoteCall::Session(op, mutation)))
    }

    fn ping(&self) -> BoxFuture<'_, RemoteResult<()>> {
        Box::pin(self.call(RemoteCall::Ping))
    }
}
