// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Drains the offline mutation queue into the remote store.
//!
//! A drain pass snapshots the queue, replays each item in FIFO order and
//! records the outcome:
//!
//! - success removes the item
//! - failure bumps `retry_count`; at `max_retries` the item moves to the
//!   dead-letter table and is reported in [`SyncProgress::dropped`]
//!
//! At most one pass runs at a time. Passes start manually
//! ([`SyncOrchestrator::trigger_manual_sync`]), on a timer, or when
//! connectivity comes back ([`SyncOrchestrator::start_auto_sync`]).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::Serialize;
use stk_core::{
    DroppedMutation, EntityKind, MutationQueueItem, ScanPayload, SessionMutationPayload,
};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connectivity::ConnectivityMonitor;
use super::gateway::OfflineGateway;
use super::remote::{RemoteError, RemoteResult, RemoteStore};

/// Default retry budget per mutation.
pub const MAX_RETRIES: u32 = 3;

const EVENT_CAPACITY: usize = 256;

/// Runtime settings for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Auto-sync timer period.
    pub interval: Duration,
    /// Failed attempts allowed before a mutation is dropped.
    pub max_retries: u32,
    /// Upper bound on a single remote call.
    pub remote_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            interval: Duration::from_secs(30),
            max_retries: MAX_RETRIES,
            remote_timeout: Duration::from_secs(10),
        }
    }
}

/// Error type for drain requests.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("a sync pass is already running")]
    ConcurrentSyncRejected,

    #[error("cannot sync while offline")]
    OfflineRejected,

    #[error("local store error during sync: {0}")]
    Store(#[from] stk_core::Error),
}

/// Result type for drain requests.
pub type SyncResult<T> = Result<T, SyncError>;

/// Counters for the current or most recent pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncProgress {
    /// Items in the pass snapshot.
    pub total: usize,
    /// Items applied and removed.
    pub completed: usize,
    /// Failed attempts, including those that led to a drop.
    pub failed: usize,
    pub is_syncing: bool,
    /// Items that exhausted their retry budget during this pass.
    pub dropped: Vec<DroppedMutation>,
}

/// Notifications published while passes run.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    PassStarted {
        total: usize,
    },
    MutationApplied {
        id: i64,
    },
    MutationRetrying {
        id: i64,
        retry_count: u32,
        error: String,
    },
    MutationDropped(DroppedMutation),
    PassCompleted(SyncProgress),
}

/// Holds the draining flag for the lifetime of a pass.
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard { flag })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Timer,
    Reconnect,
}

struct AutoSync {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Inner {
    gateway: OfflineGateway,
    remote: Arc<dyn RemoteStore>,
    connectivity: ConnectivityMonitor,
    config: SyncConfig,
    draining: AtomicBool,
    progress: Mutex<SyncProgress>,
    events: broadcast::Sender<SyncEvent>,
    auto_sync: Mutex<Option<AutoSync>>,
}

/// Cloneable handle to a single sync engine instance.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

impl SyncOrchestrator {
    pub fn new(
        gateway: OfflineGateway,
        remote: Arc<dyn RemoteStore>,
        connectivity: ConnectivityMonitor,
        config: SyncConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        SyncOrchestrator {
            inner: Arc::new(Inner {
                gateway,
                remote,
                connectivity,
                config,
                draining: AtomicBool::new(false),
                progress: Mutex::new(SyncProgress::default()),
                events,
                auto_sync: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Run one drain pass.
    ///
    /// Fails fast with [`SyncError::ConcurrentSyncRejected`] if a pass is
    /// running, or [`SyncError::OfflineRejected`] if connectivity is down.
    pub async fn drain(&self) -> SyncResult<SyncProgress> {
        self.inner.drain().await
    }

    /// Drain now, on request. Same guards as [`Self::drain`].
    pub async fn trigger_manual_sync(&self) -> SyncResult<SyncProgress> {
        info!("manual sync requested");
        self.inner.drain().await
    }

    /// Snapshot of the current or last pass.
    pub fn get_sync_progress(&self) -> SyncProgress {
        let mut progress = lock(&self.inner.progress).clone();
        progress.is_syncing = self.inner.draining.load(Ordering::Acquire);
        progress
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.draining.load(Ordering::Acquire)
    }

    pub async fn has_pending_sync(&self) -> SyncResult<bool> {
        Ok(self.inner.gateway.pending_count().await? > 0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    /// Start timer and reconnect driven passes. A no-op if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_auto_sync(&self) {
        let mut slot = lock(&self.inner.auto_sync);
        if slot.as_ref().is_some_and(|a| !a.task.is_finished()) {
            return;
        }

        let cancel = CancellationToken::new();
        let online = self.inner.connectivity.subscribe();
        // Read before spawning so a transition that lands before the task
        // first runs still counts as a reconnect.
        let was_online = *online.borrow();
        let interval = clamp_period(self.inner.config.interval);
        let task = tokio::spawn(auto_sync_loop(
            Arc::downgrade(&self.inner),
            cancel.clone(),
            online,
            was_online,
            interval,
        ));
        *slot = Some(AutoSync { cancel, task });
        info!(?interval, "auto-sync started");
    }

    /// Stop scheduling passes. A pass already in flight runs to completion.
    pub fn stop_auto_sync(&self) {
        if let Some(auto) = lock(&self.inner.auto_sync).take() {
            auto.cancel.cancel();
            info!("auto-sync stopped");
        }
    }

    pub fn is_auto_sync_running(&self) -> bool {
        lock(&self.inner.auto_sync)
            .as_ref()
            .is_some_and(|a| !a.task.is_finished())
    }
}

/// Shortest timer period a background task will run with.
pub(crate) const MIN_PERIOD: Duration = Duration::from_millis(100);

/// `tokio::time::interval` panics on a zero period.
pub(crate) fn clamp_period(period: Duration) -> Duration {
    if period < MIN_PERIOD {
        warn!(?period, min = ?MIN_PERIOD, "timer period too short, using minimum");
        MIN_PERIOD
    } else {
        period
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Inner {
    async fn drain(&self) -> SyncResult<SyncProgress> {
        let _guard =
            DrainGuard::acquire(&self.draining).ok_or(SyncError::ConcurrentSyncRejected)?;
        if !self.connectivity.is_online() {
            return Err(SyncError::OfflineRejected);
        }

        let snapshot = self.gateway.list_pending().await?;
        let mut progress = SyncProgress {
            total: snapshot.len(),
            is_syncing: true,
            ..SyncProgress::default()
        };
        self.publish(&progress);
        self.emit(SyncEvent::PassStarted {
            total: progress.total,
        });
        debug!(total = progress.total, "sync pass started");

        for item in snapshot {
            match self.apply(&item).await {
                Ok(()) => {
                    self.gateway.remove(item.id).await?;
                    progress.completed += 1;
                    debug!(id = item.id, entity_id = %item.entity_id, "mutation applied");
                    self.emit(SyncEvent::MutationApplied { id: item.id });
                }
                Err(e) => {
                    progress.failed += 1;
                    self.record_failure(item, e, &mut progress).await?;
                }
            }
            self.publish(&progress);
        }

        progress.is_syncing = false;
        self.publish(&progress);
        info!(
            total = progress.total,
            completed = progress.completed,
            failed = progress.failed,
            dropped = progress.dropped.len(),
            "sync pass finished"
        );
        self.emit(SyncEvent::PassCompleted(progress.clone()));
        Ok(progress)
    }

    async fn record_failure(
        &self,
        mut item: MutationQueueItem,
        error: RemoteError,
        progress: &mut SyncProgress,
    ) -> SyncResult<()> {
        let message = error.to_string();
        item.retry_count = item.retry_count.saturating_add(1);

        if item.retry_count >= self.config.max_retries {
            let dropped = match self.gateway.dead_letter(&item, &message).await {
                Ok(dropped) => dropped,
                Err(stk_core::Error::MutationNotFound(id)) => {
                    debug!(id, "mutation left the queue during the pass");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            warn!(
                id = dropped.id,
                entity_kind = %dropped.entity_kind,
                entity_id = %dropped.entity_id,
                retries = dropped.retry_count,
                error = %message,
                "dropping mutation after exhausting retries"
            );
            progress.dropped.push(dropped.clone());
            self.emit(SyncEvent::MutationDropped(dropped));
        } else {
            match self
                .gateway
                .update_retry_count(item.id, item.retry_count)
                .await
            {
                Ok(()) => {}
                Err(stk_core::Error::MutationNotFound(id)) => {
                    debug!(id, "mutation left the queue during the pass");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
            debug!(
                id = item.id,
                retry_count = item.retry_count,
                error = %message,
                "mutation will be retried"
            );
            self.emit(SyncEvent::MutationRetrying {
                id: item.id,
                retry_count: item.retry_count,
                error: message,
            });
        }
        Ok(())
    }

    async fn apply(&self, item: &MutationQueueItem) -> RemoteResult<()> {
        let call = match item.entity_kind {
            EntityKind::Scan => {
                let scan: ScanPayload = decode(item)?;
                self.remote.apply_scan(item.operation, scan)
            }
            EntityKind::SessionMutation => {
                let mutation: SessionMutationPayload = decode(item)?;
                self.remote.apply_session_mutation(item.operation, mutation)
            }
        };

        let limit = self.config.remote_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(limit)),
        }
    }

    fn publish(&self, progress: &SyncProgress) {
        *lock(&self.progress) = progress.clone();
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn run_scheduled(&self, trigger: Trigger) {
        if !self.connectivity.is_online() || self.draining.load(Ordering::Acquire) {
            return;
        }
        if trigger == Trigger::Reconnect {
            match self.gateway.pending_count().await {
                Ok(0) => return,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "failed to count pending mutations");
                    return;
                }
            }
        }

        match self.drain().await {
            Ok(_) => {}
            Err(SyncError::ConcurrentSyncRejected | SyncError::OfflineRejected) => {
                debug!(?trigger, "scheduled sync skipped");
            }
            Err(e) => warn!(?trigger, error = %e, "scheduled sync failed"),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(auto) = lock(&self.auto_sync).take() {
            auto.cancel.cancel();
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(item: &MutationQueueItem) -> RemoteResult<T> {
    serde_json::from_value(item.payload.clone())
        .map_err(|e| RemoteError::InvalidPayload(format!("{} {}: {e}", item.entity_kind, item.id)))
}

async fn auto_sync_loop(
    inner: Weak<Inner>,
    cancel: CancellationToken,
    mut online: watch::Receiver<bool>,
    mut was_online: bool,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut watching = true;

    loop {
        let trigger = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => Trigger::Timer,
            changed = online.changed(), if watching => {
                if changed.is_err() {
                    watching = false;
                    continue;
                }
                let now_online = *online.borrow_and_update();
                let reconnected = now_online && !was_online;
                was_online = now_online;
                if !reconnected {
                    continue;
                }
                Trigger::Reconnect
            }
        };

        // The pass runs here rather than inside select! so cancellation
        // never interrupts it.
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.run_scheduled(trigger).await;
    }
    debug!("auto-sync loop exited");
}
