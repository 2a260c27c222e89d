// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Online/offline signal for the sync engine.
//!
//! [`ConnectivityMonitor`] is advisory: the orchestrator consults it before
//! starting a pass and wakes on an offline-to-online transition. A pass that
//! is already running finishes regardless.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::orchestrator::clamp_period;
use super::remote::{RemoteError, RemoteStore};

/// Shared online flag backed by a watch channel.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(initial: bool) -> Self {
        let (tx, _rx) = watch::channel(initial);
        ConnectivityMonitor { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Record the current state. Returns true if it changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(online, "connectivity changed");
        }
        changed
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Ping the remote once and feed the result into `monitor`.
///
/// Returns whether the remote answered within `timeout`.
pub async fn probe_once(
    remote: &dyn RemoteStore,
    monitor: &ConnectivityMonitor,
    timeout: Duration,
) -> bool {
    let result = match tokio::time::timeout(timeout, remote.ping()).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(timeout)),
    };
    let online = match result {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "connectivity probe failed");
            false
        }
    };
    monitor.set_online(online);
    online
}

/// Background task that probes the remote on a fixed period.
pub struct ConnectivityProbe {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ConnectivityProbe {
    /// Start probing immediately, then every `interval`.
    pub fn spawn(
        remote: Arc<dyn RemoteStore>,
        monitor: ConnectivityMonitor,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let interval = clamp_period(interval);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        probe_once(remote.as_ref(), &monitor, timeout).await;
                    }
                }
            }
        });
        ConnectivityProbe {
            cancel,
            task: Some(task),
        }
    }

    /// Stop probing and wait for the task to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ConnectivityProbe {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
