// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Commands that talk to the remote store.

use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use super::offline::format_dropped;
use super::{print_json, Workspace};
use crate::cli::OutputFormat;
use crate::colors;
use crate::error::Result;
use crate::sync::{
    probe_once, ConnectivityMonitor, ConnectivityProbe, RemoteStore, SyncEvent, SyncOrchestrator,
    SyncProgress,
};

pub async fn sync(ws: &Workspace, output: OutputFormat) -> Result<()> {
    let remote = ws.remote_store()?;
    let progress = sync_once(ws, remote).await?;
    let pending = ws.gateway.pending_count().await?;

    match output {
        OutputFormat::Json => print_json(&json!({
            "progress": progress,
            "pending": pending,
        }))?,
        OutputFormat::Text => println!("{}", format_progress(&progress, pending)),
    }
    Ok(())
}

/// Probe the remote, then run one manual pass.
pub(crate) async fn sync_once(
    ws: &Workspace,
    remote: Arc<dyn RemoteStore>,
) -> Result<SyncProgress> {
    let config = ws.config.sync_config();
    let monitor = ConnectivityMonitor::new(false);
    probe_once(remote.as_ref(), &monitor, config.remote_timeout).await;

    let orch = SyncOrchestrator::new(ws.gateway.clone(), remote, monitor, config);
    Ok(orch.trigger_manual_sync().await?)
}

pub(crate) fn format_progress(progress: &SyncProgress, pending: usize) -> String {
    let mut lines = vec![format!(
        "Synced {}/{} mutations",
        progress.completed, progress.total
    )];
    let retrying = progress.failed.saturating_sub(progress.dropped.len());
    if retrying > 0 {
        lines.push(format!("{} failed, will retry", retrying));
    }
    if !progress.dropped.is_empty() {
        lines.push(colors::alert(&format!(
            "Dropped {} after exhausting retries:",
            progress.dropped.len()
        )));
        for dropped in &progress.dropped {
            lines.push(format!("  {}", format_dropped(dropped)));
        }
    }
    lines.push(format!("Pending: {}", pending));
    lines.join("\n")
}

pub async fn watch(ws: &Workspace) -> Result<()> {
    let remote = ws.remote_store()?;
    println!("Watching for connectivity (Ctrl-C to stop)");
    watch_until(ws, remote, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
        }
    })
    .await
}

/// Probe and auto-sync in the foreground until `shutdown` resolves.
pub(crate) async fn watch_until(
    ws: &Workspace,
    remote: Arc<dyn RemoteStore>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let config = ws.config.sync_config();
    let monitor = ConnectivityMonitor::new(false);
    let mut online = monitor.subscribe();
    let orch = SyncOrchestrator::new(
        ws.gateway.clone(),
        Arc::clone(&remote),
        monitor.clone(),
        config.clone(),
    );
    let mut events = orch.subscribe();

    orch.start_auto_sync();
    let probe = ConnectivityProbe::spawn(
        remote,
        monitor,
        ws.config.probe_interval(),
        config.remote_timeout,
    );

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = online.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = if *online.borrow_and_update() {
                    colors::ok("online")
                } else {
                    colors::alert("offline")
                };
                println!("Remote is {}", state);
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(line) = describe_event(&event) {
                        println!("{}", line);
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "missed sync events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    orch.stop_auto_sync();
    probe.stop().await;
    Ok(())
}

/// One line for the events `watch` reports; `None` for the rest.
pub(crate) fn describe_event(event: &SyncEvent) -> Option<String> {
    match event {
        SyncEvent::PassCompleted(progress) if progress.total > 0 => Some(format!(
            "Synced {}/{} mutations",
            progress.completed, progress.total
        )),
        SyncEvent::MutationDropped(dropped) => Some(format_dropped(dropped)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
