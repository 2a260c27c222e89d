// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! stkrs - offline-first stock-take scanning.
//!
//! This crate provides the core functionality for the `stk` CLI tool. Scans
//! and session status changes are written to a local SQLite mirror and queued,
//! then replayed against a remote store when it is reachable.
//!
//! # Main Components
//!
//! - [`sync::OfflineGateway`] - offline writes over the local mirror
//! - [`sync::SyncOrchestrator`] - single-flight drain passes with a retry budget
//! - [`sync::ConnectivityMonitor`] - online/offline signal and probe
//! - [`sync::RemoteStore`] - the remote boundary, with a WebSocket implementation
//! - [`Config`] - `.stocktake/config.toml`
//!
//! # Usage
//!
//! ```rust,ignore
//! use stkrs::sync::{ConnectivityMonitor, OfflineGateway, SyncOrchestrator, WsRemoteStore};
//!
//! let gateway = OfflineGateway::open(&db_path)?;
//! gateway.record_scan("st-42", "asset-17", "alice", None).await?;
//!
//! let remote = Arc::new(WsRemoteStore::new("ws://hq:7890", Duration::from_secs(2)));
//! let orch = SyncOrchestrator::new(gateway, remote, ConnectivityMonitor::new(true), config);
//! let progress = orch.trigger_manual_sync().await?;
//! ```

mod cli;
pub mod colors;
mod commands;
pub mod config;
pub mod env;
pub mod error;
pub mod help;
pub mod sync;

pub use cli::{Cli, Command, OutputArgs, OutputFormat};
pub use commands::Workspace;
pub use config::{find_work_dir, get_db_path, init_work_dir, Config, RemoteConfig, SyncSettings};
pub use error::{Error, Result};

use clap::CommandFactory;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber.
///
/// The filter comes from `STK_LOG`, then `RUST_LOG`, defaulting to `warn`.
/// `verbose` forces `debug`.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if let Some(directives) = env::log_filter() {
        EnvFilter::new(directives)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Execute a CLI invocation. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
pub fn run(cli: Cli) -> Result<()> {
    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(dispatch(cli.command))
}

async fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Init {
            remote,
            operator,
            path,
        } => commands::init::run(remote, operator, path),
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "stk", &mut std::io::stdout());
            Ok(())
        }
        Command::Download { bundle } => {
            commands::offline::download(&Workspace::locate()?, &bundle).await
        }
        Command::Scan {
            session,
            code,
            actor,
            location,
            output,
        } => {
            let ws = Workspace::locate()?;
            commands::offline::scan(&ws, &session, &code, actor, location, output.output).await
        }
        Command::Status {
            session,
            status,
            reason,
        } => commands::offline::status(&Workspace::locate()?, &session, &status, reason).await,
        Command::Session { session, output } => {
            commands::offline::session(&Workspace::locate()?, &session, output.output).await
        }
        Command::Clear { session } => {
            commands::offline::clear(&Workspace::locate()?, &session).await
        }
        Command::Pending { output } => {
            commands::offline::pending(&Workspace::locate()?, output.output).await
        }
        Command::Sync { output } => {
            commands::sync::sync(&Workspace::locate()?, output.output).await
        }
        Command::Watch => commands::sync::watch(&Workspace::locate()?).await,
        Command::Dropped { clear, output } => {
            commands::offline::dropped(&Workspace::locate()?, clear, output.output).await
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
