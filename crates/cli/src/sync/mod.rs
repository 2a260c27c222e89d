// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline mutation queue and sync engine.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐  append   ┌──────────────────┐
//! │ OfflineGateway │─────────► │ LocalMirrorStore │
//! └────────────────┘           └──────────────────┘
//!                                 ▲ list / remove / retry / dead-letter
//!                                 │
//! ┌────────────────┐  online?  ┌──────────────────┐  apply  ┌─────────────┐
//! │  Connectivity  │─────────► │       Sync       │───────► │ RemoteStore │
//! │    Monitor     │           │   Orchestrator   │         │ (WebSocket) │
//! └────────────────┘           └──────────────────┘         └─────────────┘
//! ```
//!
//! # Features
//!
//! - Durable FIFO queue in the local SQLite mirror
//! - Single-flight drain passes with a per-mutation retry budget
//! - Dead-letter table for mutations that exhaust their retries
//! - Timer, reconnect and manual triggers
//! - Injectable remote store and transport for testing

mod connectivity;
mod gateway;
mod orchestrator;
mod remote;
mod transport;

pub use connectivity::{probe_once, ConnectivityMonitor, ConnectivityProbe};
pub use gateway::{OfflineGateway, ScanOutcome};
pub use orchestrator::{
    SyncConfig, SyncError, SyncEvent, SyncOrchestrator, SyncProgress, SyncResult, MAX_RETRIES,
};
pub use remote::{RemoteError, RemoteResult, RemoteStore, WsRemoteStore};
pub use transport::{BoxFuture, Transport, TransportError, TransportResult, WebSocketTransport};

#[cfg(test)]
pub(crate) mod test_helpers;

#[cfg(test)]
mod connectivity_tests;
