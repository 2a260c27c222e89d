// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The authoritative backend that queued mutations are replayed against.
//!
//! # Redelivery
//!
//! The orchestrator retries a failed call up to its retry budget and does no
//! other deduplication. A call that timed out locally may still have been
//! applied remotely, so every [`RemoteStore`] implementation MUST be an
//! upsert: scans keyed by `(session_id, entity_id)`, session mutations keyed
//! by `session_id`. Applying the same mutation twice must leave the same
//! state as applying it once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use stk_core::protocol::{ClientMessage, RemoteMutation, ServerMessage};
use stk_core::{MutationOp, ScanPayload, SessionMutationPayload};
use tokio::sync::Mutex;
use tracing::debug;

use super::transport::{BoxFuture, Transport, TransportError, WebSocketTransport};

/// Failure of a single remote call. Always transient from the queue's view.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("remote rejected mutation: {0}")]
    Rejected(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("connection closed by remote")]
    ConnectionClosed,
}

/// Result type for remote calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote operations the sync engine replays mutations through.
pub trait RemoteStore: Send + Sync {
    /// Apply a scan. Must upsert keyed by `(session_id, entity_id)`.
    fn apply_scan(&self, op: MutationOp, scan: ScanPayload) -> BoxFuture<'_, RemoteResult<()>>;

    /// Apply a session status change. Must upsert keyed by `session_id`.
    fn apply_session_mutation(
        &self,
        op: MutationOp,
        mutation: SessionMutationPayload,
    ) -> BoxFuture<'_, RemoteResult<()>>;

    /// Cheap reachability check.
    fn ping(&self) -> BoxFuture<'_, RemoteResult<()>>;
}

/// [`RemoteStore`] speaking the stk protocol over a [`Transport`].
///
/// Connects lazily on the first call and reconnects after a failure. Calls
/// are serialized; each request carries a fresh id and replies with any other
/// id are discarded as stale.
pub struct WsRemoteStore<T: Transport = WebSocketTransport> {
    url: String,
    connect_timeout: Duration,
    transport: Mutex<T>,
    next_id: AtomicU64,
}

impl WsRemoteStore<WebSocketTransport> {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self::with_transport(url, connect_timeout, WebSocketTransport::new())
    }
}

impl<T: Transport> WsRemoteStore<T> {
    /// Create a store over a custom transport (for testing).
    pub fn with_transport(url: impl Into<String>, connect_timeout: Duration, transport: T) -> Self {
        WsRemoteStore {
            url: url.into(),
            connect_timeout,
            transport: Mutex::new(transport),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Send `msg` and wait for the reply carrying `request_id`.
    async fn round_trip(&self, request_id: u64, msg: ClientMessage) -> RemoteResult<ServerMessage> {
        let mut transport = self.transport.lock().await;

        if !transport.is_connected() {
            debug!(url = %self.url, "connecting to remote");
            match tokio::time::timeout(self.connect_timeout, transport.connect(&self.url)).await {
                Ok(result) => result?,
                Err(_) => return Err(RemoteError::Timeout(self.connect_timeout)),
            }
        }

        if let Err(e) = transport.send(msg).await {
            let _ = transport.disconnect().await;
            return Err(e.into());
        }

        loop {
            match transport.recv().await {
                Ok(Some(ServerMessage::Error { message })) => {
                    return Err(RemoteError::UnexpectedResponse(message));
                }
                Ok(Some(reply)) if reply.request_id() == Some(request_id) => return Ok(reply),
                Ok(Some(stale)) => {
                    debug!(request_id, stale = ?stale.request_id(), "discarding stale reply");
                }
                Ok(None) => return Err(RemoteError::ConnectionClosed),
                Err(e) => {
                    let _ = transport.disconnect().await;
                    return Err(e.into());
                }
            }
        }
    }

    async fn apply(&self, mutation: RemoteMutation) -> RemoteResult<()> {
        let request_id = self.next_request_id();
        let entity_id = mutation.entity_id().to_string();
        let reply = self
            .round_trip(request_id, ClientMessage::apply(request_id, mutation))
            .await?;

        match reply {
            ServerMessage::Ack { applied, .. } => {
                debug!(request_id, entity_id, applied, "remote acknowledged");
                Ok(())
            }
            ServerMessage::Rejected { message, .. } => Err(RemoteError::Rejected(message)),
            other => Err(RemoteError::UnexpectedResponse(format!("{other:?}"))),
        }
    }
}

impl<T: Transport> RemoteStore for WsRemoteStore<T> {
    fn apply_scan(&self, op: MutationOp, scan: ScanPayload) -> BoxFuture<'_, RemoteResult<()>> {
        Box::pin(self.apply(RemoteMutation::Scan {
            operation: op,
            scan,
        }))
    }

    fn apply_session_mutation(
        &self,
        op: MutationOp,
        mutation: SessionMutationPayload,
    ) -> BoxFuture<'_, RemoteResult<()>> {
        Box::pin(self.apply(RemoteMutation::SessionMutation {
            operation: op,
            mutation,
        }))
    }

    fn ping(&self) -> BoxFuture<'_, RemoteResult<()>> {
        Box::pin(async move {
            let id = self.next_request_id();
            match self.round_trip(id, ClientMessage::ping(id)).await? {
                ServerMessage::Pong { .. } => Ok(()),
                other => Err(RemoteError::UnexpectedResponse(format!("{other:?}"))),
            }
        })
    }
}
