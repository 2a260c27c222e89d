// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages between the scanner and the remote store.
//!
//! The protocol is request/response:
//! - Client sends one `Apply` per queued mutation, or a `Ping`
//! - Server answers each request with `Ack`/`Rejected` or `Pong`, echoing its id

use serde::{Deserialize, Serialize};

use crate::mutation::{EntityKind, MutationOp, ScanPayload, SessionMutationPayload};

/// A mutation as delivered to the remote store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteMutation {
    /// Apply a scan. The remote upserts keyed by `(session_id, entity_id)`.
    Scan {
        operation: MutationOp,
        scan: ScanPayload,
    },
    /// Apply a session status change. The remote upserts keyed by `session_id`.
    SessionMutation {
        operation: MutationOp,
        mutation: SessionMutationPayload,
    },
}

impl RemoteMutation {
    /// Returns the queue entity kind this mutation replays.
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            RemoteMutation::Scan { .. } => EntityKind::Scan,
            RemoteMutation::SessionMutation { .. } => EntityKind::SessionMutation,
        }
    }

    /// Returns the operation being replayed.
    pub fn operation(&self) -> MutationOp {
        match self {
            RemoteMutation::Scan { operation, .. }
            | RemoteMutation::SessionMutation { operation, .. } => *operation,
        }
    }

    /// Returns the id of the affected domain entity.
    pub fn entity_id(&self) -> &str {
        match self {
            RemoteMutation::Scan { scan, .. } => &scan.entity_id,
            RemoteMutation::SessionMutation { mutation, .. } => &mutation.session_id,
        }
    }
}

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Apply a mutation.
    ///
    /// The server answers with `Ack` or `Rejected` carrying the same id.
    Apply {
        /// Client-chosen ID echoed in the reply.
        request_id: u64,
        mutation: RemoteMutation,
    },

    /// Ping message for connectivity probes.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The mutation was durably applied.
    Ack {
        request_id: u64,
        /// False when the remote already held this exact state (a redelivery).
        applied: bool,
    },

    /// The server refused the mutation.
    Rejected { request_id: u64, message: String },

    /// Pong response to client Ping.
    Pong {
        /// Echoed from the Ping message.
        id: u64,
    },

    /// Error not tied to a specific request, such as an unparseable message.
    Error {
        /// Human-readable error description.
        message: String,
    },
}

impl ClientMessage {
    /// Creates an Apply message.
    pub fn apply(request_id: u64, mutation: RemoteMutation) -> Self {
        ClientMessage::Apply {
            request_id,
            mutation,
        }
    }

    /// Creates a Ping message.
    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Creates an Ack message.
    pub fn ack(request_id: u64, applied: bool) -> Self {
        ServerMessage::Ack {
            request_id,
            applied,
        }
    }

    /// Creates a Rejected message.
    pub fn rejected(request_id: u64, message: impl Into<String>) -> Self {
        ServerMessage::Rejected {
            request_id,
            message: message.into(),
        }
    }

    /// Creates a Pong message.
    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    /// Creates an Error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Returns the request id this message answers, if any.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            ServerMessage::Ack { request_id, .. } | ServerMessage::Rejected { request_id, .. } => {
                Some(*request_id)
            }
            ServerMessage::Pong { id } => Some(*id),
            ServerMessage::Error { .. } => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
