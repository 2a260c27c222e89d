// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending writes recorded while offline.
//!
//! Every offline write becomes a [`MutationQueueItem`] in the local mirror.
//! Items are replayed against the remote store in ascending `id` order and
//! removed once applied, or dead-lettered as a [`DroppedMutation`] once their
//! retry budget is spent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::session::SessionStatus;

/// The kind of write a queued mutation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOp {
    Create,
    Update,
    Delete,
}

impl MutationOp {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationOp::Create => "create",
            MutationOp::Update => "update",
            MutationOp::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MutationOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "create" => Ok(MutationOp::Create),
            "update" => Ok(MutationOp::Update),
            "delete" => Ok(MutationOp::Delete),
            _ => Err(Error::InvalidOperation(s.to_string())),
        }
    }
}

/// Selects which remote operation replays a queued mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// An asset scanned during a stock-take session.
    #[serde(rename = "scan")]
    Scan,
    /// A change to the session itself (status transitions).
    #[serde(rename = "session-mutation")]
    SessionMutation,
}

impl EntityKind {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Scan => "scan",
            EntityKind::SessionMutation => "session-mutation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "scan" => Ok(EntityKind::Scan),
            "session-mutation" | "session_mutation" => Ok(EntityKind::SessionMutation),
            _ => Err(Error::InvalidEntityKind(s.to_string())),
        }
    }
}

/// A durable record of one pending write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationQueueItem {
    /// Store-assigned, strictly increasing. Defines FIFO order.
    pub id: i64,
    pub operation: MutationOp,
    pub entity_kind: EntityKind,
    /// Identifier of the affected domain entity.
    pub entity_id: String,
    /// Opaque data needed to replay the write.
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
    /// Number of failed drain attempts so far.
    pub retry_count: u32,
}

/// A mutation about to be appended to the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMutation {
    pub operation: MutationOp,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
}

impl NewMutation {
    /// Creates a mutation stamped with the current time.
    pub fn new(
        operation: MutationOp,
        entity_kind: EntityKind,
        entity_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        NewMutation {
            operation,
            entity_kind,
            entity_id: entity_id.into(),
            payload,
            enqueued_at: Utc::now(),
        }
    }

    /// Creates a scan mutation from a typed payload.
    pub fn scan(operation: MutationOp, scan: &ScanPayload) -> Result<Self> {
        Ok(Self::new(
            operation,
            EntityKind::Scan,
            scan.entity_id.clone(),
            serde_json::to_value(scan)?,
        ))
    }

    /// Creates a session mutation from a typed payload.
    pub fn session(operation: MutationOp, mutation: &SessionMutationPayload) -> Result<Self> {
        Ok(Self::new(
            operation,
            EntityKind::SessionMutation,
            mutation.session_id.clone(),
            serde_json::to_value(mutation)?,
        ))
    }
}

/// Replay data for a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPayload {
    pub session_id: String,
    pub entity_id: String,
    /// Operator or device that performed the scan.
    pub actor: String,
    /// Where the asset was physically found, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

/// Replay data for a session status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMutationPayload {
    pub session_id: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// A mutation permanently discarded after exhausting its retry budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedMutation {
    /// The queue id the mutation had when it was dropped.
    pub id: i64,
    pub operation: MutationOp,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
    pub retry_count: u32,
    /// The error from the final failed attempt.
    pub last_error: String,
    pub dropped_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
