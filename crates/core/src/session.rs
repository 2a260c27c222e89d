// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session snapshots cached for offline use.
//!
//! A [`SessionSnapshot`] and its set of [`ExpectedEntity`] rows are downloaded
//! before the operator goes offline. Scans are validated against the expected
//! set without contacting the remote store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Lifecycle status of a stock-take session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Scanning is underway.
    InProgress,
    /// All areas have been counted.
    Completed,
    /// Abandoned before completion.
    Cancelled,
}

impl SessionStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true if no further scans are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "in_progress" | "in-progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" | "canceled" => Ok(SessionStatus::Cancelled),
            _ => Err(Error::InvalidSessionStatus(s.to_string())),
        }
    }
}

/// Local copy of an in-progress session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub name: String,
    /// Site or area being counted.
    #[serde(default)]
    pub location: Option<String>,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Creates a new in-progress session snapshot.
    pub fn new(id: impl Into<String>, name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        SessionSnapshot {
            id: id.into(),
            name: name.into(),
            location: None,
            status: SessionStatus::InProgress,
            started_at,
            updated_at: started_at,
        }
    }
}

/// An asset the session expects to find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedEntity {
    pub session_id: String,
    pub entity_id: String,
    pub name: String,
    /// Printed label code. Scans may match either this or `entity_id`.
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub expected_location: Option<String>,
    /// Set once the asset has been scanned locally.
    #[serde(default)]
    pub scanned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scanned_by: Option<String>,
}

impl ExpectedEntity {
    /// Creates an unscanned expected entity.
    pub fn new(
        session_id: impl Into<String>,
        entity_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        ExpectedEntity {
            session_id: session_id.into(),
            entity_id: entity_id.into(),
            name: name.into(),
            barcode: None,
            expected_location: None,
            scanned_at: None,
            scanned_by: None,
        }
    }

    /// Returns true if the asset has been scanned.
    pub fn is_scanned(&self) -> bool {
        self.scanned_at.is_some()
    }
}

/// A session together with its expected entities, as exported for offline use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBundle {
    pub session: SessionSnapshot,
    #[serde(default)]
    pub expected: Vec<ExpectedEntity>,
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
