// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for stk-core operations.

use thiserror::Error;

/// All possible errors that can occur in stk-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("session not found: {0}\n  hint: download the session for offline use first")]
    SessionNotFound(String),

    #[error("'{code}' is not expected in session {session_id}")]
    EntityNotExpected { session_id: String, code: String },

    #[error("queued mutation not found: {0}")]
    MutationNotFound(i64),

    #[error("invalid operation: '{0}'\n  hint: valid operations are: create, update, delete")]
    InvalidOperation(String),

    #[error("invalid entity kind: '{0}'\n  hint: valid kinds are: scan, session-mutation")]
    InvalidEntityKind(String),

    #[error(
        "invalid session status: '{0}'\n  hint: valid statuses are: in_progress, completed, cancelled"
    )]
    InvalidSessionStatus(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for stk-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
