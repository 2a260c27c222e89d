// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::SyncError;

/// All possible errors that can occur in the stkrs library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'stk init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("no remote configured\n  hint: set [remote] url in .stocktake/config.toml or run 'stk init --remote <url>'")]
    NoRemote,

    #[error("{0}")]
    InvalidRemoteUrl(String),

    #[error("invalid bundle {path}: {reason}")]
    InvalidBundle { path: String, reason: String },

    #[error("{0}")]
    Core(#[from] stk_core::Error),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for stkrs operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
