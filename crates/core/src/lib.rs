// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! stk-core: Shared library for the stocktake scanner
//!
//! This crate provides the data model, the SQLite local mirror, and the wire
//! protocol used by both the `stk` CLI and the `stk-remote` server.

pub mod db;
pub mod error;
pub mod mutation;
pub mod protocol;
pub mod session;

pub use db::LocalMirrorStore;
pub use error::{Error, Result};
pub use mutation::{
    DroppedMutation, EntityKind, MutationOp, MutationQueueItem, NewMutation, ScanPayload,
    SessionMutationPayload,
};
pub use protocol::{ClientMessage, RemoteMutation, ServerMessage};
pub use session::{ExpectedEntity, SessionBundle, SessionSnapshot, SessionStatus};
