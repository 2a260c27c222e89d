// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;

#[test]
fn test_error_not_initialized_display() {
    let err = Error::NotInitialized;
    assert!(err.to_string().contains("not initialized"));
    assert!(err.to_string().contains("stk init"));
}

#[test]
fn test_error_already_initialized_display() {
    let err = Error::AlreadyInitialized("/floor/.stocktake".to_string());
    assert!(err.to_string().contains("already initialized"));
    assert!(err.to_string().contains("/floor/.stocktake"));
}

#[test]
fn test_error_no_remote_has_hint() {
    let msg = Error::NoRemote.to_string();
    assert!(msg.contains("no remote configured"));
    assert!(msg.contains("hint:"));
}

#[test]
fn test_error_invalid_bundle_display() {
    let err = Error::InvalidBundle {
        path: "st-1.json".to_string(),
        reason: "missing field `session`".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.contains("st-1.json"));
    assert!(msg.contains("missing field"));
}

#[test]
fn test_error_core_is_transparent_to_user() {
    let err: Error = stk_core::Error::SessionNotFound("st-9".to_string()).into();
    assert!(err.to_string().starts_with("session not found: st-9"));
}

#[test]
fn test_error_sync_display() {
    let err: Error = SyncError::OfflineRejected.into();
    assert!(err.to_string().contains("offline"));
}

#[test]
fn test_error_from_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();
    assert!(matches!(err, Error::Io(_)));
}
