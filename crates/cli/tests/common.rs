// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// `stk` with a clean environment for the variables it reads.
pub fn stk() -> Command {
    let mut cmd = cargo_bin_cmd!("stk");
    cmd.env_remove("STK_LOG")
        .env_remove("STK_OPERATOR")
        .env_remove("COLOR")
        .env("NO_COLOR", "1");
    cmd
}

/// A temp directory initialized without a remote.
pub fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    stk()
        .arg("init")
        .arg("--operator")
        .arg("tester")
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

/// A temp directory whose remote refuses connections.
pub fn init_temp_unreachable() -> TempDir {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let temp = TempDir::new().unwrap();
    stk()
        .arg("init")
        .arg("--remote")
        .arg(format!("ws://127.0.0.1:{port}"))
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

/// Write a session bundle expecting `asset-1`..`asset-N` and download it.
pub fn download_session(temp: &TempDir, session_id: &str, count: usize) {
    let bundle = bundle_json(session_id, count);
    let path = temp.path().join(format!("{session_id}.json"));
    std::fs::write(&path, bundle).unwrap();
    stk()
        .arg("download")
        .arg(&path)
        .current_dir(temp.path())
        .assert()
        .success();
}

pub fn bundle_json(session_id: &str, count: usize) -> String {
    let expected: Vec<_> = (1..=count)
        .map(|n| {
            serde_json::json!({
                "session_id": session_id,
                "entity_id": format!("asset-{n}"),
                "name": format!("Asset {n}"),
                "barcode": format!("BC-{n}"),
            })
        })
        .collect();
    serde_json::json!({
        "session": {
            "id": session_id,
            "name": "Warehouse A",
            "status": "in_progress",
            "started_at": "2026-03-01T08:00:00Z",
            "updated_at": "2026-03-01T08:00:00Z",
        },
        "expected": expected,
    })
    .to_string()
}

/// Parse stdout of a `-o json` invocation.
pub fn json_output(temp: &Path, args: &[&str]) -> serde_json::Value {
    let output = stk().args(args).current_dir(temp).output().unwrap();
    assert!(output.status.success(), "{args:?} failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}
