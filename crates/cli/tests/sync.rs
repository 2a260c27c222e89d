// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;
use common::*;

#[test]
fn sync_without_remote_explains() {
    let temp = init_temp();

    stk()
        .arg("sync")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no remote configured"));
}

#[test]
fn sync_with_unreachable_remote_keeps_queue() {
    let temp = init_temp_unreachable();
    download_session(&temp, "st-1", 1);
    stk()
        .args(["scan", "st-1", "asset-1", "--actor", "alice"])
        .current_dir(temp.path())
        .assert()
        .success();

    stk()
        .arg("sync")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("offline"));

    let pending = json_output(temp.path(), &["pending", "-o", "json"]);
    assert_eq!(pending["count"], 1);
    assert_eq!(pending["items"][0]["retry_count"], 0);
}

#[test]
fn watch_without_remote_fails() {
    let temp = init_temp();

    stk()
        .arg("watch")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no remote configured"));
}
