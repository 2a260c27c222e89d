// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use super::connectivity::{probe_once, ConnectivityMonitor, ConnectivityProbe};
use super::test_helpers::{MockRemoteStore, RemoteCall};

#[test]
fn set_online_reports_changes_only() {
    let monitor = ConnectivityMonitor::new(false);
    assert!(!monitor.is_online());

    assert!(monitor.set_online(true));
    assert!(!monitor.set_online(true));
    assert!(monitor.is_online());
    assert!(monitor.set_online(false));
}

#[tokio::test]
async fn clones_share_state_and_notify_subscribers() {
    let monitor = ConnectivityMonitor::new(false);
    let other = monitor.clone();
    let mut rx = monitor.subscribe();

    other.set_online(true);

    rx.changed().await.unwrap();
    assert!(*rx.borrow_and_update());
    assert!(monitor.is_online());
}

#[tokio::test]
async fn unchanged_state_does_not_notify() {
    let monitor = ConnectivityMonitor::new(true);
    let mut rx = monitor.subscribe();

    monitor.set_online(true);

    assert!(!rx.has_changed().unwrap());
}

#[tokio::test]
async fn probe_marks_reachable_remote_online() {
    let remote = MockRemoteStore::new();
    let monitor = ConnectivityMonitor::new(false);

    assert!(probe_once(&remote, &monitor, Duration::from_secs(1)).await);

    assert!(monitor.is_online());
    assert_eq!(remote.calls(), vec![RemoteCall::Ping]);
}

#[tokio::test]
async fn probe_marks_unreachable_remote_offline() {
    let remote = MockRemoteStore::new();
    remote.set_unreachable(true);
    let monitor = ConnectivityMonitor::new(true);

    assert!(!probe_once(&remote, &monitor, Duration::from_secs(1)).await);
    assert!(!monitor.is_online());
}

#[tokio::test(start_paused = true)]
async fn slow_probe_counts_as_offline() {
    let remote = MockRemoteStore::new();
    remote.set_delay(Duration::from_secs(30));
    let monitor = ConnectivityMonitor::new(true);

    assert!(!probe_once(&remote, &monitor, Duration::from_millis(200)).await);
    assert!(!monitor.is_online());
}

#[tokio::test(start_paused = true)]
async fn background_probe_tracks_remote() {
    let remote = Arc::new(MockRemoteStore::new());
    let monitor = ConnectivityMonitor::new(false);
    let probe = ConnectivityProbe::spawn(
        remote.clone(),
        monitor.clone(),
        Duration::from_secs(5),
        Duration::from_secs(1),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(monitor.is_online());

    remote.set_unreachable(true);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!monitor.is_online());

    probe.stop().await;
    let pings = remote.calls().len();
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(remote.calls().len(), pings);
}

#[tokio::test(start_paused = true)]
async fn zero_probe_interval_falls_back_to_minimum_period() {
    let remote = Arc::new(MockRemoteStore::new());
    let monitor = ConnectivityMonitor::new(false);
    let probe = ConnectivityProbe::spawn(
        remote.clone(),
        monitor.clone(),
        Duration::ZERO,
        Duration::from_millis(50),
    );

    tokio::time::sleep(Duration::from_millis(250)).await;

    assert!(monitor.is_online());
    let pings = remote.calls().len();
    assert!((2..=4).contains(&pings), "got {pings} pings");
    probe.stop().await;
}
