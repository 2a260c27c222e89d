// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn test_init_and_load_config() {
    let temp = TempDir::new().unwrap();
    let config = Config {
        operator: Some("scanner-01".to_string()),
        remote: Some(RemoteConfig::new("ws://localhost:7890")),
        ..Config::default()
    };
    let work_dir = init_work_dir(temp.path(), &config).unwrap();

    let loaded = Config::load(&work_dir).unwrap();
    assert_eq!(loaded.operator.as_deref(), Some("scanner-01"));
    assert_eq!(loaded.remote.unwrap().url, "ws://localhost:7890");
    assert_eq!(loaded.sync, SyncSettings::default());
}

#[test]
fn test_already_initialized() {
    let temp = TempDir::new().unwrap();
    init_work_dir(temp.path(), &Config::default()).unwrap();

    let result = init_work_dir(temp.path(), &Config::default());
    assert!(result.is_err());

    if let Err(e) = result {
        assert!(e.to_string().contains("already initialized"));
    }
}

#[test]
fn test_init_rejects_bad_remote() {
    let temp = TempDir::new().unwrap();
    let config = Config {
        remote: Some(RemoteConfig::new("http://example.com")),
        ..Config::default()
    };

    let err = init_work_dir(temp.path(), &config).unwrap_err();
    assert!(matches!(err, Error::InvalidRemoteUrl(_)));
    assert!(!temp.path().join(".stocktake").exists());
}

#[test]
fn test_defaults_fill_missing_fields() {
    let temp = TempDir::new().unwrap();
    let work_dir = temp.path().join(".stocktake");
    fs::create_dir_all(&work_dir).unwrap();
    fs::write(
        work_dir.join("config.toml"),
        "[remote]\nurl = \"wss://stock.example.com\"\n\n[sync]\nmax_retries = 5\n",
    )
    .unwrap();

    let config = Config::load(&work_dir).unwrap();
    let remote = config.remote.clone().unwrap();
    assert_eq!(remote.connect_timeout_secs, 2);
    assert_eq!(remote.request_timeout_ms, 10_000);
    assert_eq!(config.sync.max_retries, 5);
    assert_eq!(config.sync.interval_secs, 30);
    assert_eq!(config.sync.probe_interval_secs, 10);
}

#[test]
fn test_load_rejects_non_websocket_remote() {
    let temp = TempDir::new().unwrap();
    let work_dir = temp.path().join(".stocktake");
    fs::create_dir_all(&work_dir).unwrap();
    fs::write(work_dir.join("config.toml"), "[remote]\nurl = \"git:.\"\n").unwrap();

    let err = Config::load(&work_dir).unwrap_err();
    assert!(err.to_string().contains("ws://"));
}

#[parameterized(
    zero_interval = { "[sync]\ninterval_secs = 0\n", "sync.interval_secs" },
    zero_retries = { "[sync]\nmax_retries = 0\n", "sync.max_retries" },
    zero_probe = { "[sync]\nprobe_interval_secs = 0\n", "sync.probe_interval_secs" },
    zero_request_timeout = {
        "[remote]\nurl = \"ws://localhost:7890\"\nrequest_timeout_ms = 0\n",
        "remote.request_timeout_ms"
    },
    zero_connect_timeout = {
        "[remote]\nurl = \"ws://localhost:7890\"\nconnect_timeout_secs = 0\n",
        "remote.connect_timeout_secs"
    },
)]
fn test_load_rejects_zero_settings(content: &str, field: &str) {
    let temp = TempDir::new().unwrap();
    let work_dir = temp.path().join(".stocktake");
    fs::create_dir_all(&work_dir).unwrap();
    fs::write(work_dir.join("config.toml"), content).unwrap();

    let err = Config::load(&work_dir).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains(field), "got: {err}");
}

#[test]
fn test_load_accepts_minimum_settings() {
    let temp = TempDir::new().unwrap();
    let work_dir = temp.path().join(".stocktake");
    fs::create_dir_all(&work_dir).unwrap();
    fs::write(
        work_dir.join("config.toml"),
        "[sync]\ninterval_secs = 1\nmax_retries = 1\nprobe_interval_secs = 1\n",
    )
    .unwrap();

    let config = Config::load(&work_dir).unwrap();
    assert_eq!(config.sync_config().interval, Duration::from_secs(1));
}

#[test]
fn test_load_missing_config() {
    let temp = TempDir::new().unwrap();
    let err = Config::load(temp.path()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[parameterized(
    ws = { "ws://localhost:7890", true },
    wss = { "wss://stock.example.com/sync", true },
    http = { "http://localhost", false },
    git = { "git:.", false },
    bare_scheme = { "ws://", false },
    empty = { "", false },
)]
fn test_validate_url(url: &str, valid: bool) {
    assert_eq!(RemoteConfig::new(url).validate_url().is_none(), valid);
}

#[test]
fn test_sync_config_uses_settings() {
    let config = Config {
        remote: Some(RemoteConfig {
            url: "ws://localhost:1".to_string(),
            connect_timeout_secs: 1,
            request_timeout_ms: 2_500,
        }),
        sync: SyncSettings {
            interval_secs: 5,
            max_retries: 7,
            probe_interval_secs: 1,
        },
        ..Config::default()
    };

    let sync = config.sync_config();
    assert_eq!(sync.interval, Duration::from_secs(5));
    assert_eq!(sync.max_retries, 7);
    assert_eq!(sync.remote_timeout, Duration::from_millis(2_500));
    assert_eq!(config.probe_interval(), Duration::from_secs(1));
}

#[test]
fn test_sync_config_defaults_without_remote() {
    let sync = Config::default().sync_config();
    assert_eq!(sync.interval, Duration::from_secs(30));
    assert_eq!(sync.max_retries, 3);
    assert_eq!(sync.remote_timeout, Duration::from_secs(10));
}

#[test]
fn test_actor_prefers_explicit_flag() {
    let config = Config {
        operator: Some("from-config".to_string()),
        ..Config::default()
    };
    assert_eq!(config.actor(Some("alice".to_string())), "alice");
}

#[test]
fn test_require_remote() {
    assert!(matches!(
        Config::default().require_remote().unwrap_err(),
        Error::NoRemote
    ));
}

#[test]
fn test_db_path() {
    let work_dir = PathBuf::from("/floor/.stocktake");
    assert_eq!(
        get_db_path(&work_dir),
        PathBuf::from("/floor/.stocktake/mirror.db")
    );
}
