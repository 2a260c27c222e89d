// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the stk-remote server binary.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::net::TcpListener;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Helper to spawn a server process and clean it up on drop.
struct ServerProcess {
    child: Child,
    port: u16,
    temp_dir: tempfile::TempDir,
}

impl ServerProcess {
    fn spawn() -> Self {
        let temp_dir = tempfile::tempdir().expect("create temp dir");

        // Reserve a free port, then release it for the server to bind.
        let port = TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .expect("reserve port")
            .port();

        let child = Command::new(env!("CARGO_BIN_EXE_stk-remote"))
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", port))
            .arg("--data")
            .arg(temp_dir.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn server process");

        ServerProcess {
            child,
            port,
            temp_dir,
        }
    }

    fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn apply_json(request_id: u64) -> String {
    serde_json::json!({
        "type": "apply",
        "request_id": request_id,
        "mutation": {
            "kind": "scan",
            "operation": "create",
            "scan": {
                "session_id": "st-1",
                "entity_id": "asset-1",
                "actor": "alice",
                "scanned_at": "2026-03-01T09:30:00Z"
            }
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_server_lifecycle() {
    let server = ServerProcess::spawn();

    // CI runners can be slow, so retry generously.
    let mut ws_stream = None;
    for _ in 0..20 {
        if let Ok(Ok((stream, _))) =
            tokio::time::timeout(Duration::from_millis(500), connect_async(server.ws_url())).await
        {
            ws_stream = Some(stream);
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    let ws_stream = ws_stream.expect("should connect to server within retries");
    let (mut sink, mut stream) = ws_stream.split();

    let ping_msg = serde_json::json!({"type": "ping", "id": 12345});
    sink.send(Message::Text(ping_msg.to_string().into()))
        .await
        .expect("send ping");
    match tokio::time::timeout(Duration::from_secs(5), stream.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            assert!(text.contains("pong"), "Expected pong, got: {}", text);
            assert!(text.contains("12345"), "Expected id 12345, got: {}", text);
        }
        other => panic!("Expected pong, got {:?}", other),
    }

    // The same mutation delivered twice lands once.
    let mut applied = Vec::new();
    for request_id in [1, 2] {
        sink.send(Message::Text(apply_json(request_id).into()))
            .await
            .expect("send apply");
        match tokio::time::timeout(Duration::from_secs(5), stream.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                let reply: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(reply["type"], "ack", "got: {}", text);
                assert_eq!(reply["request_id"], request_id);
                applied.push(reply["applied"].as_bool().unwrap());
            }
            other => panic!("Expected ack, got {:?}", other),
        }
    }
    assert_eq!(applied, vec![true, false]);

    let conn = rusqlite::Connection::open(server.data_dir().join("remote.db")).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM scans", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}
