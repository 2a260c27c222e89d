// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::session::SessionStatus;
use chrono::Utc;
use yare::parameterized;

fn test_scan() -> RemoteMutation {
    RemoteMutation::Scan {
        operation: MutationOp::Create,
        scan: ScanPayload {
            session_id: "st-1".into(),
            entity_id: "asset-1".into(),
            actor: "alice".into(),
            location: Some("Shelf B".into()),
            scanned_at: Utc::now(),
        },
    }
}

fn test_session_mutation() -> RemoteMutation {
    RemoteMutation::SessionMutation {
        operation: MutationOp::Update,
        mutation: SessionMutationPayload {
            session_id: "st-1".into(),
            status: SessionStatus::Completed,
            reason: None,
            changed_at: Utc::now(),
        },
    }
}

#[test]
fn client_apply_roundtrip() {
    for mutation in [test_scan(), test_session_mutation()] {
        let msg = ClientMessage::apply(7, mutation);
        let json = msg.to_json().unwrap();
        assert_eq!(ClientMessage::from_json(&json).unwrap(), msg);
    }
}

#[test]
fn client_apply_json_shape() {
    let json = ClientMessage::apply(3, test_scan()).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["type"], "apply");
    assert_eq!(value["request_id"], 3);
    assert_eq!(value["mutation"]["kind"], "scan");
    assert_eq!(value["mutation"]["operation"], "create");
    assert_eq!(value["mutation"]["scan"]["entity_id"], "asset-1");
}

#[test]
fn client_ping_json_format() {
    let json = ClientMessage::ping(42).to_json().unwrap();
    assert_eq!(json, r#"{"type":"ping","id":42}"#);
}

#[parameterized(
    ack = { ServerMessage::ack(1, true), Some(1) },
    redelivery = { ServerMessage::ack(2, false), Some(2) },
    rejected = { ServerMessage::rejected(3, "unknown session"), Some(3) },
    pong = { ServerMessage::pong(4), Some(4) },
    error = { ServerMessage::error("bad json"), None },
)]
fn server_message_roundtrip_and_request_id(msg: ServerMessage, request_id: Option<u64>) {
    let json = msg.to_json().unwrap();
    let parsed = ServerMessage::from_json(&json).unwrap();
    assert_eq!(parsed, msg);
    assert_eq!(parsed.request_id(), request_id);
}

#[test]
fn remote_mutation_accessors() {
    let scan = test_scan();
    assert_eq!(scan.entity_kind(), EntityKind::Scan);
    assert_eq!(scan.operation(), MutationOp::Create);
    assert_eq!(scan.entity_id(), "asset-1");

    let session = test_session_mutation();
    assert_eq!(session.entity_kind(), EntityKind::SessionMutation);
    assert_eq!(session.operation(), MutationOp::Update);
    assert_eq!(session.entity_id(), "st-1");
}

#[test]
fn unknown_message_type_fails() {
    assert!(ClientMessage::from_json(r#"{"type":"subscribe"}"#).is_err());
    assert!(ServerMessage::from_json(r#"{"type":"ack"}"#).is_err());
}
