// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Commands that only touch the local mirror.

use std::io::Read;
use std::str::FromStr;

use serde_json::json;
use stk_core::{
    DroppedMutation, ExpectedEntity, MutationQueueItem, SessionBundle, SessionSnapshot,
    SessionStatus,
};

use super::{print_json, Workspace};
use crate::cli::OutputFormat;
use crate::colors;
use crate::error::{Error, Result};
use crate::sync::ScanOutcome;

/// Read a bundle from a file, or stdin when `source` is `-`.
pub(crate) fn read_bundle(source: &str) -> Result<SessionBundle> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source)?
    };
    parse_bundle(source, &content)
}

pub(crate) fn parse_bundle(source: &str, content: &str) -> Result<SessionBundle> {
    let invalid = |reason: String| Error::InvalidBundle {
        path: source.to_string(),
        reason,
    };
    let bundle: SessionBundle = serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;
    if let Some(foreign) = bundle
        .expected
        .iter()
        .find(|e| e.session_id != bundle.session.id)
    {
        return Err(invalid(format!(
            "entity {} belongs to session {}, not {}",
            foreign.entity_id, foreign.session_id, bundle.session.id
        )));
    }
    Ok(bundle)
}

pub async fn download(ws: &Workspace, source: &str) -> Result<()> {
    let bundle = read_bundle(source)?;
    ws.gateway
        .download_for_offline(&bundle.session, &bundle.expected)
        .await?;
    println!(
        "Cached session {} ({}) with {} expected entities",
        bundle.session.id,
        bundle.session.name,
        bundle.expected.len()
    );
    Ok(())
}

pub async fn scan(
    ws: &Workspace,
    session_id: &str,
    code: &str,
    actor: Option<String>,
    location: Option<String>,
    output: OutputFormat,
) -> Result<()> {
    let actor = ws.config.actor(actor);
    let outcome = ws
        .gateway
        .record_scan(session_id, code, &actor, location)
        .await?;

    match output {
        OutputFormat::Json => {
            let value = match &outcome {
                ScanOutcome::Recorded { entity, mutation } => json!({
                    "status": "recorded",
                    "entity": entity,
                    "mutation_id": mutation.id,
                }),
                ScanOutcome::AlreadyScanned(entity) => json!({
                    "status": "already_scanned",
                    "entity": entity,
                }),
            };
            print_json(&value)?;
        }
        OutputFormat::Text => println!("{}", format_scan(&outcome)),
    }
    Ok(())
}

pub(crate) fn format_scan(outcome: &ScanOutcome) -> String {
    match outcome {
        ScanOutcome::Recorded { entity, mutation } => format!(
            "{} {} ({}) {}",
            colors::ok("Scanned"),
            entity.entity_id,
            entity.name,
            colors::context(&format!("[queued #{}]", mutation.id))
        ),
        ScanOutcome::AlreadyScanned(entity) => format!(
            "Already scanned: {} ({}) by {}",
            entity.entity_id,
            entity.name,
            entity.scanned_by.as_deref().unwrap_or("unknown")
        ),
    }
}

pub async fn status(
    ws: &Workspace,
    session_id: &str,
    status: &str,
    reason: Option<String>,
) -> Result<()> {
    let status = SessionStatus::from_str(status)?;
    let item = ws
        .gateway
        .change_session_status(session_id, status, reason)
        .await?;
    println!(
        "Session {} is now {} {}",
        session_id,
        status,
        colors::context(&format!("[queued #{}]", item.id))
    );
    Ok(())
}

pub async fn session(ws: &Workspace, session_id: &str, output: OutputFormat) -> Result<()> {
    let snapshot = ws.gateway.session(session_id).await?;
    let expected = ws.gateway.expected_entities(session_id).await?;

    match output {
        OutputFormat::Json => {
            let scanned = expected.iter().filter(|e| e.is_scanned()).count();
            print_json(&json!({
                "session": snapshot,
                "expected": expected,
                "scanned": scanned,
                "total": expected.len(),
            }))?;
        }
        OutputFormat::Text => println!("{}", format_session(&snapshot, &expected)),
    }
    Ok(())
}

pub(crate) fn format_session(session: &SessionSnapshot, expected: &[ExpectedEntity]) -> String {
    let scanned = expected.iter().filter(|e| e.is_scanned()).count();
    let mut lines = vec![format!(
        "{}  {}  [{}]",
        colors::header(&session.id),
        session.name,
        session.status
    )];
    if let Some(location) = &session.location {
        lines.push(format!("Location: {}", location));
    }
    lines.push(format!("Scanned: {}/{}", scanned, expected.len()));
    for entity in expected {
        let mark = if entity.is_scanned() { "[x]" } else { "[ ]" };
        let mut line = format!("  {} {}  {}", mark, entity.entity_id, entity.name);
        if let Some(by) = &entity.scanned_by {
            line.push_str(&colors::context(&format!("  ({by})")));
        }
        lines.push(line);
    }
    lines.join("\n")
}

pub async fn clear(ws: &Workspace, session_id: &str) -> Result<()> {
    if ws.gateway.clear_session(session_id).await? {
        println!("Cleared session {}", session_id);
        let pending = ws.gateway.pending_count().await?;
        if pending > 0 {
            println!("{} queued mutations kept", pending);
        }
    } else {
        println!("Session {} was not cached", session_id);
    }
    Ok(())
}

pub async fn pending(ws: &Workspace, output: OutputFormat) -> Result<()> {
    let items = ws.gateway.list_pending().await?;
    match output {
        OutputFormat::Json => print_json(&json!({
            "count": items.len(),
            "items": items,
        }))?,
        OutputFormat::Text => {
            println!("Pending: {}", items.len());
            for item in &items {
                println!("  {}", format_item(item));
            }
        }
    }
    Ok(())
}

pub(crate) fn format_item(item: &MutationQueueItem) -> String {
    let mut line = format!(
        "#{} {} {} {}",
        item.id, item.operation, item.entity_kind, item.entity_id
    );
    if item.retry_count > 0 {
        line.push_str(&colors::alert(&format!(
            " (failed {}x)",
            item.retry_count
        )));
    }
    line
}

pub(crate) fn format_dropped(dropped: &DroppedMutation) -> String {
    format!(
        "#{} {} {} {} {}: {}",
        dropped.id,
        dropped.operation,
        dropped.entity_kind,
        dropped.entity_id,
        colors::alert(&format!("dropped after {} attempts", dropped.retry_count)),
        dropped.last_error
    )
}

pub async fn dropped(ws: &Workspace, clear: bool, output: OutputFormat) -> Result<()> {
    let dropped = ws.gateway.dropped().await?;
    match output {
        OutputFormat::Json => print_json(&dropped)?,
        OutputFormat::Text => {
            println!("Dropped: {}", dropped.len());
            for item in &dropped {
                println!("  {}", format_dropped(item));
            }
        }
    }
    if clear {
        let cleared = ws.gateway.clear_dropped().await?;
        if output == OutputFormat::Text {
            println!("Cleared {} dropped mutations", cleared);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "offline_tests.rs"]
mod tests;
