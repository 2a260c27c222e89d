// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! Each connection is served by its own task. Requests on one connection are
//! answered in order; the database lock serializes writes across connections.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use stk_core::protocol::{ClientMessage, ServerMessage};

use crate::state::ServerState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Run the WebSocket server on the given address.
pub async fn run(addr: SocketAddr, state: ServerState) -> Result<(), BoxError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: {}", listener.local_addr()?);
    serve(listener, state).await
}

/// Accept connections from an already bound listener.
pub async fn serve(listener: TcpListener, state: ServerState) -> Result<(), BoxError> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: ServerState,
) -> Result<(), BoxError> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    info!("New WebSocket connection from: {}", peer_addr);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let response = handle_client_message(&text, &state).await;
                ws_sink.send(Message::Text(response.to_json()?.into())).await?;
            }
            Ok(Message::Close(_)) => {
                info!("Client {} disconnected", peer_addr);
                break;
            }
            Ok(Message::Ping(data)) => {
                ws_sink.send(Message::Pong(data)).await?;
            }
            Ok(_) => {}
            Err(e) => {
                error!("WebSocket error from {}: {}", peer_addr, e);
                break;
            }
        }
    }

    info!("Connection closed: {}", peer_addr);
    Ok(())
}

/// Answer one client message. Every request gets exactly one reply.
pub(crate) async fn handle_client_message(text: &str, state: &ServerState) -> ServerMessage {
    let msg = match ClientMessage::from_json(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Malformed message: {}", e);
            return ServerMessage::error(format!("malformed message: {e}"));
        }
    };
    debug!("Received message: {:?}", msg);

    match msg {
        ClientMessage::Apply {
            request_id,
            mutation,
        } => match state.apply(&mutation).await {
            Ok(applied) => ServerMessage::ack(request_id, applied),
            Err(e) => {
                warn!(request_id, entity_id = mutation.entity_id(), "rejected: {}", e);
                ServerMessage::rejected(request_id, e.to_string())
            }
        },
        ClientMessage::Ping { id } => ServerMessage::pong(id),
    }
}
