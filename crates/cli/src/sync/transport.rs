// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Message transport to the remote store.
//!
//! [`Transport`] moves protocol messages over some connection. The
//! production implementation is [`WebSocketTransport`]; tests substitute an
//! in-memory transport.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use stk_core::protocol::{ClientMessage, ServerMessage};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// A boxed, sendable future borrowed for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A bidirectional message channel to the remote store.
pub trait Transport: Send + Sync {
    /// Open a connection to `url`, replacing any existing one.
    fn connect(&mut self, url: &str) -> BoxFuture<'_, TransportResult<()>>;

    /// Close the connection. Closing an unconnected transport is a no-op.
    fn disconnect(&mut self) -> BoxFuture<'_, TransportResult<()>>;

    /// Send one message.
    fn send(&mut self, msg: ClientMessage) -> BoxFuture<'_, TransportResult<()>>;

    /// Receive the next message. `None` means the peer closed the connection.
    fn recv(&mut self) -> BoxFuture<'_, TransportResult<Option<ServerMessage>>>;

    fn is_connected(&self) -> bool;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct WsHalves {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

/// [`Transport`] over a tokio-tungstenite WebSocket.
#[derive(Default)]
pub struct WebSocketTransport {
    ws: Option<WsHalves>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str) -> BoxFuture<'_, TransportResult<()>> {
        let url = url.to_string();
        Box::pin(async move {
            let (ws, _) = tokio_tungstenite::connect_async(&url)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            let (sink, stream) = ws.split();
            self.ws = Some(WsHalves { sink, stream });
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            if let Some(mut ws) = self.ws.take() {
                // Peer may already be gone; closing is best effort.
                let _ = ws.sink.close().await;
            }
            Ok(())
        })
    }

    fn send(&mut self, msg: ClientMessage) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            let json = msg
                .to_json()
                .map_err(|e| TransportError::Malformed(e.to_string()))?;
            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            let sent = match ws.sink.send(Message::Text(json.into())).await {
                Ok(()) => ws.sink.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = sent {
                self.ws = None;
                return Err(TransportError::SendFailed(e.to_string()));
            }
            Ok(())
        })
    }

    fn recv(&mut self) -> BoxFuture<'_, TransportResult<Option<ServerMessage>>> {
        Box::pin(async move {
            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            loop {
                match ws.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return ServerMessage::from_json(text.as_str())
                            .map(Some)
                            .map_err(|e| TransportError::Malformed(e.to_string()));
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        self.ws = None;
                        return Ok(None);
                    }
                    // Control frames and binary payloads carry no protocol messages.
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        self.ws = None;
                        return Err(TransportError::ReceiveFailed(e.to_string()));
                    }
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.ws.is_some()
    }
}
