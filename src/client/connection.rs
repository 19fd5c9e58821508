use crate::messaging::ClientAction;
use crate::types::error::Result;
use futures::SinkExt;
use futures::stream::SplitSink;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

/// Lifecycle of the single arena connection. Exactly one instance exists per
/// client session and only the transport mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

/// Result of a fire-and-forget send: either the frame went out on the open
/// socket or it was dropped because the connection was not open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    NotConnected,
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Exclusive owner of the socket write half and the connection state.
///
/// Invariant: the state is `Open` iff the write half is present and the open
/// handshake completed. No other component writes to the socket.
pub struct ConnectionManager {
    ws_write: Arc<RwLock<Option<WsSink>>>,
    state: Arc<RwLock<ConnectionState>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            ws_write: Arc::new(RwLock::new(None)),
            state: Arc::new(RwLock::new(ConnectionState::Idle)),
        }
    }

    /// Sets the WebSocket write sink (called after a successful handshake)
    pub async fn set_writer(&self, writer: WsSink) {
        let mut ws = self.ws_write.write().await;
        *ws = Some(writer);
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn set_state(&self, new_state: ConnectionState) {
        let mut state = self.state.write().await;
        *state = new_state;
    }

    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Open
    }

    /// Serializes and writes an action if the connection is open; otherwise
    /// the action is dropped and the caller learns it from the outcome.
    pub async fn send(&self, action: &ClientAction) -> Result<SendOutcome> {
        let json = serde_json::to_string(action)?;

        if !self.is_connected().await {
            return Ok(SendOutcome::NotConnected);
        }

        let mut ws_guard = self.ws_write.write().await;
        match ws_guard.as_mut() {
            Some(ws) => {
                ws.send(Message::Text(json.into())).await?;
                Ok(SendOutcome::Delivered)
            }
            None => Ok(SendOutcome::NotConnected),
        }
    }

    /// Closes the socket if present and transitions to `Closed`. A failed
    /// close handshake is logged, not surfaced: the state is terminal either
    /// way.
    pub async fn close(&self) {
        let mut ws_guard = self.ws_write.write().await;
        if let Some(ws) = ws_guard.as_mut() {
            if let Err(e) = ws.close().await {
                tracing::debug!("close handshake failed: {}", e);
            }
        }
        *ws_guard = None;
        drop(ws_guard);

        self.set_state(ConnectionState::Closed).await;
    }

    /// Clears the writer after the read side observed a close or error.
    pub async fn clear_writer(&self) {
        let mut ws = self.ws_write.write().await;
        *ws = None;
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_without_open_connection_is_dropped() {
        let connection = ConnectionManager::new();
        let outcome = connection.send(&ClientAction::Ping).await.unwrap();
        assert_eq!(outcome, SendOutcome::NotConnected);
    }

    #[tokio::test]
    async fn open_state_requires_a_writer() {
        let connection = ConnectionManager::new();
        assert_eq!(connection.state().await, ConnectionState::Idle);

        // State set without a writer still refuses to deliver.
        connection.set_state(ConnectionState::Open).await;
        let outcome = connection.send(&ClientAction::Ping).await.unwrap();
        assert_eq!(outcome, SendOutcome::NotConnected);
    }

    #[tokio::test]
    async fn close_is_terminal_and_idempotent() {
        let connection = ConnectionManager::new();
        connection.close().await;
        assert_eq!(connection.state().await, ConnectionState::Closed);
        connection.close().await;
        assert_eq!(connection.state().await, ConnectionState::Closed);
    }
}
