use super::{
    ArenaClientBuilder, ArenaClientOptions, ClientState, ConnectionManager, ConnectionState,
    SendOutcome,
};
use crate::builtins::{PresenceCounter, TeamScore};
use crate::charts::ChartFeed;
use crate::infrastructure::{ApiClient, http::spawn_chart_refresh};
use crate::messaging::{ClientAction, EventRegistry, MessageRouter};
use crate::notifications::NotificationCenter;
use crate::types::constants::{ARENA_WS_PATH, CHART_REFRESH_INTERVAL, TOKEN_PARAM, lifecycle};
use crate::types::Result;
use futures::stream::StreamExt;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_tungstenite::connect_async;
use url::Url;

/// The arena realtime client: one persistent WebSocket connection per
/// session, multiplexing server-pushed events to independent consumers.
///
/// The client owns the connection lifecycle (connect, open, reconnect with
/// backoff, closed), routes inbound frames through the [`EventRegistry`], and
/// feeds the built-in consumers (notifications, charts, score, presence).
///
/// # Example
///
/// ```no_run
/// use arena_realtime::{ArenaClient, ArenaClientOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ArenaClient::new("wss://arena.example.com", ArenaClientOptions::default())?;
///
/// let registry = client.registry();
/// registry.on("team_flag_submitted", |frame| {
///     println!("a teammate scored: {frame}");
/// });
///
/// client.connect("session-token").await?;
/// // ...
/// client.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ArenaClient {
    pub(crate) endpoint: String,

    // Connection manager
    pub(crate) connection: Arc<ConnectionManager>,

    // Fan-out dispatch shared with every consumer
    pub(crate) registry: Arc<EventRegistry>,

    // Consolidated mutable state
    pub(crate) state: Arc<RwLock<ClientState>>,

    // Built-in consumers
    pub(crate) notifications: Arc<NotificationCenter>,
    pub(crate) charts: Arc<ChartFeed>,
    pub(crate) score: Arc<TeamScore>,
    pub(crate) presence: Arc<PresenceCounter>,
}

impl ArenaClient {
    /// Creates a new client for the given arena origin (e.g.
    /// `wss://arena.example.com`). No connection is established until
    /// [`connect()`](Self::connect) is called.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::UrlParse`](crate::types::ArenaError::UrlParse) if
    /// the endpoint cannot be parsed, or
    /// [`ArenaError::Connection`](crate::types::ArenaError::Connection) if it
    /// is not a `ws`/`wss` URL.
    pub fn new(endpoint: impl Into<String>, options: ArenaClientOptions) -> Result<Self> {
        ArenaClientBuilder::new(endpoint, options).map(|builder| builder.build())
    }

    /// Set connection state and notify watchers
    async fn set_state(&self, new_state: ConnectionState) {
        self.connection.set_state(new_state).await;

        let state = self.state.read().await;
        state.notify_state_change(new_state, state.was_manual_disconnect);
    }

    /// Establishes the WebSocket connection, attaching the credential as a
    /// query parameter.
    ///
    /// Idempotent while `Connecting` or `Open`. A failure to construct the
    /// connection URL leaves the state untouched and is not retried; a failed
    /// handshake is a transport fault and enters the backoff/retry path.
    pub async fn connect(&self, token: &str) -> Result<()> {
        {
            let state = self.connection.state().await;
            if state == ConnectionState::Open || state == ConnectionState::Connecting {
                tracing::debug!("connect ignored, already {:?}", state);
                return Ok(());
            }
        }

        let url = match self.build_endpoint_url(token) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("invalid arena endpoint: {}", e);
                return Err(e);
            }
        };

        {
            let mut state = self.state.write().await;
            state.credential = Some(token.to_owned());
            state.was_manual_disconnect = false;
        }
        self.set_state(ConnectionState::Connecting).await;
        tracing::info!("connecting to {}", self.endpoint);

        let ws_stream = match connect_async(url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                tracing::error!("arena handshake failed: {}", e);
                // Transport fault: the watcher schedules the retry.
                self.set_state(ConnectionState::Closed).await;
                return Err(e.into());
            }
        };
        let (write_half, mut read_half) = ws_stream.split();

        self.connection.set_writer(write_half).await;

        // Successful open is the only place the backoff resets.
        self.state.write().await.backoff.reset();
        self.set_state(ConnectionState::Open).await;
        self.registry.dispatch(lifecycle::CONNECTED, &json!({}));
        tracing::info!("connected to arena");

        // Spawned only after the state is `Open`: a close processed by the
        // read task must never be overwritten by this handshake.
        let router = MessageRouter::new(Arc::clone(&self.registry));
        let self_cloned = self.clone();
        {
            let mut state = self.state.write().await;
            state.task_manager.spawn(async move {
                use tokio_tungstenite::tungstenite::Message;

                tracing::debug!("starting read task");
                while let Some(msg_result) = read_half.next().await {
                    match msg_result {
                        Ok(Message::Text(text)) => {
                            if let Err(e) = router.handle_frame(&text) {
                                tracing::warn!("dropping malformed frame: {}", e);
                            }
                        }
                        Ok(Message::Close(frame)) => {
                            match frame {
                                Some(close) => tracing::warn!(
                                    "server closed connection: code={:?}, reason='{}'",
                                    close.code,
                                    close.reason
                                ),
                                None => {
                                    tracing::warn!("server closed connection without close frame")
                                }
                            }
                            self_cloned.handle_socket_closed().await;
                            break;
                        }
                        Ok(Message::Ping(data)) => {
                            tracing::debug!("received ping ({} bytes)", data.len());
                        }
                        Ok(Message::Pong(data)) => {
                            tracing::debug!("received pong ({} bytes)", data.len());
                        }
                        Ok(Message::Binary(data)) => {
                            tracing::warn!(
                                "dropping unexpected binary frame ({} bytes)",
                                data.len()
                            );
                        }
                        Ok(Message::Frame(_)) => {}
                        Err(e) => {
                            tracing::error!("websocket read error: {}", e);
                            self_cloned
                                .registry
                                .dispatch(lifecycle::ERROR, &json!({ "error": e.to_string() }));
                            self_cloned.handle_socket_closed().await;
                            break;
                        }
                    }
                }
                tracing::debug!("read task finished");
            });
        }

        Ok(())
    }

    /// Read side observed a close or error: drop the writer, go `Closed` and
    /// let the watcher schedule the retry.
    async fn handle_socket_closed(&self) {
        self.connection.clear_writer().await;
        self.set_state(ConnectionState::Closed).await;
        self.registry.dispatch(lifecycle::DISCONNECTED, &json!({}));
    }

    /// Drives reconnection attempts until one succeeds, the user disconnects,
    /// or the attempt budget is exhausted.
    pub(crate) async fn run_reconnect_loop(&self) {
        loop {
            if self.state.read().await.was_manual_disconnect {
                break;
            }

            let next = self.state.write().await.backoff.next_delay();
            let Some(delay) = next else {
                tracing::warn!("reconnect budget exhausted, live updates stopped");
                self.registry
                    .dispatch(lifecycle::DISCONNECTED, &json!({ "terminal": true }));
                break;
            };

            let attempt = self.state.read().await.backoff.attempt();
            tracing::info!(attempt, "reconnecting in {:?}", delay);
            tokio::time::sleep(delay).await;

            if self.state.read().await.was_manual_disconnect {
                break;
            }
            {
                let state = self.connection.state().await;
                if state == ConnectionState::Open || state == ConnectionState::Connecting {
                    break;
                }
            }

            let Some(token) = self.state.read().await.credential.clone() else {
                break;
            };
            match self.connect(&token).await {
                Ok(()) => {
                    tracing::info!("reconnected");
                    break;
                }
                Err(e) => tracing::error!("reconnect attempt failed: {}", e),
            }
        }

        self.state.write().await.reconnect_in_flight = false;
    }

    /// Terminal user-initiated disconnect.
    ///
    /// Cancels any pending reconnect, aborts the background tasks, closes the
    /// socket and transitions to `Closed`. The client only reconnects after
    /// an explicit [`connect()`](Self::connect).
    pub async fn disconnect(&self) {
        tracing::info!("disconnecting from arena");
        {
            let mut state = self.state.write().await;
            state.was_manual_disconnect = true;
            state.reconnect_in_flight = false;
            state.task_manager.abort_all();
        }

        self.connection.close().await;

        let state = self.state.read().await;
        state.notify_state_change(ConnectionState::Closed, true);
        drop(state);

        self.registry
            .dispatch(lifecycle::DISCONNECTED, &json!({ "manual": true }));
        tracing::info!("disconnected from arena");
    }

    /// Sends a fire-and-forget action.
    ///
    /// The frame is written only while the connection is open; otherwise the
    /// call reports [`SendOutcome::NotConnected`] and the caller decides
    /// whether that matters.
    pub async fn send(&self, action: &ClientAction) -> Result<SendOutcome> {
        let outcome = self.connection.send(action).await?;
        if outcome == SendOutcome::NotConnected {
            tracing::debug!("dropping {} while not connected", action.kind());
        }
        Ok(outcome)
    }

    pub async fn submit_flag(&self, challenge_id: i64, flag: impl Into<String>) -> Result<SendOutcome> {
        self.send(&ClientAction::FlagSubmission {
            challenge_id,
            flag: flag.into(),
        })
        .await
    }

    pub async fn send_chat_message(&self, message: impl Into<String>) -> Result<SendOutcome> {
        self.send(&ClientAction::ChatMessage {
            message: message.into(),
        })
        .await
    }

    pub async fn request_team_status(&self) -> Result<SendOutcome> {
        self.send(&ClientAction::GetTeamStatus).await
    }

    pub async fn ping(&self) -> Result<SendOutcome> {
        self.send(&ClientAction::Ping).await
    }

    /// Wiring for the page-visibility hook: probes liveness and replays the
    /// recent notifications whose display may have been evicted while hidden.
    pub async fn handle_visibility_restored(&self) {
        if let Err(e) = self.ping().await {
            tracing::warn!("liveness probe failed: {}", e);
        }
        let replayed = self.notifications.replay_recent();
        tracing::debug!(replayed, "visibility restored");
    }

    /// Starts the periodic authoritative chart refresh against the arena API.
    /// The task is tracked and stops on [`disconnect()`](Self::disconnect).
    pub async fn start_chart_refresh(&self, api: ApiClient) {
        let handle = spawn_chart_refresh(api, Arc::clone(&self.charts), CHART_REFRESH_INTERVAL);
        self.state.write().await.task_manager.push(handle);
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    pub async fn state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// The shared subscription interface handed to UI consumers.
    pub fn registry(&self) -> Arc<EventRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn notifications(&self) -> Arc<NotificationCenter> {
        Arc::clone(&self.notifications)
    }

    pub fn charts(&self) -> Arc<ChartFeed> {
        Arc::clone(&self.charts)
    }

    pub fn team_score(&self) -> Arc<TeamScore> {
        Arc::clone(&self.score)
    }

    pub fn presence(&self) -> Arc<PresenceCounter> {
        Arc::clone(&self.presence)
    }

    /// Build the WebSocket endpoint URL with the fixed path and credential
    fn build_endpoint_url(&self, token: &str) -> Result<String> {
        let mut url = Url::parse(&self.endpoint)?;
        url.set_path(ARENA_WS_PATH);
        url.query_pairs_mut().append_pair(TOKEN_PARAM, token);
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn endpoint_url_carries_path_and_token() {
        let client =
            ArenaClient::new("wss://arena.example.com", ArenaClientOptions::default()).unwrap();
        let url = client.build_endpoint_url("secret-token").unwrap();
        assert_eq!(
            url,
            "wss://arena.example.com/api/ws/arena?token=secret-token"
        );
    }

    #[tokio::test]
    async fn non_websocket_scheme_is_rejected() {
        let result = ArenaClient::new("https://arena.example.com", ArenaClientOptions::default());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn send_while_idle_reports_not_connected() {
        let client =
            ArenaClient::new("wss://arena.example.com", ArenaClientOptions::default()).unwrap();
        let outcome = client.ping().await.unwrap();
        assert_eq!(outcome, SendOutcome::NotConnected);
    }

    #[tokio::test]
    async fn disconnect_from_idle_is_terminal_and_safe() {
        let client =
            ArenaClient::new("wss://arena.example.com", ArenaClientOptions::default()).unwrap();
        client.disconnect().await;
        assert_eq!(client.state().await, ConnectionState::Closed);
        assert!(!client.is_connected().await);
    }
}
