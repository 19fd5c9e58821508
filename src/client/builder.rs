use super::{ArenaClient, ClientState, ConnectionManager, ConnectionState};
use crate::builtins::{self, PresenceCounter, TeamScore};
use crate::charts::ChartFeed;
use crate::infrastructure::Backoff;
use crate::messaging::EventRegistry;
use crate::notifications::{LogRenderer, NotificationCenter, NotificationRenderer};
use crate::types::constants::{
    MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY_MS, RECONNECT_MAX_DELAY_MS, RECONNECT_MULTIPLIER,
};
use crate::types::{ArenaError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use url::Url;

#[derive(Clone)]
pub struct ArenaClientOptions {
    /// Consecutive failed reconnect attempts before the transport gives up
    pub max_reconnect_attempts: u32,
    /// First reconnect delay, in milliseconds
    pub reconnect_base_delay_ms: u64,
    /// Reconnect delay cap, in milliseconds
    pub reconnect_max_delay_ms: u64,
    /// Display collaborator for toast notifications; defaults to logging only
    pub renderer: Option<Arc<dyn NotificationRenderer>>,
}

impl Default for ArenaClientOptions {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            reconnect_base_delay_ms: RECONNECT_BASE_DELAY_MS,
            reconnect_max_delay_ms: RECONNECT_MAX_DELAY_MS,
            renderer: None,
        }
    }
}

/// Builder for ArenaClient that validates the endpoint and wires the
/// built-in consumers and the reconnection watcher.
pub struct ArenaClientBuilder {
    endpoint: String,
    options: ArenaClientOptions,
}

impl ArenaClientBuilder {
    /// Create a new builder. The endpoint is the arena origin, e.g.
    /// `wss://arena.example.com`; the fixed WebSocket path is appended at
    /// connect time.
    pub fn new(endpoint: impl Into<String>, options: ArenaClientOptions) -> Result<Self> {
        let endpoint = endpoint.into();

        let url = Url::parse(&endpoint)?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ArenaError::Connection(format!(
                "endpoint must use ws:// or wss://, got {}",
                url.scheme()
            )));
        }

        Ok(Self { endpoint, options })
    }

    /// Build the client, register built-in consumers and spawn the
    /// reconnection watcher. Must be called within a tokio runtime.
    pub fn build(mut self) -> ArenaClient {
        let renderer = self
            .options
            .renderer
            .take()
            .unwrap_or_else(|| Arc::new(LogRenderer));

        let registry = Arc::new(EventRegistry::new());
        let notifications = Arc::new(NotificationCenter::new(renderer));
        let charts = Arc::new(ChartFeed::new());
        let score = Arc::new(TeamScore::new());
        let presence = Arc::new(PresenceCounter::new());
        builtins::register(&registry, &score, &presence, &notifications, &charts);

        let backoff = Backoff::new(
            Duration::from_millis(self.options.reconnect_base_delay_ms),
            Duration::from_millis(self.options.reconnect_max_delay_ms),
            self.options.max_reconnect_attempts,
            RECONNECT_MULTIPLIER,
        );
        let mut client_state = ClientState::new(backoff);

        let (state_tx, state_rx) = watch::channel((ConnectionState::Idle, false));
        client_state.state_change_tx = Some(state_tx);

        let client = ArenaClient {
            endpoint: self.endpoint,
            connection: Arc::new(ConnectionManager::new()),
            registry,
            state: Arc::new(RwLock::new(client_state)),
            notifications,
            charts,
            score,
            presence,
        };

        // Spawn reconnection watcher task
        let client_for_watcher = client.clone();
        tokio::spawn(async move {
            let mut rx = state_rx;

            while rx.changed().await.is_ok() {
                let (state, was_manual) = *rx.borrow_and_update();

                if state != ConnectionState::Closed || was_manual {
                    continue;
                }

                // A close during an active reconnect loop is that loop's next
                // attempt failing; it keeps driving the backoff itself. A
                // close notification still pending after the budget is spent
                // must not start a loop either, or the terminal disconnected
                // event would fire again.
                let spawn_loop = {
                    let mut st = client_for_watcher.state.write().await;
                    if st.reconnect_in_flight || st.backoff.is_exhausted() {
                        false
                    } else {
                        st.reconnect_in_flight = true;
                        true
                    }
                };
                if spawn_loop {
                    tracing::info!("connection closed, starting reconnect loop");
                    let client = client_for_watcher.clone();
                    let handle = tokio::spawn(async move { client.run_reconnect_loop().await });
                    client_for_watcher
                        .state
                        .write()
                        .await
                        .task_manager
                        .push(handle);
                }
            }
            tracing::debug!("reconnection watcher task finished");
        });

        client
    }
}
