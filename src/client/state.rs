use super::connection::ConnectionState;
use crate::infrastructure::{Backoff, TaskManager};
use tokio::sync::watch;

/// Consolidated mutable state for ArenaClient
/// Using a single struct reduces lock contention
pub struct ClientState {
    /// Credential used for the last connect, kept for reconnection
    pub credential: Option<String>,

    /// Reconnect backoff policy; reset on every successful open
    pub backoff: Backoff,

    /// Background task manager (read task, reconnect loop, chart refresh)
    pub task_manager: TaskManager,

    /// Whether the disconnect was user-initiated (prevents auto-reconnect)
    pub was_manual_disconnect: bool,

    /// Guards against a second concurrent reconnect loop
    pub reconnect_in_flight: bool,

    /// Sender for state change notifications
    pub state_change_tx: Option<watch::Sender<(ConnectionState, bool)>>,
}

impl ClientState {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            credential: None,
            backoff,
            task_manager: TaskManager::new(),
            was_manual_disconnect: false,
            reconnect_in_flight: false,
            state_change_tx: None,
        }
    }

    /// Notify state change watchers
    pub fn notify_state_change(&self, state: ConnectionState, manual: bool) {
        if let Some(tx) = &self.state_change_tx
            && tx.send((state, manual)).is_err()
        {
            tracing::debug!(
                "State change watcher disconnected, could not notify state: {:?}",
                state
            );
        }
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new(Backoff::default())
    }
}
