use std::time::Duration;

/// Transport lifecycle event names (magic strings layer)
pub mod lifecycle {
    pub const CONNECTED: &str = "connected";
    pub const DISCONNECTED: &str = "disconnected";
    pub const ERROR: &str = "error";
}

/// Server-pushed event names with built-in handling
pub mod server_events {
    pub const NOTIFICATION: &str = "notification";
    pub const TEAM_FLAG_SUBMITTED: &str = "team_flag_submitted";
    pub const USER_CONNECTED: &str = "user_connected";
    pub const USER_DISCONNECTED: &str = "user_disconnected";
    pub const TEAM_STATUS: &str = "team_status";
}

/// Fixed WebSocket path on the arena server
pub const ARENA_WS_PATH: &str = "/api/ws/arena";

/// Query parameter carrying the handshake credential
pub const TOKEN_PARAM: &str = "token";

/// Reconnect backoff: base delay (milliseconds)
pub const RECONNECT_BASE_DELAY_MS: u64 = 1000;

/// Reconnect backoff: delay cap (milliseconds)
pub const RECONNECT_MAX_DELAY_MS: u64 = 30_000;

/// Reconnect backoff: growth factor applied after every failed attempt
pub const RECONNECT_MULTIPLIER: f64 = 1.5;

/// Consecutive failed attempts before the transport gives up
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default toast lifetime
pub const NOTIFICATION_DURATION: Duration = Duration::from_millis(5000);

/// Error toasts stay longer
pub const ERROR_NOTIFICATION_DURATION: Duration = Duration::from_millis(8000);

/// Notifications younger than this are re-rendered on visibility recovery
pub const NOTIFICATION_REPLAY_WINDOW: Duration = Duration::from_secs(300);

/// Interval of the authoritative chart history refresh
pub const CHART_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Rolling bound of the submission timeline series
pub const SUBMISSION_TIMELINE_POINTS: usize = 24;

/// Rolling bound of the score progression series
pub const SCORE_PROGRESSION_POINTS: usize = 50;
