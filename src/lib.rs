//! # Arena Realtime
//!
//! Realtime event pipeline client for a CTF competition platform.
//!
//! One persistent WebSocket connection per session survives network flaps
//! through backoff-driven reconnection and multiplexes heterogeneous
//! server-pushed events to independent consumers: the notification queue,
//! the chart feed, and any subscriber registered on the event registry.
//! Consumers observe connection churn only as a brief gap in events.
//!
//! ## Example
//!
//! ```no_run
//! use arena_realtime::{ArenaClient, ArenaClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ArenaClient::new(
//!         "wss://arena.example.com",
//!         ArenaClientOptions::default(),
//!     )?;
//!
//!     // Independent widgets subscribe without touching the socket.
//!     let registry = client.registry();
//!     registry.on("team_flag_submitted", |frame| {
//!         println!("teammate scored: {frame}");
//!     });
//!
//!     client.connect("session-token").await?;
//!     client.submit_flag(42, "flag{hello}").await?;
//!     Ok(())
//! }
//! ```

pub mod builtins;
pub mod charts;
pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod notifications;
pub mod types;

pub use builtins::{PresenceCounter, TeamScore};
pub use charts::{CategoryStats, ChartFeed, SeriesPoint};
pub use client::{
    ArenaClient, ArenaClientBuilder, ArenaClientOptions, ConnectionState, SendOutcome,
};
pub use infrastructure::{ApiClient, TeamActivity, UserProfile};
pub use messaging::{ClientAction, EventRegistry, HandlerId, MessageRouter};
pub use notifications::{
    Notification, NotificationAction, NotificationCenter, NotificationId, NotificationKind,
    NotificationPatch, NotificationRenderer, NotificationSpec,
};
pub use types::{ArenaError, Result};
