// Module declarations
mod builder;
mod connection;
mod core;
mod state;

// Public API exports
pub use builder::{ArenaClientBuilder, ArenaClientOptions};
pub use connection::{ConnectionManager, ConnectionState, SendOutcome};
pub use core::ArenaClient;
pub use state::ClientState;
