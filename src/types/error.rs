use thiserror::Error;

/// Errors that can occur when using the arena realtime client.
#[derive(Error, Debug)]
pub enum ArenaError {
    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// Authentication or authorization error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Inbound frame that could not be routed (missing or invalid discriminator)
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error (historical activity / profile collaborators)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Convenience type alias for `Result<T, ArenaError>`.
pub type Result<T> = std::result::Result<T, ArenaError>;
