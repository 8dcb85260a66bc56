//! Crate-level error types.
//!
//! [`CandlebookError`] unifies every error source (configuration, WebSocket,
//! HTTP, JSON) behind a single enum so callers can match on the variant they
//! care about while still using the `?` operator for easy propagation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CandlebookError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum CandlebookError {
    /// A configuration value was missing, unparsable, or out of range.
    #[error("configuration error: {0}")]
    Config(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The candlestick history request failed in transport.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A payload parsed as JSON but did not have the expected shape.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A send was attempted while no connection is open.
    #[error("connection is not open")]
    NotConnected,

    /// A candlestick resolution string was not recognised.
    #[error("invalid resolution: {0}")]
    InvalidResolution(String),
}
