//! The `error` module defines the error types used within the `gridsync`
//! application.
//!
//! This module centralizes error handling, providing a consistent way to
//! represent and propagate errors throughout the system.

use thiserror::Error;

/// Crate-wide error type.
///
/// Broker faults are surfaced to the caller of the operation that failed,
/// payload faults to the handler registered for that one message. Transport
/// drops are handled by session teardown and never appear here.
#[derive(Debug, Error)]
pub enum GridError {
    /// The broker connection is not established or has been lost.
    #[error("broker connection is not active")]
    BrokerInactive,

    /// Enqueueing a message towards the broker failed.
    #[error("failed to send to broker: {0}")]
    BrokerSend(String),

    /// WebSocket-level failure while talking to the broker or a client.
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    /// Socket-level I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A message body could not be (de)serialized as JSON.
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// A simulation start time could not be parsed.
    #[error("invalid start time {value:?}: {source}")]
    InvalidStartTime {
        value: String,
        #[source]
        source: chrono::format::ParseError,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
