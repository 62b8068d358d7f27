//! Error types for the feed synchronization client

use thiserror::Error;

/// Main error type for feed synchronization operations
///
/// Most failures never reach the caller: transport errors are recovered
/// through the reconnect policy and surface only as connection-state
/// changes, protocol errors discard the offending message, and poll
/// errors are retried on the next scheduled interval. Only publish
/// failures (and the terminal reconnect-exhausted state) are user-visible.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Push channel failed to open or closed unexpectedly
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed inbound payload; the message is discarded
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Both the push send and the request/response fallback failed
    #[error("Publish failed: {0}")]
    Publish(String),

    /// Fallback refresh request failed; retried on the next interval
    #[error("Poll failed: {0}")]
    Poll(String),

    /// HTTP-level error from the pull channel
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using FeedError
pub type FeedResult<T> = Result<T, FeedError>;
