//! Error types for the session transport.

use std::time::Duration;

use thiserror::Error;

/// Defines the possible errors that can occur on the session transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The initial connection to the service endpoint failed. Fatal for the
    /// run; there is no retry beyond the transport's reconnection policy.
    #[error("Failed to connect to {url}: {source}")]
    Connect {
        /// The endpoint that refused the connection.
        url: String,
        /// The underlying WebSocket error.
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// No response arrived within the configured timeout. Reported to the
    /// caller as an ordinary error; the caller decides whether to continue.
    #[error("Request '{event}' timed out after {timeout:?}")]
    Timeout {
        /// The logical operation that timed out.
        event: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The session is closed, either explicitly or because the link dropped
    /// and reconnection attempts were exhausted.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A frame could not be encoded or decoded.
    #[error("Invalid frame: {0}")]
    Codec(#[from] serde_json::Error),
}
