//! Wire frames exchanged with the monitoring service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single JSON text message on the session.
///
/// Requests carry an `ack` id which the service echoes on its reply; the
/// reply's `event` is ignored for correlation purposes. Pushes carry no
/// `ack` and are dispatched to subscribers by event name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Logical operation or push name.
    pub event: String,

    /// Correlation id. Present on requests and their replies, absent on
    /// pushes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,

    /// Operation payload.
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    /// Builds a request frame with the given correlation id.
    pub fn request(event: &str, ack: u64, data: Value) -> Self {
        Self { event: event.to_string(), ack: Some(ack), data }
    }

    /// True when this frame is an unsolicited push rather than a reply.
    pub fn is_push(&self) -> bool {
        self.ack.is_none()
    }
}
