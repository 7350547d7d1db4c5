//! Session transport: one authenticated, bidirectional, message-oriented
//! WebSocket connection to the monitoring service.
//!
//! The protocol has two message shapes. Correlated requests carry an ack id
//! echoed by the service's reply. Bulk data instead arrives as an
//! unsolicited push with no ack; the first matching push received after the
//! triggering request is treated as that operation's response. Because this
//! correlation is by order, concurrent uses of the push pattern on one
//! session are unsafe and callers must serialize them.

mod error;
mod frame;
mod session;

pub use error::TransportError;
pub use frame::Frame;
pub use session::{PushSubscription, Session, SessionOptions};
