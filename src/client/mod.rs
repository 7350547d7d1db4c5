//! Typed client for the monitoring service's RPC surface.

mod service;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::collections::BTreeMap;
use thiserror::Error;

pub use service::{ServiceClient, is_duplicate_name};

use crate::{
    models::{MonitorSpec, ObservedGroup, ObservedMonitor, StatusPage},
    transport::TransportError,
};

/// Defines the possible errors that can occur while talking to the service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// An error on the underlying session transport.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An operation was issued before authentication succeeded. This is a
    /// programmer error and is never retried.
    #[error("Not authenticated: login must precede all other operations")]
    NotAuthenticated,

    /// The service rejected the supplied credentials.
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// The service answered an operation with `ok: false`.
    #[error("Operation '{operation}' rejected by service: {message}")]
    Rejected {
        /// The logical operation that was rejected.
        operation: String,
        /// The service's error message.
        message: String,
    },

    /// The service's response did not have the expected shape.
    #[error("Malformed response for '{operation}': {detail}")]
    MalformedResponse {
        /// The logical operation whose response was malformed.
        operation: String,
        /// What was wrong with it.
        detail: String,
    },
}

impl ClientError {
    /// True when this error is the service reporting a name-uniqueness
    /// conflict on create, which the reconciler treats as an idempotent
    /// no-op rather than a failure.
    pub fn is_duplicate_name(&self) -> bool {
        matches!(self, ClientError::Rejected { message, .. } if is_duplicate_name(message))
    }

    /// True when this error must abort the run instead of being recorded as
    /// a per-item failure: connection-level transport errors, loss of the
    /// session, and authentication problems. Per-request timeouts and
    /// business-level rejections stay recoverable.
    pub fn is_fatal(&self) -> bool {
        match self {
            ClientError::Transport(TransportError::Connect { .. })
            | ClientError::Transport(TransportError::ConnectionClosed)
            | ClientError::NotAuthenticated
            | ClientError::AuthRejected(_) => true,
            ClientError::Transport(_)
            | ClientError::Rejected { .. }
            | ClientError::MalformedResponse { .. } => false,
        }
    }
}

/// The monitoring service operations the reconciler and group rebuilder
/// consume. Authentication is handled by the concrete client before any of
/// these are called.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MonitorApi: Send + Sync {
    /// Fetches the current monitor snapshot, keyed by service-assigned id.
    ///
    /// The service answers this with an unsolicited bulk push rather than a
    /// direct reply, so implementations subscribe before triggering and wait
    /// for the first matching push.
    async fn monitor_list(&self) -> Result<BTreeMap<i64, ObservedMonitor>, ClientError>;

    /// Creates a monitor, returning the id the service assigned.
    async fn create_monitor(&self, spec: &MonitorSpec) -> Result<i64, ClientError>;

    /// Replaces an existing monitor's definition.
    async fn update_monitor(&self, id: i64, spec: &MonitorSpec) -> Result<(), ClientError>;

    /// Deletes a monitor by id.
    async fn delete_monitor(&self, id: i64) -> Result<(), ClientError>;

    /// Fetches a status page's configuration and published groups.
    async fn status_page(&self, slug: &str) -> Result<StatusPage, ClientError>;

    /// Replaces a status page's group list wholesale. The protocol requires
    /// the entire configuration and group list in one atomic write.
    async fn save_status_page(
        &self,
        slug: &str,
        page: &StatusPage,
        groups: &[ObservedGroup],
    ) -> Result<(), ClientError>;
}
