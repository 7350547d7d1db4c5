//! This module defines the desired and observed shapes of a monitor on the
//! remote uptime-monitoring service.

use serde::{Deserialize, Serialize};

/// The kind of check a monitor performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorKind {
    /// An HTTP(S) check against a URL, optionally watching certificate expiry.
    Http,
    /// A DNS resolution check against a hostname.
    Dns,
}

impl std::fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorKind::Http => write!(f, "http"),
            MonitorKind::Dns => write!(f, "dns"),
        }
    }
}

/// A desired monitor as declared in the catalog.
///
/// The `name` is the sole correlation key between desired and observed
/// entities; the service assigns its own numeric id on creation and that id
/// is never known ahead of time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSpec {
    /// Name of the monitor, unique within the catalog.
    pub name: String,

    /// The kind of check this monitor performs.
    pub kind: MonitorKind,

    /// The URL (HTTP) or hostname (DNS) being checked.
    pub target: String,

    /// Seconds between checks.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Seconds between retries after a failed check.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,

    /// Number of consecutive failures before the monitor is considered down.
    #[serde(default = "default_max_retries")]
    pub max_retries: u64,

    /// Per-check timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Status codes treated as success, each an exact code ("301") or an
    /// inclusive range ("200-299"). Empty is only valid for DNS monitors.
    #[serde(default)]
    pub accepted_status_codes: Vec<String>,

    /// Whether the service should warn about an expiring TLS certificate.
    /// HTTP monitors only.
    #[serde(default)]
    pub certificate_expiry_check: bool,

    /// DNS record type to resolve (e.g. "A"). DNS monitors only.
    #[serde(default)]
    pub dns_record_type: Option<String>,

    /// Address of the resolver to query. DNS monitors only.
    #[serde(default)]
    pub dns_resolver: Option<String>,

    /// Ids of the notification channels to bind to this monitor. Opaque to
    /// this system.
    #[serde(default)]
    pub notification_ids: Vec<i64>,

    /// Whether the monitor is actively checking.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_check_interval() -> u64 {
    60
}

fn default_retry_interval() -> u64 {
    60
}

fn default_max_retries() -> u64 {
    3
}

fn default_timeout() -> u64 {
    48
}

fn default_active() -> bool {
    true
}

/// A monitor as currently held by the remote service, carrying the
/// service-assigned numeric id alongside the semantic fields of
/// [`MonitorSpec`].
#[derive(Debug, Clone)]
pub struct ObservedMonitor {
    /// Service-assigned identifier.
    pub id: i64,
    /// The semantic definition of the monitor.
    pub spec: MonitorSpec,
}

impl ObservedMonitor {
    /// The monitor's name, the correlation key against the catalog.
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}
