//! The desired-state catalog: every monitor that should exist on the
//! service and every status-page group this system owns.
//!
//! The catalog is loaded once at startup, validated, and then immutable; it
//! is passed by reference into the reconciler and the group rebuilder rather
//! than living in ambient static state.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::{
    config::{ConfigLoader, LoaderError},
    models::{Category, GroupSpec, MonitorKind, MonitorSpec},
};

/// An error that occurs while loading or validating the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be loaded.
    #[error("Failed to load catalog: {0}")]
    Load(#[from] LoaderError),

    /// Two monitor specs share the same name.
    #[error("Duplicate monitor name in catalog: '{0}'")]
    DuplicateMonitorName(String),

    /// Two group specs share the same name.
    #[error("Duplicate group name in catalog: '{0}'")]
    DuplicateGroupName(String),

    /// A DNS monitor declares accepted status codes, which only apply to
    /// HTTP checks.
    #[error("DNS monitor '{0}' must not declare accepted status codes")]
    DnsWithStatusCodes(String),

    /// An HTTP monitor declares no accepted status codes.
    #[error("HTTP monitor '{0}' must declare at least one accepted status code")]
    HttpWithoutStatusCodes(String),

    /// A DNS monitor is missing its record type.
    #[error("DNS monitor '{0}' must declare a dns_record_type")]
    DnsWithoutRecordType(String),

    /// An HTTP monitor carries DNS-only fields.
    #[error("HTTP monitor '{0}' must not declare DNS resolver fields")]
    HttpWithDnsFields(String),

    /// A DNS monitor asks for certificate-expiry checking.
    #[error("DNS monitor '{0}' cannot check certificate expiry")]
    DnsWithCertificateCheck(String),

    /// A group references no monitors at all.
    #[error("Group '{0}' references no monitors")]
    EmptyGroup(String),
}

/// The catalog's monitor sections, one per check category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorSections {
    /// Certificate-expiry checks.
    #[serde(default)]
    pub ssl: Vec<MonitorSpec>,
    /// DNS resolution checks.
    #[serde(default)]
    pub dns: Vec<MonitorSpec>,
    /// HTTP health checks.
    #[serde(default)]
    pub http: Vec<MonitorSpec>,
}

/// The complete desired state: monitors by category plus owned status-page
/// groups.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    /// Desired monitors, grouped by check category.
    #[serde(default)]
    pub monitors: MonitorSections,
    /// Status-page groups owned by this catalog, in display order.
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

impl Catalog {
    /// Loads and validates the catalog from a YAML file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let catalog: Catalog = ConfigLoader::new(path.to_path_buf()).load()?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// The monitor sections in summary order.
    pub fn sections(&self) -> [(Category, &[MonitorSpec]); 3] {
        [
            (Category::Ssl, self.monitors.ssl.as_slice()),
            (Category::Dns, self.monitors.dns.as_slice()),
            (Category::Http, self.monitors.http.as_slice()),
        ]
    }

    /// All desired monitor specs across sections, in catalog order.
    pub fn all_monitors(&self) -> impl Iterator<Item = &MonitorSpec> {
        self.monitors
            .ssl
            .iter()
            .chain(self.monitors.dns.iter())
            .chain(self.monitors.http.iter())
    }

    /// Validates the catalog invariants. Called by [`Catalog::load`]; any
    /// violation is fatal before a single network call is made.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut names = HashSet::new();
        for spec in self.all_monitors() {
            if !names.insert(spec.name.as_str()) {
                return Err(CatalogError::DuplicateMonitorName(spec.name.clone()));
            }
            validate_monitor(spec)?;
        }

        let mut group_names = HashSet::new();
        for group in &self.groups {
            if !group_names.insert(group.name.as_str()) {
                return Err(CatalogError::DuplicateGroupName(group.name.clone()));
            }
            if group.members.is_empty() {
                return Err(CatalogError::EmptyGroup(group.name.clone()));
            }
        }

        Ok(())
    }
}

fn validate_monitor(spec: &MonitorSpec) -> Result<(), CatalogError> {
    match spec.kind {
        MonitorKind::Dns => {
            if !spec.accepted_status_codes.is_empty() {
                return Err(CatalogError::DnsWithStatusCodes(spec.name.clone()));
            }
            if spec.dns_record_type.is_none() {
                return Err(CatalogError::DnsWithoutRecordType(spec.name.clone()));
            }
            if spec.certificate_expiry_check {
                return Err(CatalogError::DnsWithCertificateCheck(spec.name.clone()));
            }
        }
        MonitorKind::Http => {
            if spec.accepted_status_codes.is_empty() {
                return Err(CatalogError::HttpWithoutStatusCodes(spec.name.clone()));
            }
            if spec.dns_record_type.is_some() || spec.dns_resolver.is_some() {
                return Err(CatalogError::HttpWithDnsFields(spec.name.clone()));
            }
        }
    }
    Ok(())
}
