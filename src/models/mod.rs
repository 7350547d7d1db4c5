//! Data model shared between the catalog, the reconciler and the service
//! client.

pub mod group;
pub mod monitor;
pub mod summary;

pub use group::{GroupSpec, ObservedGroup, StatusPage};
pub use monitor::{MonitorKind, MonitorSpec, ObservedMonitor};
pub use summary::{Category, CategorySummary, FailedItem, RunSummary};
