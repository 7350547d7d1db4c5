#![warn(missing_docs)]
//! Signalbox keeps a remote uptime-monitoring service in sync with a
//! declarative catalog of monitor definitions and status-page groups.

pub mod catalog;
pub mod client;
pub mod cmd;
pub mod config;
pub mod groups;
pub mod models;
pub mod reconciler;
pub mod transport;
