//! Application configuration: environment-supplied credentials and
//! endpoints, plus the generic YAML loader used for the catalog file.

mod app_config;
mod helpers;
mod loader;

pub use app_config::AppConfig;
pub use helpers::{deserialize_duration_from_ms, deserialize_duration_from_secs};
pub use loader::{ConfigLoader, LoaderError};
