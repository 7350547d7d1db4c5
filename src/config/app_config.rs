//! Runtime configuration, read from `SIGNALBOX_*` environment variables.

use std::{path::PathBuf, time::Duration};

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use url::Url;

use super::{deserialize_duration_from_ms, deserialize_duration_from_secs};

fn default_url() -> Url {
    Url::parse("ws://localhost:3001/socket").expect("valid default endpoint")
}

fn default_status_page_slug() -> String {
    "status".to_string()
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("configs/catalog.yaml")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_run_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_settle_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_reconnect_attempts() -> u32 {
    3
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(2)
}

/// Application configuration for Signalbox.
///
/// Credentials are required; everything else has a default. All values come
/// from `SIGNALBOX_*` environment variables so the binary needs no
/// configuration file besides the catalog.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// WebSocket endpoint of the monitoring service.
    #[serde(default = "default_url")]
    pub url: Url,

    /// Account used to authenticate the session.
    pub username: String,

    /// Password for the account.
    pub password: String,

    /// Slug of the status page whose groups this system owns.
    #[serde(default = "default_status_page_slug")]
    pub status_page_slug: String,

    /// Path to the desired-state catalog file.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Timeout applied to every individual request on the session.
    #[serde(
        deserialize_with = "deserialize_duration_from_secs",
        default = "default_request_timeout",
        rename = "request_timeout_secs"
    )]
    pub request_timeout: Duration,

    /// Deadline for the whole run. On expiry the session is closed and the
    /// process exits non-zero.
    #[serde(
        deserialize_with = "deserialize_duration_from_secs",
        default = "default_run_timeout",
        rename = "run_timeout_secs"
    )]
    pub run_timeout: Duration,

    /// Settle delay between subscribing to a bulk push and triggering it,
    /// so the push handler is registered before the service emits.
    #[serde(
        deserialize_with = "deserialize_duration_from_ms",
        default = "default_settle_delay",
        rename = "settle_delay_ms"
    )]
    pub settle_delay: Duration,

    /// Number of reconnection attempts after the link drops mid-run.
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    /// Fixed backoff between reconnection attempts.
    #[serde(
        deserialize_with = "deserialize_duration_from_secs",
        default = "default_reconnect_delay",
        rename = "reconnect_delay_secs"
    )]
    pub reconnect_delay: Duration,
}

impl AppConfig {
    /// Reads the configuration from the environment. Fails before any
    /// network call when `SIGNALBOX_USERNAME` or `SIGNALBOX_PASSWORD` is
    /// missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(Environment::with_prefix("SIGNALBOX"))
            .build()?;
        s.try_deserialize()
    }

    /// Creates a new `AppConfigBuilder` for testing purposes.
    #[cfg(test)]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// A builder for creating `AppConfig` instances for testing.
#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl Default for AppConfigBuilder {
    fn default() -> Self {
        Self {
            config: AppConfig {
                url: default_url(),
                username: "admin".into(),
                password: "secret".into(),
                status_page_slug: default_status_page_slug(),
                catalog_path: default_catalog_path(),
                request_timeout: default_request_timeout(),
                run_timeout: default_run_timeout(),
                settle_delay: Duration::from_millis(0),
                reconnect_attempts: default_reconnect_attempts(),
                reconnect_delay: default_reconnect_delay(),
            },
        }
    }
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn url(mut self, url: Url) -> Self {
        self.config.url = url;
        self
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.config.username = username.to_string();
        self.config.password = password.to_string();
        self
    }

    pub fn status_page_slug(mut self, slug: &str) -> Self {
        self.config.status_page_slug = slug.to_string();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
