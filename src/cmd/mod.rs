//! Subcommand implementations and their shared plumbing.

mod delete;
mod edit;
mod list;
mod sync;

use std::time::Duration;

use thiserror::Error;

pub use delete::{DeleteArgs, execute as delete};
pub use edit::{EditArgs, execute as edit};
pub use list::{ListArgs, execute as list};
pub use sync::{SyncArgs, execute as sync};

use crate::{
    catalog::CatalogError,
    client::{ClientError, ServiceClient},
    config::AppConfig,
    transport::{Session, SessionOptions, TransportError},
};

/// Errors surfaced by the subcommands. Every variant is fatal for the run
/// and maps to exit code 1; per-item failures never appear here, only in the
/// printed summary.
#[derive(Debug, Error)]
pub enum Error {
    /// The account credentials are not set in the environment.
    #[error("{0}\nusage: set SIGNALBOX_USERNAME and SIGNALBOX_PASSWORD in the environment")]
    MissingCredentials(config::ConfigError),

    /// The environment configuration could not be read for another reason,
    /// such as a malformed value.
    #[error("Configuration error: {0}")]
    Config(config::ConfigError),

    /// The catalog failed to load or validate.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The transport could not be established.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A fatal service error (authentication rejection, lost session).
    #[error("Service error: {0}")]
    Client(#[from] ClientError),

    /// The run-scoped deadline expired; the session has been closed.
    #[error("Run deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// An explicit per-id operation referenced an unknown monitor.
    #[error("No monitor with id {0}")]
    UnknownMonitor(i64),
}

/// Reads the application configuration, attributing the failure to absent
/// credential variables only when they are actually absent.
pub(crate) fn load_config() -> Result<AppConfig, Error> {
    let credentials_present = std::env::var("SIGNALBOX_USERNAME").is_ok()
        && std::env::var("SIGNALBOX_PASSWORD").is_ok();
    AppConfig::from_env().map_err(|error| classify_config_error(error, credentials_present))
}

fn classify_config_error(error: config::ConfigError, credentials_present: bool) -> Error {
    if credentials_present {
        Error::Config(error)
    } else {
        Error::MissingCredentials(error)
    }
}

/// Opens a session and authenticates it from the application configuration.
pub(crate) async fn connect_and_login(config: &AppConfig) -> Result<ServiceClient, Error> {
    // The handshake shares the per-request bound so no phase of the run,
    // including the connect itself, can wait unboundedly.
    let options = SessionOptions {
        connect_timeout: config.request_timeout,
        reconnect_attempts: config.reconnect_attempts,
        reconnect_delay: config.reconnect_delay,
    };
    let session = Session::connect(&config.url, options).await?;
    let client = ServiceClient::new(session, config.request_timeout, config.settle_delay);

    if let Err(error) = client.login(&config.username, &config.password).await {
        client.close().await;
        return Err(error.into());
    }
    Ok(client)
}

/// Runs `work` under the run-scoped deadline, closing the client on every
/// exit path including expiry.
pub(crate) async fn with_deadline<F, T>(
    config: &AppConfig,
    client: &ServiceClient,
    work: F,
) -> Result<T, Error>
where
    F: std::future::Future<Output = Result<T, Error>>,
{
    let outcome = tokio::time::timeout(config.run_timeout, work).await;
    client.close().await;
    match outcome {
        Ok(result) => result,
        Err(_) => Err(Error::DeadlineExceeded(config.run_timeout)),
    }
}
