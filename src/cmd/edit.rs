//! The `edit` subcommand: explicit monitor updates by id.

use clap::Parser;

use super::{Error, connect_and_login, load_config, with_deadline};
use crate::{client::MonitorApi, reconciler::Reconciler};

/// Arguments for the `edit` subcommand.
#[derive(Parser, Debug)]
pub struct EditArgs {
    /// Service-assigned id of the monitor to edit.
    id: i64,

    /// Pause (false) or resume (true) checking.
    #[arg(long)]
    active: Option<bool>,

    /// New check interval in seconds.
    #[arg(long)]
    interval: Option<u64>,

    /// New retry count before the monitor is considered down.
    #[arg(long)]
    max_retries: Option<u64>,
}

/// Applies the requested field changes to one monitor.
pub async fn execute(args: EditArgs) -> Result<(), Error> {
    let config = load_config()?;
    let client = connect_and_login(&config).await?;

    with_deadline(&config, &client, async {
        let monitors = client.monitor_list().await?;
        let observed = monitors.get(&args.id).ok_or(Error::UnknownMonitor(args.id))?;

        let mut spec = observed.spec.clone();
        if let Some(active) = args.active {
            spec.active = active;
        }
        if let Some(interval) = args.interval {
            spec.check_interval_secs = interval;
        }
        if let Some(max_retries) = args.max_retries {
            spec.max_retries = max_retries;
        }

        Reconciler::new(&client).edit_monitor(args.id, &spec).await?;
        println!("{}: updated", args.id);
        Ok(())
    })
    .await
}
