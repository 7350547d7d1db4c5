//! The `list` subcommand: print the observed monitor snapshot.

use clap::Parser;

use super::{Error, connect_and_login, load_config, with_deadline};
use crate::client::MonitorApi;

/// Arguments for the `list` subcommand.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only show monitors that are actively checking.
    #[arg(long)]
    active_only: bool,
}

/// Prints every monitor the service currently holds.
pub async fn execute(args: ListArgs) -> Result<(), Error> {
    let config = load_config()?;
    let client = connect_and_login(&config).await?;

    let monitors = with_deadline(&config, &client, async {
        Ok(client.monitor_list().await?)
    })
    .await?;

    println!("{:>6}  {:<6}  {:<8}  {:<40}  target", "id", "active", "kind", "name");
    for monitor in monitors.values() {
        if args.active_only && !monitor.spec.active {
            continue;
        }
        println!(
            "{:>6}  {:<6}  {:<8}  {:<40}  {}",
            monitor.id,
            if monitor.spec.active { "yes" } else { "no" },
            monitor.spec.kind.to_string(),
            monitor.name(),
            monitor.spec.target
        );
    }

    Ok(())
}
