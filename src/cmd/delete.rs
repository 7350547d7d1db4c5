//! The `delete` subcommand: explicit monitor deletion by id.

use clap::Parser;

use super::{Error, connect_and_login, load_config, with_deadline};
use crate::reconciler::Reconciler;

/// Arguments for the `delete` subcommand. An empty id list is a usage error
/// rejected by the parser before any network call.
#[derive(Parser, Debug)]
pub struct DeleteArgs {
    /// Service-assigned ids of the monitors to delete.
    #[arg(required = true)]
    ids: Vec<i64>,
}

/// Deletes the named monitors, reporting per-id outcomes.
pub async fn execute(args: DeleteArgs) -> Result<(), Error> {
    let config = load_config()?;
    let client = connect_and_login(&config).await?;

    let results = with_deadline(&config, &client, async {
        Ok(Reconciler::new(&client).delete_monitors(&args.ids).await?)
    })
    .await?;

    for result in &results {
        match &result.error {
            None => println!("{}: deleted", result.id),
            Some(error) => println!("{}: failed ({error})", result.id),
        }
    }

    Ok(())
}
