//! The `sync` subcommand: full reconciliation plus group rebuild.

use std::path::PathBuf;

use clap::Parser;

use super::{Error, connect_and_login, load_config, with_deadline};
use crate::{
    catalog::Catalog,
    groups::{GroupRebuilder, GroupReport},
    models::RunSummary,
    reconciler::Reconciler,
};

/// Arguments for the `sync` subcommand.
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Path to the catalog file. Overrides SIGNALBOX_CATALOG_PATH.
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Status-page slug to rebuild. Overrides SIGNALBOX_STATUS_PAGE_SLUG.
    #[arg(short, long)]
    slug: Option<String>,
}

/// Reconciles the catalog and rebuilds the status-page groups.
///
/// The process exits 0 whenever the run itself completes, even if individual
/// items failed; failures are only reported in the printed summary.
pub async fn execute(args: SyncArgs) -> Result<(), Error> {
    let config = load_config()?;
    let catalog_path = args.catalog.unwrap_or_else(|| config.catalog_path.clone());
    let slug = args.slug.unwrap_or_else(|| config.status_page_slug.clone());

    // Catalog validation happens before a single network call.
    let catalog = Catalog::load(&catalog_path)?;
    tracing::info!(
        monitors = catalog.all_monitors().count(),
        groups = catalog.groups.len(),
        "Catalog loaded"
    );

    let client = connect_and_login(&config).await?;
    let (summary, report) = with_deadline(&config, &client, async {
        let summary = Reconciler::new(&client).reconcile(&catalog).await?;
        let report = GroupRebuilder::new(&client, &slug).rebuild(&catalog).await?;
        Ok((summary, report))
    })
    .await?;

    print_summary(&summary, &report);
    Ok(())
}

fn print_summary(summary: &RunSummary, report: &GroupReport) {
    println!("category  created  skipped  failed");
    for (category, counts) in &summary.categories {
        println!(
            "{:<8}  {:>7}  {:>7}  {:>6}",
            category.to_string(),
            counts.created,
            counts.skipped,
            counts.failed
        );
    }
    println!(
        "groups    preserved {} foreign, published {} owned, omitted {} empty",
        report.preserved, report.published, report.omitted
    );

    if !summary.failures.is_empty() {
        println!("\nfailures:");
        for failure in &summary.failures {
            println!("  {}: {}", failure.name, failure.error);
        }
    }
}
