use clap::{Parser, Subcommand};
use signalbox::cmd;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconciles the catalog against the service and rebuilds the
    /// status-page groups.
    Sync(cmd::SyncArgs),
    /// Prints the monitors the service currently holds.
    List(cmd::ListArgs),
    /// Deletes monitors by service-assigned id.
    Delete(cmd::DeleteArgs),
    /// Edits one monitor by service-assigned id.
    Edit(cmd::EditArgs),
}

#[tokio::main]
async fn main() {
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sync(args) => cmd::sync(args).await,
        Commands::List(args) => cmd::list(args).await,
        Commands::Delete(args) => cmd::delete(args).await,
        Commands::Edit(args) => cmd::edit(args).await,
    };

    // Fatal conditions terminate with one diagnostic line and exit code 1.
    // Per-item failures do not end up here; they are reported in the summary
    // and leave the exit code at 0.
    if let Err(error) = result {
        eprintln!("signalbox: {error}");
        std::process::exit(1);
    }
}
