//! Gatling service - runs Gatling load tests for Keptn `test.triggered` events

use clap::Parser;
use gatling_service::{cli, commands, common::logging};
use commands::Commands;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gatling-service", about = "Keptn test service running Gatling load tests")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    logging::init();

    let cli = Cli::parse();

    if let Err(e) = cli::dispatch(cli.command, cli.config.as_deref()).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
