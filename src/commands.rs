//! CLI command definitions
//!
//! Defines the clap commands for the gatling service.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Handle a single CloudEvent
    Handle {
        /// File containing the event JSON (default: stdin)
        #[arg(long)]
        event: Option<PathBuf>,

        /// Write outbound events to stdout instead of the event broker
        #[arg(long)]
        print_events: bool,
    },

    /// Handle newline-delimited CloudEvents from stdin until EOF
    Serve {
        /// Write outbound events to stdout instead of the event broker
        #[arg(long)]
        print_events: bool,
    },
}
