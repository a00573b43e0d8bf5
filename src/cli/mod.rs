//! CLI command handling
//!
//! Builds a handler from configuration, feeds it events and prints outcomes.
//! Outcome lines go to stderr so stdout carries only events when
//! `--print-events` is set.

use colored::Colorize;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::dispatch::{self, ServeSummary};
use crate::engine::GatlingExecutor;
use crate::event::{CloudEvent, EventSender, HttpEventSender, StdoutEventSender};
use crate::handler::{HandlerSettings, RunOutcome, RunStatus, TestHandler};
use crate::resources::HttpResourceStore;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    match command {
        Commands::Handle {
            event,
            print_events,
        } => {
            let handler = build_handler(&config, print_events)?;
            let event = read_event(event.as_deref())?;

            match dispatch::handle_event(&handler, &event).await? {
                Some(outcome) => {
                    print_outcome(&outcome);
                    if outcome.status == RunStatus::Failed {
                        return Err(Error::RunFailed(outcome.message));
                    }
                }
                None => eprintln!("Ignored event of type {}", event.event_type),
            }

            Ok(())
        }

        Commands::Serve { print_events } => {
            let handler = Arc::new(build_handler(&config, print_events)?);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());

            tracing::info!("Reading events from stdin");
            let summary = dispatch::serve(handler, stdin, print_outcome).await?;
            print_summary(&summary);

            Ok(())
        }
    }
}

/// Wire the HTTP store, the chosen sender and the process executor together
fn build_handler(config: &Config, print_events: bool) -> Result<TestHandler> {
    let timeout = Duration::from_secs(config.resource_store.timeout_secs);
    let store = Arc::new(HttpResourceStore::new(&config.resource_store.url, timeout)?);

    let sender: Arc<dyn EventSender> = if print_events {
        Arc::new(StdoutEventSender)
    } else {
        Arc::new(HttpEventSender::new(config.events.endpoint.clone(), timeout)?)
    };

    let executor = Arc::new(GatlingExecutor::new(config.engine.executable.clone()));

    Ok(TestHandler::new(
        store,
        sender,
        executor,
        HandlerSettings::from(config),
    ))
}

/// Read one CloudEvent from a file, or stdin when no path is given
fn read_event(path: Option<&Path>) -> Result<CloudEvent> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    serde_json::from_str(&content).map_err(|e| Error::InvalidEvent(e.to_string()))
}

fn print_outcome(outcome: &RunOutcome) {
    let marker = match outcome.status {
        RunStatus::Succeeded => "✓".green().bold(),
        RunStatus::Skipped => "-".yellow().bold(),
        RunStatus::Failed => "✗".red().bold(),
    };
    let elapsed = outcome.finished_at - outcome.started_at;

    eprintln!(
        "{} {} {}",
        marker,
        outcome.message,
        format!("({}s)", elapsed.num_seconds()).as_str().dimmed()
    );
}

fn print_summary(summary: &ServeSummary) {
    eprintln!(
        "\n{} {} received, {} succeeded, {} skipped, {} failed, {} ignored, {} malformed, {} errors",
        "Summary:".cyan(),
        summary.received,
        summary.succeeded.to_string().as_str().green(),
        summary.skipped,
        summary.failed.to_string().as_str().red(),
        summary.ignored,
        summary.malformed,
        summary.errors
    );
}
