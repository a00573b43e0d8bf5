//! Inbound event routing
//!
//! Events arrive as CloudEvent JSON; `serve` reads one event per line and
//! runs each in its own task.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::{JoinError, JoinSet};

use crate::common::Result;
use crate::event::{CloudEvent, TriggerRequest, TEST_TRIGGERED};
use crate::handler::{RunOutcome, RunStatus, TestHandler};

/// Handle one inbound event
///
/// Returns `Ok(None)` for event types this service does not handle.
pub async fn handle_event(handler: &TestHandler, event: &CloudEvent) -> Result<Option<RunOutcome>> {
    match event.event_type.as_str() {
        TEST_TRIGGERED => {
            let request = TriggerRequest::from_event(event)?;
            handler.execute(&request).await.map(Some)
        }
        other => {
            tracing::debug!("Ignoring event {} of type {}", event.id, other);
            Ok(None)
        }
    }
}

/// Counters for a `serve` session
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServeSummary {
    pub received: usize,
    pub malformed: usize,
    pub ignored: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Runs that ended with an error instead of an outcome
    pub errors: usize,
}

impl ServeSummary {
    fn record_run(
        &mut self,
        joined: std::result::Result<Result<Option<RunOutcome>>, JoinError>,
    ) -> Option<RunOutcome> {
        match joined {
            Ok(Ok(Some(outcome))) => {
                match outcome.status {
                    RunStatus::Skipped => self.skipped += 1,
                    RunStatus::Succeeded => self.succeeded += 1,
                    RunStatus::Failed => self.failed += 1,
                }
                return Some(outcome);
            }
            Ok(Ok(None)) => self.ignored += 1,
            Ok(Err(e)) => {
                tracing::error!("Run ended with error: {}", e);
                self.errors += 1;
            }
            Err(e) => {
                tracing::error!("Run task failed: {}", e);
                self.errors += 1;
            }
        }
        None
    }
}

/// Read newline-delimited CloudEvents until EOF and handle them concurrently
///
/// Finished runs are collected while reading continues and passed to
/// `on_outcome` as they complete. Returns once the input is exhausted and
/// every spawned run has completed.
pub async fn serve<R, F>(
    handler: Arc<TestHandler>,
    reader: R,
    mut on_outcome: F,
) -> Result<ServeSummary>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(&RunOutcome),
{
    let mut lines = reader.lines();
    let mut runs = JoinSet::new();
    let mut summary = ServeSummary::default();
    let mut reading = true;

    while reading || !runs.is_empty() {
        tokio::select! {
            line = lines.next_line(), if reading => match line? {
                Some(line) => {
                    if let Some(event) = parse_line(&line, &mut summary) {
                        let handler = Arc::clone(&handler);
                        runs.spawn(async move { handle_event(&handler, &event).await });
                    }
                }
                None => reading = false,
            },
            Some(joined) = runs.join_next(), if !runs.is_empty() => {
                if let Some(outcome) = summary.record_run(joined) {
                    on_outcome(&outcome);
                }
            }
        }
    }

    Ok(summary)
}

/// Decode one input line, counting it unless it is blank
fn parse_line(line: &str, summary: &mut ServeSummary) -> Option<CloudEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    summary.received += 1;

    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!("Discarding malformed event: {}", e);
            summary.malformed += 1;
            None
        }
    }
}
