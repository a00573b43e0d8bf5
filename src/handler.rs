//! Test run orchestration
//!
//! A run answers one `test.triggered` event:
//! 1. send `test.started`
//! 2. resolve the service URL
//! 3. create a private workspace and sync `gatling/` resources into it
//! 4. restore default Gatling configuration that the resources did not supply
//! 5. resolve the simulation, from the workload mapping if there is one
//! 6. run the engine
//! 7. send exactly one `test.finished`
//!
//! The workspace is removed when the run ends, whichever way it ends.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::engine::{ambient_environment, build_environment, simulation_args, ExecutionHandler};
use crate::event::types::format_timestamp;
use crate::event::{
    resolve_service_url, CloudEvent, EventData, EventSender, Status, TestFinishedDetails,
    TestFinishedEventData, TestResult, TriggerRequest, TEST_FINISHED, TEST_STARTED,
};
use crate::resources::{
    restore_default_conf_files, sync_resources, ResourceStore, RESOURCE_PREFIX,
};
use crate::workload::{load_workload_config, resolve_simulation_name};

/// Prefix of every human-readable outcome message
const MESSAGE_PREFIX: &str = "Gatling test";

/// Settings a handler is constructed with
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    /// Directory under which per-run workspaces are created
    pub temp_root: PathBuf,
    /// Gatling installation holding the default `conf/` files
    pub install_root: PathBuf,
    /// Fail runs whose workload mapping cannot be parsed
    pub strict_workload: bool,
}

impl From<&Config> for HandlerSettings {
    fn from(config: &Config) -> Self {
        Self {
            temp_root: config.workspace.temp_root.clone(),
            install_root: config.workspace.install_root.clone(),
            strict_workload: config.workload.strict,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// No load-test resources for the service
    Skipped,
    Succeeded,
    Failed,
}

/// Terminal result of a run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Human-readable message; the failure reason for failed runs
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    fn skipped(started_at: DateTime<Utc>) -> Self {
        Self {
            status: RunStatus::Skipped,
            message: format!("{} skipped", MESSAGE_PREFIX),
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn succeeded(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        Self {
            status: RunStatus::Succeeded,
            message: format!("{} finished successfully", MESSAGE_PREFIX),
            started_at,
            finished_at,
        }
    }

    fn failed(error: &Error, started_at: DateTime<Utc>) -> Self {
        Self {
            status: RunStatus::Failed,
            message: error.to_string(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Payload of the `test.finished` event reporting this outcome
    pub fn finished_event_data(&self, request: &TriggerRequest) -> TestFinishedEventData {
        let (status, result) = match self.status {
            RunStatus::Skipped | RunStatus::Succeeded => (Status::Succeeded, TestResult::Pass),
            RunStatus::Failed => (Status::Errored, TestResult::Fail),
        };

        TestFinishedEventData {
            base: EventData::from(request),
            status,
            result,
            message: self.message.clone(),
            test: TestFinishedDetails {
                start: format_timestamp(self.started_at),
                end: format_timestamp(self.finished_at),
            },
        }
    }
}

/// Handles `test.triggered` events
pub struct TestHandler {
    store: Arc<dyn ResourceStore>,
    sender: Arc<dyn EventSender>,
    executor: Arc<dyn ExecutionHandler>,
    settings: HandlerSettings,
}

impl TestHandler {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        sender: Arc<dyn EventSender>,
        executor: Arc<dyn ExecutionHandler>,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            store,
            sender,
            executor,
            settings,
        }
    }

    /// Run the load test requested by `request` and report it
    ///
    /// Returns an error without a `test.finished` event if `test.started`
    /// cannot be sent. If `test.finished` cannot be sent, the run's own
    /// error is returned for failed runs and the send error otherwise.
    pub async fn execute(&self, request: &TriggerRequest) -> Result<RunOutcome> {
        tracing::info!("Handling test.triggered event: {}", request.triggered_id);

        let started_data = serde_json::to_value(EventData::from(request))?;
        let started = CloudEvent::reply_to(request, TEST_STARTED, started_data);
        if let Err(e) = self.sender.send(&started).await {
            tracing::error!("Failed to send test started event ({}), aborting...", e);
            return Err(e);
        }

        let run_started = Utc::now();
        match self.run(request, run_started).await {
            Ok(outcome) => {
                self.send_finished(request, &outcome).await?;
                Ok(outcome)
            }
            Err(err) => {
                tracing::error!("{}", err);
                let outcome = RunOutcome::failed(&err, run_started);
                if let Err(send_err) = self.send_finished(request, &outcome).await {
                    tracing::error!("Error sending test finished event: {}", send_err);
                    return Err(err);
                }
                Ok(outcome)
            }
        }
    }

    async fn run(&self, request: &TriggerRequest, run_started: DateTime<Utc>) -> Result<RunOutcome> {
        let service_url = resolve_service_url(request)?;
        let scope = request.scope();

        let workspace = tempfile::Builder::new()
            .prefix(RESOURCE_PREFIX)
            .tempdir_in(&self.settings.temp_root)
            .map_err(|e| Error::Workspace {
                scope: scope.to_string(),
                path: self.settings.temp_root.display().to_string(),
                error: e.to_string(),
            })?;
        let dir = workspace.path();
        tracing::debug!("Created workspace {}", dir.display());

        let downloaded = sync_resources(self.store.as_ref(), &scope, dir)
            .await
            .map_err(|e| Error::ResourceSync {
                namespace: RESOURCE_PREFIX.to_string(),
                scope: scope.to_string(),
                source: Box::new(e),
            })?;

        if downloaded == 0 {
            tracing::info!("No {}/ resources for {}, skipping", RESOURCE_PREFIX, scope);
            return Ok(RunOutcome::skipped(run_started));
        }

        let restored = restore_default_conf_files(&self.settings.install_root, dir).map_err(|e| {
            Error::DefaultConf {
                scope: scope.to_string(),
                source: Box::new(e),
            }
        })?;
        tracing::debug!("Restored {} default conf files", restored);

        let workload = match load_workload_config(self.store.as_ref(), &scope).await {
            Ok(workload) => workload,
            Err(e @ Error::WorkloadParse { .. }) if self.settings.strict_workload => {
                return Err(e)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load configuration file: {} - proceeding with default values",
                    e
                );
                None
            }
        };

        let simulation = resolve_simulation_name(&request.test_strategy, workload.as_ref());
        tracing::info!(
            "TestStrategy={} -> simulation={} -> serviceUrl={}",
            request.test_strategy,
            simulation,
            service_url
        );

        let args = simulation_args(&simulation);
        let env = build_environment(ambient_environment(), dir, &service_url);

        tracing::info!("Running gatling tests");
        let started_at = Utc::now();
        let output = self.executor.execute(&args, &env).await?;
        let finished_at = Utc::now();

        tracing::info!("Finished running gatling tests");
        tracing::info!("{}", output);

        if let Err(e) = workspace.close() {
            tracing::warn!("Failed to remove workspace: {}", e);
        }

        Ok(RunOutcome::succeeded(started_at, finished_at))
    }

    async fn send_finished(&self, request: &TriggerRequest, outcome: &RunOutcome) -> Result<()> {
        let data = serde_json::to_value(outcome.finished_event_data(request))?;
        let finished = CloudEvent::reply_to(request, TEST_FINISHED, data);
        self.sender.send(&finished).await
    }
}
