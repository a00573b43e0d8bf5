//! Gatling service - a Keptn test-execution service
//!
//! Receives `test.triggered` events, prepares a workspace from the
//! service's `gatling/` resources, runs Gatling against the deployed service
//! and reports the result as `test.started` / `test.finished` events.

pub mod cli;
pub mod commands;
pub mod common;
pub mod dispatch;
pub mod engine;
pub mod event;
pub mod handler;
pub mod resources;
pub mod workload;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use handler::{HandlerSettings, RunOutcome, RunStatus, TestHandler};
