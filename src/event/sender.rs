//! Outbound event delivery
//!
//! The handler only depends on the [`EventSender`] trait; the HTTP sender
//! talks to the Keptn event broker, the stdout sender is used for dry runs.

use async_trait::async_trait;
use std::io::Write;
use std::time::Duration;

use super::types::CloudEvent;
use crate::common::{Error, Result};

/// Delivers lifecycle events to the event transport
#[async_trait]
pub trait EventSender: Send + Sync {
    /// Send a single event
    async fn send(&self, event: &CloudEvent) -> Result<()>;
}

/// Posts CloudEvents in structured mode to an HTTP endpoint
pub struct HttpEventSender {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEventSender {
    /// Create a sender posting to `endpoint`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(super::types::SERVICE_NAME)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build event client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl EventSender for HttpEventSender {
    async fn send(&self, event: &CloudEvent) -> Result<()> {
        tracing::debug!(
            event_type = %event.event_type,
            id = %event.id,
            endpoint = %self.endpoint,
            "Sending event"
        );

        let body = serde_json::to_vec(event)?;
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/cloudevents+json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::event_send(&event.event_type, e))?;

        if !response.status().is_success() {
            return Err(Error::event_send(
                &event.event_type,
                format!("{} returned status {}", self.endpoint, response.status()),
            ));
        }

        Ok(())
    }
}

/// Writes each event as one JSON line to stdout
#[derive(Debug, Default)]
pub struct StdoutEventSender;

#[async_trait]
impl EventSender for StdoutEventSender {
    async fn send(&self, event: &CloudEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        writeln!(lock, "{}", line).map_err(|e| Error::event_send(&event.event_type, e))?;
        lock.flush()
            .map_err(|e| Error::event_send(&event.event_type, e))?;
        Ok(())
    }
}
