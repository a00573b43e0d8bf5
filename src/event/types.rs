//! CloudEvent envelope and Keptn test event payloads
//!
//! Wire field names are those of Keptn 0.2.x events.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::common::{Error, Result};
use crate::resources::ServiceScope;

/// Source attribute on every event this service emits
pub const SERVICE_NAME: &str = "gatling-service";

/// Event type that triggers a test run
pub const TEST_TRIGGERED: &str = "sh.keptn.event.test.triggered";
/// Event type announcing that a run has started
pub const TEST_STARTED: &str = "sh.keptn.event.test.started";
/// Event type reporting the end of a run
pub const TEST_FINISHED: &str = "sh.keptn.event.test.finished";

const CLOUDEVENTS_SPEC_VERSION: &str = "1.0";
const KEPTN_SPEC_VERSION: &str = "0.2.3";

/// A CloudEvents 1.0 envelope with the Keptn extension attributes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudEvent {
    pub specversion: String,
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,
    /// Keptn context shared by all events of one sequence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shkeptncontext: Option<String>,
    /// Id of the `.triggered` event a `.started`/`.finished` event answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggeredid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shkeptnspecversion: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl CloudEvent {
    /// Create an outbound event answering `request`
    pub fn reply_to(request: &TriggerRequest, event_type: &str, data: serde_json::Value) -> Self {
        Self {
            specversion: CLOUDEVENTS_SPEC_VERSION.to_string(),
            id: nanoid::nanoid!(),
            source: SERVICE_NAME.to_string(),
            event_type: event_type.to_string(),
            time: Some(format_timestamp(Utc::now())),
            datacontenttype: Some("application/json".to_string()),
            shkeptncontext: request.keptn_context.clone(),
            triggeredid: Some(request.triggered_id.clone()),
            shkeptnspecversion: Some(KEPTN_SPEC_VERSION.to_string()),
            data,
        }
    }
}

/// Payload of `sh.keptn.event.test.triggered`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestTriggeredEventData {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub service: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub test: TestTriggeredDetails,
    #[serde(default)]
    pub deployment: DeploymentDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestTriggeredDetails {
    #[serde(rename = "teststrategy", default)]
    pub test_strategy: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentDetails {
    #[serde(rename = "deploymentURIsLocal", default)]
    pub uris_local: Vec<String>,
    #[serde(rename = "deploymentURIsPublic", default)]
    pub uris_public: Vec<String>,
    #[serde(rename = "deploymentstrategy", default, skip_serializing_if = "String::is_empty")]
    pub strategy: String,
}

/// An accepted request to run a load test
#[derive(Debug, Clone)]
pub struct TriggerRequest {
    pub project: String,
    pub stage: String,
    pub service: String,
    pub test_strategy: String,
    pub deployment_uris_local: Vec<String>,
    pub deployment_uris_public: Vec<String>,
    pub labels: HashMap<String, String>,
    pub keptn_context: Option<String>,
    pub triggered_id: String,
}

impl TriggerRequest {
    /// Build a request from an inbound `test.triggered` event
    pub fn from_event(event: &CloudEvent) -> Result<Self> {
        let data: TestTriggeredEventData = serde_json::from_value(event.data.clone())
            .map_err(|e| Error::InvalidEvent(format!("cannot decode event {}: {}", event.id, e)))?;

        for (field, value) in [
            ("project", &data.project),
            ("stage", &data.stage),
            ("service", &data.service),
        ] {
            if value.is_empty() {
                return Err(Error::InvalidEvent(format!(
                    "event {} has no {}",
                    event.id, field
                )));
            }
        }

        Ok(Self {
            project: data.project,
            stage: data.stage,
            service: data.service,
            test_strategy: data.test.test_strategy,
            deployment_uris_local: data.deployment.uris_local,
            deployment_uris_public: data.deployment.uris_public,
            labels: data.labels,
            keptn_context: event.shkeptncontext.clone(),
            triggered_id: event.id.clone(),
        })
    }

    /// The project/stage/service triple this request targets
    pub fn scope(&self) -> ServiceScope {
        ServiceScope::new(&self.project, &self.stage, &self.service)
    }
}

/// Status of a finished task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Succeeded,
    Errored,
}

/// Result of a finished task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    Pass,
    Fail,
}

/// Fields shared by every outbound event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub project: String,
    pub stage: String,
    pub service: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl From<&TriggerRequest> for EventData {
    fn from(request: &TriggerRequest) -> Self {
        Self {
            project: request.project.clone(),
            stage: request.stage.clone(),
            service: request.service.clone(),
            labels: request.labels.clone(),
        }
    }
}

/// Payload of `sh.keptn.event.test.finished`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestFinishedEventData {
    #[serde(flatten)]
    pub base: EventData,
    pub status: Status,
    pub result: TestResult,
    pub message: String,
    pub test: TestFinishedDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestFinishedDetails {
    pub start: String,
    pub end: String,
}

/// Format a timestamp the way Keptn expects (RFC 3339, second precision)
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn triggered_event(data: serde_json::Value) -> CloudEvent {
        serde_json::from_value(json!({
            "specversion": "1.0",
            "id": "f2b878d3-03c0-4e8f-bc3f-454bc1b3d79d",
            "source": "shipyard-controller",
            "type": TEST_TRIGGERED,
            "shkeptncontext": "a3e5f16d-8888-4720-82c7-6995062905c1",
            "data": data,
        }))
        .unwrap()
    }

    #[test]
    fn test_request_from_keptn_event() {
        let event = triggered_event(json!({
            "project": "sockshop",
            "stage": "staging",
            "service": "carts",
            "labels": { "buildId": "42" },
            "test": { "teststrategy": "performance" },
            "deployment": {
                "deploymentURIsLocal": ["http://carts.sockshop-staging:80"],
                "deploymentURIsPublic": ["http://carts.example.com"],
                "deploymentstrategy": "blue_green_service"
            }
        }));

        let request = TriggerRequest::from_event(&event).unwrap();
        assert_eq!(request.project, "sockshop");
        assert_eq!(request.test_strategy, "performance");
        assert_eq!(
            request.deployment_uris_local,
            vec!["http://carts.sockshop-staging:80"]
        );
        assert_eq!(request.labels.get("buildId").map(String::as_str), Some("42"));
        assert_eq!(
            request.keptn_context.as_deref(),
            Some("a3e5f16d-8888-4720-82c7-6995062905c1")
        );
        assert_eq!(request.triggered_id, "f2b878d3-03c0-4e8f-bc3f-454bc1b3d79d");
        assert_eq!(request.scope().to_string(), "sockshop.staging.carts");
    }

    #[test]
    fn test_request_requires_service() {
        let event = triggered_event(json!({ "project": "sockshop", "stage": "staging" }));
        let err = TriggerRequest::from_event(&event).unwrap_err();
        assert!(matches!(err, Error::InvalidEvent(msg) if msg.contains("service")));
    }

    #[test]
    fn test_request_rejects_malformed_data() {
        let event = triggered_event(json!({ "project": 7 }));
        assert!(matches!(
            TriggerRequest::from_event(&event),
            Err(Error::InvalidEvent(_))
        ));
    }

    #[test]
    fn test_finished_payload_shape() {
        let data = TestFinishedEventData {
            base: EventData {
                project: "sockshop".into(),
                stage: "staging".into(),
                service: "carts".into(),
                labels: HashMap::new(),
            },
            status: Status::Errored,
            result: TestResult::Fail,
            message: "execution failed".into(),
            test: TestFinishedDetails {
                start: "2021-03-01T10:00:00Z".into(),
                end: "2021-03-01T10:05:00Z".into(),
            },
        };

        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["project"], "sockshop");
        assert_eq!(value["status"], "errored");
        assert_eq!(value["result"], "fail");
        assert_eq!(value["test"]["end"], "2021-03-01T10:05:00Z");
        assert!(value.get("labels").is_none());
    }

    #[test]
    fn test_reply_carries_context() {
        let event = triggered_event(json!({
            "project": "sockshop", "stage": "staging", "service": "carts"
        }));
        let request = TriggerRequest::from_event(&event).unwrap();
        let reply = CloudEvent::reply_to(&request, TEST_STARTED, json!({}));

        assert_eq!(reply.source, SERVICE_NAME);
        assert_eq!(reply.event_type, TEST_STARTED);
        assert_eq!(reply.shkeptncontext, request.keptn_context);
        assert_eq!(reply.triggeredid.as_deref(), Some(event.id.as_str()));
        assert_ne!(reply.id, event.id);
    }
}
