//! Keptn CloudEvents: inbound trigger, outbound lifecycle events and delivery

mod deployment;
pub mod sender;
pub mod types;

pub use deployment::resolve_service_url;
pub use sender::{EventSender, HttpEventSender, StdoutEventSender};
pub use types::{
    CloudEvent, EventData, Status, TestFinishedDetails, TestFinishedEventData, TestResult,
    TriggerRequest, SERVICE_NAME, TEST_FINISHED, TEST_STARTED, TEST_TRIGGERED,
};
