//! Error types for the gatling service
//!
//! Messages end up verbatim in `test.finished` events, so each variant
//! carries enough context to tell which run and which stage failed.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the gatling service
#[derive(Error, Debug)]
pub enum Error {
    // === Inbound Event Errors ===
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("no deployment URI included in event")]
    NoDeploymentUri,

    #[error("Invalid deployment URI '{uri}': {source}")]
    InvalidDeploymentUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    // === Resource Store Errors ===
    #[error("Resource store request to {url} failed: {message}")]
    ResourceStore { url: String, message: String },

    #[error("error creating workspace for {scope} under '{path}': {error}")]
    Workspace {
        scope: String,
        path: String,
        error: String,
    },

    #[error("Invalid resource path '{0}'")]
    InvalidResourcePath(String),

    #[error("error loading {namespace}/* files for {scope}: {source}")]
    ResourceSync {
        namespace: String,
        scope: String,
        #[source]
        source: Box<Error>,
    },

    #[error("error syncing default conf files for {scope}: {source}")]
    DefaultConf {
        scope: String,
        #[source]
        source: Box<Error>,
    },

    // === Workload Configuration Errors ===
    #[error("error when trying to load {file} file for {scope}: {message}")]
    WorkloadFetch {
        file: String,
        scope: String,
        message: String,
    },

    #[error("Couldn't parse {file} file found for {scope}. Error: {message}")]
    WorkloadParse {
        file: String,
        scope: String,
        message: String,
    },

    // === Execution Errors ===
    /// Failure reported by the load-test engine; the message is used verbatim
    #[error("{0}")]
    Engine(String),

    #[error("Test run failed: {0}")]
    RunFailed(String),

    // === Event Reporting Errors ===
    #[error("Failed to send {event_type} event: {message}")]
    EventSend { event_type: String, message: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Failed to write file '{path}': {error}")]
    FileWrite { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a resource store error for a request URL
    pub fn resource_store(url: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        Self::ResourceStore {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an event send error
    pub fn event_send(event_type: &str, message: impl std::fmt::Display) -> Self {
        Self::EventSend {
            event_type: event_type.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create a file write error
    pub fn file_write(path: &std::path::Path, error: io::Error) -> Self {
        Self::FileWrite {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
