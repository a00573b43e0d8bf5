//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::Result;

/// Environment variable Keptn uses to point services at the configuration service
pub const CONFIGURATION_SERVICE_ENV: &str = "CONFIGURATION_SERVICE";

/// Environment variable Keptn uses to point services at the event broker
pub const EVENT_BROKER_ENV: &str = "EVENTBROKER";

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Load-test engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Per-run workspace settings
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Remote resource store settings
    #[serde(default)]
    pub resource_store: ResourceStoreConfig,

    /// Outbound event settings
    #[serde(default)]
    pub events: EventsConfig,

    /// Workload mapping settings
    #[serde(default)]
    pub workload: WorkloadSettings,
}

/// Configuration for the external load-test engine
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Executable to run, either a path or a name looked up in PATH
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
        }
    }
}

fn default_executable() -> PathBuf {
    PathBuf::from("gatling.sh")
}

/// Workspace locations
#[derive(Debug, Deserialize, Clone)]
pub struct WorkspaceConfig {
    /// Directory under which per-run workspaces are created
    #[serde(default = "default_temp_root")]
    pub temp_root: PathBuf,

    /// Gatling installation holding the baseline `conf/` files
    #[serde(default = "default_install_root")]
    pub install_root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            temp_root: default_temp_root(),
            install_root: default_install_root(),
        }
    }
}

fn default_temp_root() -> PathBuf {
    std::env::temp_dir()
}

fn default_install_root() -> PathBuf {
    PathBuf::from("/opt/gatling")
}

/// Resource store client settings
#[derive(Debug, Deserialize, Clone)]
pub struct ResourceStoreConfig {
    /// Base URL of the configuration service
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Timeout for a single request
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl Default for ResourceStoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            timeout_secs: default_store_timeout(),
        }
    }
}

fn default_store_url() -> String {
    "http://configuration-service:8080".to_string()
}

fn default_store_timeout() -> u64 {
    30
}

/// Event broker settings
#[derive(Debug, Deserialize, Clone)]
pub struct EventsConfig {
    /// Endpoint accepting outbound CloudEvents
    #[serde(default = "default_event_endpoint")]
    pub endpoint: String,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_event_endpoint(),
        }
    }
}

fn default_event_endpoint() -> String {
    "http://localhost:8081/event".to_string()
}

/// Workload mapping settings
#[derive(Debug, Deserialize, Default, Clone)]
pub struct WorkloadSettings {
    /// Fail the run when the workload mapping exists but cannot be parsed,
    /// instead of falling back to the default simulation name
    #[serde(default)]
    pub strict: bool,
}

impl Config {
    /// Load configuration from an explicit path or the default config file
    ///
    /// An explicit `path` must exist. Without one, the platform config file
    /// is used if present, else the defaults. Environment overrides are
    /// applied on top in every case.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Replace endpoints with the values Keptn injects into the container
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(CONFIGURATION_SERVICE_ENV).filter(|v| !v.is_empty()) {
            self.resource_store.url = url;
        }
        if let Some(endpoint) = lookup(EVENT_BROKER_ENV).filter(|v| !v.is_empty()) {
            self.events.endpoint = endpoint;
        }
    }
}
