//! Workload mapping and simulation name resolution
//!
//! A service can ship `gatling/gatling.conf.yaml` to map Keptn test
//! strategies to Gatling simulation classes:
//!
//! ```yaml
//! spec_version: '0.1.0'
//! workloads:
//!   - teststrategy: performance
//!     simulation: CartsLoadSimulation
//! ```
//!
//! Without a mapping the simulation name is derived from the strategy,
//! e.g. `custom_test` runs `CustomTestSimulation`.

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::resources::{ResourceStore, ServiceScope, RESOURCE_PREFIX};

/// File name of the workload mapping inside the resource namespace
pub const CONF_FILENAME: &str = "gatling.conf.yaml";

/// Suffix appended to derived simulation names
const SIMULATION_SUFFIX: &str = "Simulation";

/// Workload mapping document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    #[serde(default)]
    pub spec_version: String,
    #[serde(default)]
    pub workloads: Vec<Workload>,
}

/// Maps one test strategy to a simulation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    #[serde(rename = "teststrategy", default)]
    pub test_strategy: String,
    #[serde(default)]
    pub simulation: String,
}

impl WorkloadConfig {
    /// Parse a workload mapping document
    pub fn parse(content: &[u8]) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(content)
    }
}

/// Resource URI of the workload mapping
pub fn conf_resource_uri() -> String {
    format!("{}/{}", RESOURCE_PREFIX, CONF_FILENAME)
}

/// Fetch and parse the workload mapping for a service
///
/// A missing or empty document is `Ok(None)`; a document that does not
/// parse is an error.
pub async fn load_workload_config(
    store: &dyn ResourceStore,
    scope: &ServiceScope,
) -> Result<Option<WorkloadConfig>> {
    let uri = conf_resource_uri();
    tracing::info!("Loading {} for {}", uri, scope);

    let content = store
        .get_resource(scope, &uri)
        .await
        .map_err(|e| Error::WorkloadFetch {
            file: uri.clone(),
            scope: scope.to_string(),
            message: e.to_string(),
        })?;

    let content = match content {
        Some(content) if !content.is_empty() => content,
        _ => {
            tracing::info!("no {} found", uri);
            return Ok(None);
        }
    };

    let config = WorkloadConfig::parse(&content).map_err(|e| Error::WorkloadParse {
        file: uri.clone(),
        scope: scope.to_string(),
        message: e.to_string(),
    })?;

    tracing::info!(
        "Successfully loaded {} with {} workloads",
        CONF_FILENAME,
        config.workloads.len()
    );
    Ok(Some(config))
}

/// Determine which simulation to run for a test strategy
///
/// The first workload matching the strategy with a non-empty simulation
/// wins; otherwise the name is derived from the strategy.
pub fn resolve_simulation_name(test_strategy: &str, config: Option<&WorkloadConfig>) -> String {
    config
        .into_iter()
        .flat_map(|c| c.workloads.iter())
        .find(|w| w.test_strategy == test_strategy && !w.simulation.is_empty())
        .map(|w| w.simulation.clone())
        .unwrap_or_else(|| format!("{}{}", to_camel_case(test_strategy), SIMULATION_SUFFIX))
}

/// Convert `snake_case`, `kebab-case`, dotted or spaced words to `UpperCamelCase`
///
/// Characters after the first of each word are kept as they are, so
/// `realUser_flow` becomes `RealUserFlow`.
pub fn to_camel_case(input: &str) -> String {
    input
        .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
