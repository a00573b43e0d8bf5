//! Remote resource store access and workspace population

pub mod defaults;
pub mod store;
pub mod sync;

use std::fmt;

pub use defaults::{restore_default_conf_files, CONF_DIR, DEFAULT_CONF_FILES};
pub use store::{HttpResourceStore, ResourceStore};
pub use sync::{sync_resources, RESOURCE_PREFIX};

/// Project/stage/service triple identifying where resources live
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceScope {
    pub project: String,
    pub stage: String,
    pub service: String,
}

impl ServiceScope {
    pub fn new(project: &str, stage: &str, service: &str) -> Self {
        Self {
            project: project.to_string(),
            stage: stage.to_string(),
            service: service.to_string(),
        }
    }
}

impl fmt::Display for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.stage, self.service)
    }
}
