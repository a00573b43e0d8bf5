//! Load-test engine invocation
//!
//! The handler only sees [`ExecutionHandler`], so runs can be driven by a
//! scripted executor in tests instead of a real Gatling installation.

use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use url::Url;

use crate::common::{Error, Result};

/// Variable pointing Gatling at the workspace
pub const GATLING_HOME_ENV: &str = "GATLING_HOME";

/// JVM options variable carrying the service URL
pub const JAVA_OPTS_ENV: &str = "JAVA_OPTS";

/// Runs the load-test engine
#[async_trait]
pub trait ExecutionHandler: Send + Sync {
    /// Run the engine to completion and return its combined output
    ///
    /// `env` is the complete environment of the child process.
    async fn execute(&self, args: &[String], env: &[(OsString, OsString)]) -> Result<String>;
}

/// Runs `gatling.sh` (or another configured executable) as a child process
#[derive(Debug, Clone)]
pub struct GatlingExecutor {
    executable: PathBuf,
}

impl GatlingExecutor {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Resolve bare names through PATH, keep explicit paths as they are
    fn program(&self) -> Result<PathBuf> {
        if self.executable.components().count() > 1 {
            return Ok(self.executable.clone());
        }
        which::which(&self.executable).map_err(|e| {
            Error::Engine(format!(
                "Error executing command {}: {}",
                self.executable.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl ExecutionHandler for GatlingExecutor {
    async fn execute(&self, args: &[String], env: &[(OsString, OsString)]) -> Result<String> {
        let program = self.program()?;
        let command_line = format!("{} {}", program.display(), args.join(" "));
        tracing::debug!("executing command {}", command_line);

        let output = tokio::process::Command::new(&program)
            .args(args)
            .env_clear()
            .envs(env.iter().cloned())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Engine(format!("Error executing command {}: {}", command_line, e)))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(Error::Engine(format!(
                "Error executing command {}: {}\n{}",
                command_line, output.status, combined
            )));
        }

        Ok(combined)
    }
}

/// Arguments selecting the simulation to run
pub fn simulation_args(simulation: &str) -> Vec<String> {
    vec![format!("--simulation={}", simulation)]
}

/// Child environment: `base` plus the workspace and service URL overrides
///
/// Entries of `base` with the same names as the overrides are dropped.
pub fn build_environment<I>(
    base: I,
    workspace: &Path,
    service_url: &Url,
) -> Vec<(OsString, OsString)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut env: Vec<(OsString, OsString)> = base
        .into_iter()
        .filter(|(key, _)| {
            key.as_os_str() != OsStr::new(GATLING_HOME_ENV)
                && key.as_os_str() != OsStr::new(JAVA_OPTS_ENV)
        })
        .collect();
    env.push((
        OsString::from(GATLING_HOME_ENV),
        workspace.as_os_str().to_os_string(),
    ));
    env.push((
        OsString::from(JAVA_OPTS_ENV),
        OsString::from(format!("-DserviceURL={}", service_url)),
    ));
    env
}

/// Environment of the current process
pub fn ambient_environment() -> Vec<(OsString, OsString)> {
    std::env::vars_os().collect()
}
