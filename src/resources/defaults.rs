//! Baseline Gatling configuration for workspaces
//!
//! Configuration files shipped with the service's resources take precedence;
//! the installation defaults only fill the gaps.

use std::path::Path;

use crate::common::{Error, Result};

/// Configuration subdirectory inside both the installation and the workspace
pub const CONF_DIR: &str = "conf";

/// Files Gatling needs in `conf/` to start
pub const DEFAULT_CONF_FILES: [&str; 3] = ["logback.xml", "gatling.conf", "gatling-akka.conf"];

/// Copy missing default configuration files from `install_root/conf` into
/// `workspace/conf`
///
/// Returns the number of files restored.
pub fn restore_default_conf_files(install_root: &Path, workspace: &Path) -> Result<usize> {
    let source_dir = install_root.join(CONF_DIR);
    let target_dir = workspace.join(CONF_DIR);
    create_conf_dir(&target_dir)?;

    let mut restored = 0;
    for file in DEFAULT_CONF_FILES {
        let target = target_dir.join(file);
        if target.exists() {
            tracing::debug!("Keeping {} from resources", target.display());
            continue;
        }

        let source = source_dir.join(file);
        let content = std::fs::read(&source).map_err(|e| Error::file_read(&source, e))?;
        std::fs::write(&target, content).map_err(|e| Error::file_write(&target, e))?;
        restored += 1;
    }

    Ok(restored)
}

#[cfg(unix)]
fn create_conf_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
        .map_err(|e| Error::file_write(dir, e))
}

#[cfg(not(unix))]
fn create_conf_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::file_write(dir, e))
}
