//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/gatling-service/`
//! - macOS: `~/Library/Application Support/gatling-service/`
//! - Windows: `%APPDATA%\gatling-service\`

use std::path::PathBuf;

/// Name used for the configuration directory
const APP_NAME: &str = "gatling-service";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_toml() {
        if let Some(path) = config_path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
            assert!(path.parent().unwrap().ends_with(APP_NAME));
        }
    }
}
