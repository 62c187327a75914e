use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

fn default_unit_prefix() -> String {
    "appsrv-".to_string()
}

fn default_old_base() -> PathBuf {
    PathBuf::from("/srv/appsrv")
}

fn default_new_base() -> PathBuf {
    PathBuf::from("/data/appsrv")
}

fn default_unit_file_dir() -> PathBuf {
    PathBuf::from("/etc/systemd/system")
}

fn default_log_path() -> PathBuf {
    PathBuf::from("/var/log/unitmove.log")
}

fn default_backup_suffix() -> String {
    ".bak".to_string()
}

/// Migration configuration.
///
/// Built once at process start and passed by reference into every
/// component; there is no ambient/global configuration access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationConfig {
    /// Unit name prefix selecting the fleet, e.g. "appsrv-".
    #[serde(default = "default_unit_prefix")]
    pub unit_prefix: String,

    /// Base directory the services' data currently lives under.
    #[serde(default = "default_old_base")]
    pub old_base: PathBuf,

    /// Base directory the data is migrated to.
    #[serde(default = "default_new_base")]
    pub new_base: PathBuf,

    /// Directory holding the persisted unit files.
    #[serde(default = "default_unit_file_dir")]
    pub unit_file_dir: PathBuf,

    /// Append-only run log file.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,

    /// Suffix appended to a unit file's name for its pre-patch backup.
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            unit_prefix: default_unit_prefix(),
            old_base: default_old_base(),
            new_base: default_new_base(),
            unit_file_dir: default_unit_file_dir(),
            log_path: default_log_path(),
            backup_suffix: default_backup_suffix(),
        }
    }
}

/// Read the configuration file, falling back to defaults when no path is
/// given. A missing default is fine; a malformed file is a startup error.
pub async fn load_config(path: Option<&Path>) -> Result<MigrationConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(MigrationConfig::default());
    };

    let content = fs::read_to_string(path).await?;
    let config: MigrationConfig = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MigrationConfig::default();
        assert_eq!(config.unit_prefix, "appsrv-");
        assert_eq!(config.unit_file_dir, PathBuf::from("/etc/systemd/system"));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: MigrationConfig =
            serde_json::from_str(r#"{"unitPrefix": "foobar-", "oldBase": "/old"}"#).unwrap();
        assert_eq!(config.unit_prefix, "foobar-");
        assert_eq!(config.old_base, PathBuf::from("/old"));
        assert_eq!(config.backup_suffix, ".bak");
    }
}
