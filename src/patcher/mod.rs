//! Unit file patching.
//!
//! Rewrites the two location-dependent keys of a unit's persisted
//! configuration (`WorkingDirectory=`, `ExecStart=`) to point at the new
//! data path, then has the service manager reload unit definitions. The
//! original file is copied byte-for-byte to a backup before any mutation;
//! the backup is never deleted and is the only recovery artifact. Nothing
//! here auto-restores from it.
//!
//! Matching is literal line-prefix matching, not structured parsing; lines
//! whose value does not start with the exact old data path are left alone.

use crate::config::MigrationConfig;
use crate::discovery::ManagedUnit;
use crate::systemd::{ServiceManager, SystemdError};
use crate::utils::{backup_path, unit_file_path};
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;

/// The two keys whose values are path-prefixed by the data directory.
const PATCHED_KEYS: [&str; 2] = ["WorkingDirectory=", "ExecStart="];

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("unit file {0} does not exist")]
    ConfigMissing(PathBuf),

    #[error("failed to back up unit file to {path}: {source}")]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to rewrite unit file {path}: {source}")]
    Rewrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("daemon-reload failed: {0}")]
    Reload(#[from] SystemdError),
}

/// What a patch run did, for the run log.
#[derive(Debug, Clone)]
pub struct PatchReport {
    pub backup_path: PathBuf,
    pub rewritten_lines: usize,
}

/// Back up and rewrite the unit's configuration file, then reload unit
/// definitions. The reload runs even when no line matched, so a manually
/// corrected file is still picked up.
pub async fn patch_unit_file(
    manager: &dyn ServiceManager,
    config: &MigrationConfig,
    unit: &ManagedUnit,
) -> Result<PatchReport, PatchError> {
    let path = unit_file_path(&config.unit_file_dir, &unit.unit_name);
    if !path.is_file() {
        return Err(PatchError::ConfigMissing(path));
    }

    // Mutation must never proceed without a successful backup.
    let backup = backup_path(&config.unit_file_dir, &unit.unit_name, &config.backup_suffix);
    fs::copy(&path, &backup)
        .await
        .map_err(|source| PatchError::Backup {
            path: backup.clone(),
            source,
        })?;

    let old_prefix = unit.old_data_path.to_string_lossy().into_owned();
    let new_prefix = unit.new_data_path.to_string_lossy().into_owned();

    let content = fs::read_to_string(&path)
        .await
        .map_err(|source| PatchError::Rewrite {
            path: path.clone(),
            source,
        })?;

    let mut rewritten_lines = 0;
    let mut lines: Vec<String> = Vec::new();
    for line in content.lines() {
        let rewritten = PATCHED_KEYS
            .iter()
            .find_map(|key| rewrite_key_if_prefixed(line, key, &old_prefix, &new_prefix));
        match rewritten {
            Some(new_line) => {
                rewritten_lines += 1;
                lines.push(new_line);
            }
            None => lines.push(line.to_string()),
        }
    }

    let mut output = lines.join("\n");
    if content.ends_with('\n') {
        output.push('\n');
    }

    fs::write(&path, output)
        .await
        .map_err(|source| PatchError::Rewrite {
            path: path.clone(),
            source,
        })?;

    manager.daemon_reload().await?;

    Ok(PatchReport {
        backup_path: backup,
        rewritten_lines,
    })
}

/// Rewrite `line` when it starts with `key` and its value starts with
/// `old_prefix`, replacing the matched prefix with `new_prefix`. Returns
/// `None` for every other line, which the caller keeps untouched.
pub fn rewrite_key_if_prefixed(
    line: &str,
    key: &str,
    old_prefix: &str,
    new_prefix: &str,
) -> Option<String> {
    let value = line.strip_prefix(key)?;
    let rest = value.strip_prefix(old_prefix)?;
    Some(format!("{key}{new_prefix}{rest}"))
}
