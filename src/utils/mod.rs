mod hash;

pub use hash::{compute_file_hash, compute_hash};

use std::path::{Path, PathBuf};

/// Get the path of a unit's persisted configuration file
pub fn unit_file_path(unit_file_dir: &Path, unit_name: &str) -> PathBuf {
    unit_file_dir.join(unit_name)
}

/// Get the backup path for a unit file (original bytes, kept forever)
pub fn backup_path(unit_file_dir: &Path, unit_name: &str, suffix: &str) -> PathBuf {
    unit_file_dir.join(format!("{unit_name}{suffix}"))
}
