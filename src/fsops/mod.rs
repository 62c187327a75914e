//! Directory migration.
//!
//! Copies a unit's data tree to its new location and verifies the result by
//! an independent recursive comparison. The copy's own success is not
//! trusted: a partial copy can finish "cleanly" under resource pressure, so
//! the comparison is the correctness gate. The source tree is never deleted,
//! even on success.

mod compare;
mod copy;

pub use compare::{compare_trees, DiffKind, TreeDiff};

use copy::copy_tree;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MoveError {
    #[error("source directory {0} does not exist")]
    SourceMissing(PathBuf),

    #[error("failed to create destination {path}: {source}")]
    DestCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("copy failed at {path}: {source}")]
    Copy {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("verification failed: {0}")]
    Verification(String),
}

/// Migrate a data tree from `old` to `new`.
///
/// Requires `old` to exist as a directory, creates `new` and its parents,
/// recursively copies everything preserving metadata and symlinks, then
/// compares both trees. Any difference is fatal for the unit; no cleanup
/// happens on any path.
pub fn migrate_tree(old: &Path, new: &Path) -> Result<(), MoveError> {
    if !old.is_dir() {
        return Err(MoveError::SourceMissing(old.to_path_buf()));
    }

    std::fs::create_dir_all(new).map_err(|source| MoveError::DestCreate {
        path: new.to_path_buf(),
        source,
    })?;

    copy_tree(old, new)?;

    let diffs = compare_trees(old, new)
        .map_err(|e| MoveError::Verification(format!("comparison failed: {e}")))?;
    if !diffs.is_empty() {
        return Err(MoveError::Verification(summarize_diffs(&diffs)));
    }

    Ok(())
}

fn summarize_diffs(diffs: &[TreeDiff]) -> String {
    let listed: Vec<String> = diffs.iter().take(5).map(|d| d.to_string()).collect();
    if diffs.len() > listed.len() {
        format!(
            "{} differences, first {}: {}",
            diffs.len(),
            listed.len(),
            listed.join("; ")
        )
    } else {
        format!("{} differences: {}", diffs.len(), listed.join("; "))
    }
}
