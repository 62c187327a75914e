//! Recursive structural and content comparison between two trees.

use crate::utils::compute_file_hash;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A single divergence found between source and destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeDiff {
    /// Path relative to the compared roots.
    pub path: PathBuf,
    pub kind: DiffKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffKind {
    /// Present in the source, absent from the destination.
    MissingInDest,
    /// Present in the destination, absent from the source.
    ExtraInDest,
    /// File vs directory vs symlink mismatch.
    KindMismatch,
    /// Symlink points somewhere else.
    SymlinkTargetMismatch { expected: PathBuf, found: PathBuf },
    /// Permission bits differ; treated as content-relevant.
    ModeMismatch { expected: u32, found: u32 },
    /// File bytes differ.
    ContentMismatch,
}

impl fmt::Display for TreeDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.display();
        match &self.kind {
            DiffKind::MissingInDest => write!(f, "{path}: missing in destination"),
            DiffKind::ExtraInDest => write!(f, "{path}: extra entry in destination"),
            DiffKind::KindMismatch => write!(f, "{path}: entry kind differs"),
            DiffKind::SymlinkTargetMismatch { expected, found } => write!(
                f,
                "{path}: symlink target differs (expected {}, found {})",
                expected.display(),
                found.display()
            ),
            DiffKind::ModeMismatch { expected, found } => {
                write!(f, "{path}: mode differs (expected {expected:o}, found {found:o})")
            }
            DiffKind::ContentMismatch => write!(f, "{path}: content differs"),
        }
    }
}

#[derive(Debug)]
enum Snapshot {
    Dir { mode: u32 },
    File { len: u64, mode: u32 },
    Symlink { target: PathBuf },
}

/// Compare two trees recursively: structure, entry kinds, symlink targets,
/// permission modes and file contents (SHA-256). Returns every difference
/// found; an empty result means the trees are equivalent.
pub fn compare_trees(src: &Path, dst: &Path) -> io::Result<Vec<TreeDiff>> {
    let src_entries = snapshot_tree(src)?;
    let dst_entries = snapshot_tree(dst)?;

    let mut diffs = Vec::new();

    for (rel, src_entry) in &src_entries {
        let Some(dst_entry) = dst_entries.get(rel) else {
            diffs.push(TreeDiff {
                path: rel.clone(),
                kind: DiffKind::MissingInDest,
            });
            continue;
        };

        match (src_entry, dst_entry) {
            (Snapshot::Dir { mode: a }, Snapshot::Dir { mode: b }) => {
                if a != b {
                    diffs.push(TreeDiff {
                        path: rel.clone(),
                        kind: DiffKind::ModeMismatch {
                            expected: *a,
                            found: *b,
                        },
                    });
                }
            }
            (
                Snapshot::File {
                    len: src_len,
                    mode: src_mode,
                },
                Snapshot::File {
                    len: dst_len,
                    mode: dst_mode,
                },
            ) => {
                if src_mode != dst_mode {
                    diffs.push(TreeDiff {
                        path: rel.clone(),
                        kind: DiffKind::ModeMismatch {
                            expected: *src_mode,
                            found: *dst_mode,
                        },
                    });
                } else if src_len != dst_len
                    || compute_file_hash(&src.join(rel))? != compute_file_hash(&dst.join(rel))?
                {
                    diffs.push(TreeDiff {
                        path: rel.clone(),
                        kind: DiffKind::ContentMismatch,
                    });
                }
            }
            (Snapshot::Symlink { target: a }, Snapshot::Symlink { target: b }) => {
                if a != b {
                    diffs.push(TreeDiff {
                        path: rel.clone(),
                        kind: DiffKind::SymlinkTargetMismatch {
                            expected: a.clone(),
                            found: b.clone(),
                        },
                    });
                }
            }
            _ => diffs.push(TreeDiff {
                path: rel.clone(),
                kind: DiffKind::KindMismatch,
            }),
        }
    }

    for rel in dst_entries.keys() {
        if !src_entries.contains_key(rel) {
            diffs.push(TreeDiff {
                path: rel.clone(),
                kind: DiffKind::ExtraInDest,
            });
        }
    }

    Ok(diffs)
}

fn snapshot_tree(root: &Path) -> io::Result<BTreeMap<PathBuf, Snapshot>> {
    let mut entries = BTreeMap::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(io::Error::other)?
            .to_path_buf();
        if rel.as_os_str().is_empty() {
            continue;
        }

        let metadata = entry.metadata().map_err(io::Error::from)?;
        let file_type = entry.file_type();

        let snapshot = if file_type.is_dir() {
            Snapshot::Dir {
                mode: mode_bits(&metadata),
            }
        } else if file_type.is_symlink() {
            Snapshot::Symlink {
                target: fs::read_link(entry.path())?,
            }
        } else {
            Snapshot::File {
                len: metadata.len(),
                mode: mode_bits(&metadata),
            }
        };

        entries.insert(rel, snapshot);
    }

    Ok(entries)
}

#[cfg(unix)]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_bits(_metadata: &fs::Metadata) -> u32 {
    0
}
