//! Recursive, attribute-preserving tree copy.

use super::MoveError;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Copy every entry under `src` into `dst`, preserving permissions,
/// modification times, ownership where privileges allow, and symlinks as
/// links rather than their targets. Any I/O failure, partial or total, is a
/// copy error.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> Result<(), MoveError> {
    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map_or_else(|| src.to_path_buf(), |p| p.to_path_buf());
            MoveError::Copy {
                path,
                source: io::Error::from(e),
            }
        })?;

        let rel = entry.path().strip_prefix(src).map_err(|e| MoveError::Copy {
            path: entry.path().to_path_buf(),
            source: io::Error::other(e),
        })?;
        let target = dst.join(rel);

        let copy_err = |source: io::Error| MoveError::Copy {
            path: entry.path().to_path_buf(),
            source,
        };

        // metadata() does not follow links when the walker doesn't
        let metadata = entry.metadata().map_err(|e| MoveError::Copy {
            path: entry.path().to_path_buf(),
            source: io::Error::from(e),
        })?;

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(copy_err)?;
            fs::set_permissions(&target, metadata.permissions()).map_err(copy_err)?;
            preserve_ownership(&metadata, &target, false);
        } else if file_type.is_symlink() {
            let link_target = fs::read_link(entry.path()).map_err(copy_err)?;
            make_symlink(&link_target, &target).map_err(copy_err)?;
            preserve_ownership(&metadata, &target, true);
        } else {
            // fs::copy carries permissions over on Unix
            fs::copy(entry.path(), &target).map_err(copy_err)?;
            preserve_mtime(&metadata, &target).map_err(copy_err)?;
            preserve_ownership(&metadata, &target, false);
        }
    }

    Ok(())
}

fn preserve_mtime(src_meta: &fs::Metadata, target: &Path) -> io::Result<()> {
    let mtime = src_meta.modified()?;
    let file = fs::OpenOptions::new().write(true).open(target)?;
    file.set_times(fs::FileTimes::new().set_modified(mtime))
}

/// Carry uid/gid over when running privileged; silently keep the current
/// owner otherwise.
#[cfg(unix)]
fn preserve_ownership(src_meta: &fs::Metadata, target: &Path, is_symlink: bool) {
    use std::os::unix::fs::{chown, lchown, MetadataExt};

    let uid = Some(src_meta.uid());
    let gid = Some(src_meta.gid());
    let _ = if is_symlink {
        lchown(target, uid, gid)
    } else {
        chown(target, uid, gid)
    };
}

#[cfg(not(unix))]
fn preserve_ownership(_src_meta: &fs::Metadata, _target: &Path, _is_symlink: bool) {}

#[cfg(unix)]
fn make_symlink(link_target: &Path, at: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link_target, at)
}

#[cfg(not(unix))]
fn make_symlink(_link_target: &Path, _at: &Path) -> io::Result<()> {
    Err(io::Error::other("symlinks are only supported on Unix"))
}
