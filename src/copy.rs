//! Copy - Recursive copies that keep timestamps, and a progress-reporting move

use crate::{Error, Result};
use std::fs::{self, File, FileTimes};
use std::path::Path;
use walkdir::WalkDir;

/// Byte progress of a long-running move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub copied: u64,
    pub total: u64,
}

/// Copy one file, creating parent directories and keeping its access and
/// modification times. Returns the number of bytes copied.
pub fn copy_file(src: &Path, dest: &Path) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = fs::copy(src, dest)?;

    let metadata = fs::metadata(src)?;
    let mut times = FileTimes::new();
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Err(e) = File::options().write(true).open(dest).and_then(|f| f.set_times(times)) {
        tracing::debug!("Could not keep timestamps on {}: {}", dest.display(), e);
    }

    Ok(bytes)
}

/// Copy the contents of `src` into `dest`, overwriting existing files
///
/// Symlinks are skipped. Returns the number of bytes copied.
pub fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<u64> {
    tracing::debug!("Copying {} -> {}", src.display(), dest.display());
    fs::create_dir_all(dest)?;

    let mut bytes = 0;
    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry?;
        let rel_path = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| Error::InvalidPath(entry.path().display().to_string()))?;
        let new_path = dest.join(rel_path);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&new_path)?;
        } else if entry.file_type().is_symlink() {
            tracing::debug!("Skipping symlink {}", entry.path().display());
        } else {
            bytes += copy_file(entry.path(), &new_path)?;
        }
    }

    Ok(bytes)
}

/// Total size of the files beneath a directory
pub fn tree_size(path: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Move a directory tree to a new location, reporting byte progress after
/// each file. Not cancellable; the source is removed only after every file
/// has been copied.
pub fn move_tree<F>(from: &Path, to: &Path, mut progress: F) -> Result<u64>
where
    F: FnMut(Progress),
{
    if !from.is_dir() {
        return Err(Error::InvalidPath(from.display().to_string()));
    }
    if to.starts_with(from) {
        return Err(Error::InvalidPath(format!(
            "{} is inside {}",
            to.display(),
            from.display()
        )));
    }

    let total = tree_size(from)?;
    let mut copied = 0;
    progress(Progress { copied, total });

    fs::create_dir_all(to)?;
    for entry in WalkDir::new(from).min_depth(1).follow_links(false) {
        let entry = entry?;
        let rel_path = entry
            .path()
            .strip_prefix(from)
            .map_err(|_| Error::InvalidPath(entry.path().display().to_string()))?;
        let new_path = to.join(rel_path);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&new_path)?;
        } else if entry.file_type().is_file() {
            copied += copy_file(entry.path(), &new_path)?;
            progress(Progress { copied, total });
        }
    }

    fs::remove_dir_all(from)?;
    tracing::info!("Moved {} bytes from {} to {}", copied, from.display(), to.display());
    Ok(copied)
}
