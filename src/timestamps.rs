//! Timestamps - Recursive modification times and the most-recent tie-break

use crate::probe::Probe;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

/// Granularity used when comparing modification times
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Seconds,
    Minutes,
}

impl Precision {
    /// Truncate a timestamp to whole units since the Unix epoch
    pub fn truncate(&self, time: SystemTime) -> u64 {
        let secs = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        match self {
            Precision::Seconds => secs,
            Precision::Minutes => secs / 60,
        }
    }
}

/// Latest modification time of a path
///
/// For a file this is its own mtime. For a directory it is the newest mtime
/// of any file beneath it; the directories' own metadata is ignored, and an
/// empty tree yields `None`. Symlinks are not followed.
pub fn latest_mtime(path: &Path) -> Option<SystemTime> {
    let metadata = std::fs::symlink_metadata(path).ok()?;
    if !metadata.is_dir() {
        return metadata.modified().ok();
    }

    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_type().is_dir())
        .filter_map(|entry| entry.metadata().ok())
        .filter_map(|metadata| metadata.modified().ok())
        .max()
}

/// Latest modification time across several paths
pub fn latest_of<'a, I>(paths: I, probe: &dyn Probe) -> Option<SystemTime>
where
    I: IntoIterator<Item = &'a str>,
{
    paths
        .into_iter()
        .filter_map(|path| probe.latest_mtime(path))
        .max()
}

/// Pick the candidate with the latest recursive mtime
///
/// Ties go to whichever candidate was enumerated first. Candidates without
/// any timestamp only win if nothing else has one.
pub fn most_recent<'a>(candidates: &'a [String], probe: &dyn Probe) -> Option<&'a String> {
    let mut best: Option<(&String, Option<SystemTime>)> = None;

    for candidate in candidates {
        let mtime = probe.latest_mtime(candidate);
        match best {
            Some((_, best_mtime)) if mtime <= best_mtime => {}
            _ => best = Some((candidate, mtime)),
        }
    }

    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::DiskProbe;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(path: &Path, secs: u64) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let file = File::create(path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
    }

    #[test]
    fn directory_mtime_is_newest_file_beneath() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a.sav"), 1_000);
        touch(&dir.path().join("deep/nested/b.sav"), 5_000);
        touch(&dir.path().join("deep/c.sav"), 3_000);

        assert_eq!(
            latest_mtime(dir.path()),
            Some(UNIX_EPOCH + Duration::from_secs(5_000))
        );
    }

    #[test]
    fn empty_directory_has_no_mtime() {
        let dir = TempDir::new().unwrap();
        assert_eq!(latest_mtime(dir.path()), None);
        assert_eq!(latest_mtime(&dir.path().join("missing")), None);
    }

    #[test]
    fn most_recent_prefers_later_tree_and_first_on_ties() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("old/x"), 1_000);
        touch(&dir.path().join("new/x"), 2_000);
        touch(&dir.path().join("same/x"), 2_000);

        let candidates: Vec<String> = ["old", "new", "same"]
            .iter()
            .map(|name| dir.path().join(name).to_string_lossy().to_string())
            .collect();

        assert_eq!(most_recent(&candidates, &DiskProbe), Some(&candidates[1]));
        assert_eq!(most_recent(&[], &DiskProbe), None);
    }

    #[test]
    fn precision_truncates() {
        let t = UNIX_EPOCH + Duration::from_millis(125_900);
        assert_eq!(Precision::Seconds.truncate(t), 125);
        assert_eq!(Precision::Minutes.truncate(t), 2);
    }
}
