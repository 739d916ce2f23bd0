//! Probe - Read-only filesystem queries used while resolving templates

use crate::template::WILDCARD;
use crate::timestamps;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Filesystem questions the resolver and conflict checks need answered
pub trait Probe {
    fn exists(&self, path: &str) -> bool;
    fn is_dir(&self, path: &str) -> bool;
    /// Expand `*` wildcards into the existing matching paths
    fn glob(&self, pattern: &str) -> Vec<String>;
    /// Latest modification time; recursive for directories
    fn latest_mtime(&self, path: &str) -> Option<SystemTime>;
}

/// Probe backed by the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskProbe;

impl DiskProbe {
    /// Escape glob metacharacters other than `*`
    fn escape(pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len());
        for c in pattern.chars() {
            match c {
                '[' | ']' | '?' => {
                    out.push('[');
                    out.push(c);
                    out.push(']');
                }
                _ => out.push(c),
            }
        }
        out
    }
}

impl Probe for DiskProbe {
    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn is_dir(&self, path: &str) -> bool {
        Path::new(path).is_dir()
    }

    fn glob(&self, pattern: &str) -> Vec<String> {
        if !pattern.contains(WILDCARD) {
            return if self.exists(pattern) {
                vec![pattern.to_string()]
            } else {
                Vec::new()
            };
        }

        let options = glob::MatchOptions {
            case_sensitive: !cfg!(windows),
            ..Default::default()
        };

        match glob::glob_with(&Self::escape(pattern), options) {
            Ok(paths) => paths
                .filter_map(|entry| entry.ok())
                .map(|p| p.to_string_lossy().to_string())
                .collect(),
            Err(e) => {
                tracing::warn!("Invalid wildcard pattern {}: {}", pattern, e);
                Vec::new()
            }
        }
    }

    fn latest_mtime(&self, path: &str) -> Option<SystemTime> {
        timestamps::latest_mtime(Path::new(path))
    }
}

/// In-memory probe for dry runs and tests
///
/// Paths are compared case-insensitively with either separator. Parent
/// directories of registered entries exist implicitly.
#[derive(Debug, Clone, Default)]
pub struct MemoryProbe {
    files: BTreeMap<String, SystemTime>,
    dirs: Vec<String>,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file with an mtime in seconds since the Unix epoch
    pub fn with_file(mut self, path: &str, mtime_secs: u64) -> Self {
        self.files
            .insert(Self::key(path), UNIX_EPOCH + Duration::from_secs(mtime_secs));
        self
    }

    /// Register an (empty) directory
    pub fn with_dir(mut self, path: &str) -> Self {
        self.dirs.push(Self::key(path));
        self
    }

    fn key(path: &str) -> String {
        path.replace('\\', "/").trim_end_matches('/').to_string()
    }

    fn same(a: &str, b: &str) -> bool {
        a.eq_ignore_ascii_case(b)
    }

    fn is_within(candidate: &str, parent: &str) -> bool {
        candidate.len() > parent.len()
            && candidate.as_bytes()[parent.len()] == b'/'
            && Self::same(&candidate[..parent.len()], parent)
    }

    /// Every path known to exist, including implicit parents
    fn all_paths(&self) -> Vec<String> {
        let mut all: Vec<String> = Vec::new();
        for path in self.files.keys().chain(self.dirs.iter()) {
            let mut prefix = String::new();
            for (i, part) in path.split('/').enumerate() {
                if i > 0 {
                    prefix.push('/');
                }
                prefix.push_str(part);
                if !prefix.is_empty() && !all.iter().any(|p| Self::same(p, &prefix)) {
                    all.push(prefix.clone());
                }
            }
        }
        all
    }
}

impl Probe for MemoryProbe {
    fn exists(&self, path: &str) -> bool {
        let key = Self::key(path);
        self.all_paths().iter().any(|p| Self::same(p, &key))
    }

    fn is_dir(&self, path: &str) -> bool {
        let key = Self::key(path);
        self.dirs.iter().any(|d| Self::same(d, &key))
            || self.all_paths().iter().any(|p| Self::is_within(p, &key))
    }

    fn glob(&self, pattern: &str) -> Vec<String> {
        let key = Self::key(pattern);
        let body: Vec<String> = key.split(WILDCARD).map(regex::escape).collect();
        let Ok(re) = Regex::new(&format!("(?i)^{}$", body.join("[^/]*"))) else {
            return Vec::new();
        };

        let separator = if pattern.contains('\\') { "\\" } else { "/" };
        self.all_paths()
            .into_iter()
            .filter(|p| re.is_match(p))
            .map(|p| p.replace('/', separator))
            .collect()
    }

    fn latest_mtime(&self, path: &str) -> Option<SystemTime> {
        let key = Self::key(path);
        self.files
            .iter()
            .filter(|(p, _)| Self::same(p, &key) || Self::is_within(p, &key))
            .map(|(_, mtime)| *mtime)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn glob_matches_only_existing_entries() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("user_1")).unwrap();
        std::fs::create_dir(dir.path().join("user_2")).unwrap();
        std::fs::write(dir.path().join("other"), b"x").unwrap();

        let pattern = format!("{}/user_*", dir.path().display());
        let mut found = DiskProbe.glob(&pattern);
        found.sort();

        assert_eq!(found.len(), 2);
        assert!(found[0].ends_with("user_1"));
        assert!(found[1].ends_with("user_2"));
    }

    #[test]
    fn brackets_are_literal() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("[v1] saves")).unwrap();

        let pattern = format!("{}/[v1]*", dir.path().display());
        assert_eq!(DiskProbe.glob(&pattern).len(), 1);
    }

    #[test]
    fn memory_probe_answers_like_a_filesystem() {
        let probe = MemoryProbe::new()
            .with_file("D:\\Steam\\userdata\\1\\327030\\a.sav", 10)
            .with_file("D:\\Steam\\userdata\\2\\327030\\b.sav", 20)
            .with_dir("D:\\Steam\\userdata\\3");

        assert!(probe.exists("D:\\Steam\\userdata\\1\\327030"));
        assert!(probe.is_dir("d:/steam/userdata/3"));
        assert!(!probe.is_dir("D:\\Steam\\userdata\\1\\327030\\a.sav"));
        assert_eq!(probe.glob("D:\\Steam\\userdata\\*\\327030").len(), 2);
        assert_eq!(
            probe.latest_mtime("D:\\Steam\\userdata"),
            Some(UNIX_EPOCH + Duration::from_secs(20))
        );
    }

    #[test]
    fn plain_paths_glob_to_themselves_when_present() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_string_lossy().to_string();

        assert_eq!(DiskProbe.glob(&path), vec![path.clone()]);
        assert!(DiskProbe.glob(&format!("{}/missing", path)).is_empty());
    }
}
