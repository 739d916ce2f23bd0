//! Manifest - The `backup_info.json` record written into each backup instance

use crate::{Result, MANIFEST_FILE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Kind of save location a path refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    Folder,
    File,
    Reg,
}

impl std::fmt::Display for PathType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathType::Folder => write!(f, "folder"),
            PathType::File => write!(f, "file"),
            PathType::Reg => write!(f, "reg"),
        }
    }
}

/// One backed-up location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPathRecord {
    /// Subfolder of the instance holding the data (`path1`, `path2`, ...)
    pub folder_name: String,
    /// Portable template the data was resolved from
    pub template: String,
    #[serde(rename = "type")]
    pub path_type: PathType,
    pub install_folder: Option<String>,
}

/// Manifest of a single backup instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub title: String,
    #[serde(rename = "zh_CN")]
    pub zh_cn: Option<String>,
    pub backup_paths: Vec<BackupPathRecord>,
}

impl BackupManifest {
    pub fn new(title: String, zh_cn: Option<String>) -> Self {
        Self {
            title,
            zh_cn,
            backup_paths: Vec::new(),
        }
    }

    /// Check that every `folder_name` is unique
    pub fn has_unique_folders(&self) -> bool {
        let mut seen = HashSet::new();
        self.backup_paths
            .iter()
            .all(|record| seen.insert(record.folder_name.as_str()))
    }

    /// Read the manifest of a backup instance directory
    pub fn read_from(instance_dir: &Path) -> Result<Self> {
        let file = File::open(instance_dir.join(MANIFEST_FILE))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Write the manifest into a backup instance directory
    pub fn write_to(&self, instance_dir: &Path) -> Result<()> {
        let file = File::create(instance_dir.join(MANIFEST_FILE))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
