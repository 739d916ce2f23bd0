//! Config - User settings stored as `settings.json`

use crate::context::ResolutionContext;
use crate::timestamps::Precision;
use crate::{Result, BACKUP_DIR, DEFAULT_MAX_BACKUPS};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Default settings file name, relative to the working directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Environment variable overriding the settings file location
pub const CONFIG_ENV: &str = "SAVEKEEPER_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backup_root: PathBuf,
    pub max_backups: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steam_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ubisoft_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steam64_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steam3_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ubisoft_id: Option<String>,
    pub time_precision: Precision,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup_root: PathBuf::from(BACKUP_DIR),
            max_backups: DEFAULT_MAX_BACKUPS,
            steam_root: None,
            ubisoft_root: None,
            steam64_id: None,
            steam3_id: None,
            ubisoft_id: None,
            time_precision: Precision::default(),
        }
    }
}

impl Settings {
    /// Settings file to use: explicit path, else `SAVEKEEPER_CONFIG`, else
    /// `settings.json`
    pub fn path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE))
    }

    /// Load settings; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        let settings = serde_json::from_reader(BufReader::new(file))?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Retention limit, never below one
    pub fn retention(&self) -> usize {
        self.max_backups.max(1)
    }

    /// Candidate user IDs in lookup order: Steam64, Steam3, Ubisoft
    pub fn candidate_uids(&self) -> Vec<String> {
        [&self.steam64_id, &self.steam3_id, &self.ubisoft_id]
            .into_iter()
            .flatten()
            .filter(|id| !id.is_empty())
            .cloned()
            .collect()
    }

    /// Resolution context for a game installed at `game_install_path`
    pub fn context_for(&self, game_install_path: Option<&str>) -> ResolutionContext {
        let mut context = ResolutionContext::new().for_game(game_install_path);
        context.steam_root = self.steam_root.clone();
        context.ubisoft_root = self.ubisoft_root.clone();
        context.candidate_uids = self.candidate_uids();
        context
    }
}
