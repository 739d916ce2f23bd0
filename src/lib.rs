//! Savekeeper - Locate, back up and restore PC game save data
//!
//! This library expands portable save-path templates such as
//! `{{p|steam}}\userdata\{{p|uid}}\327030` into concrete paths on the
//! current machine, copies them into timestamped backup instances, and
//! restores them later while guarding against overwriting newer saves.

use lazy_static::lazy_static;
use regex::Regex;

pub mod backup;
pub mod config;
pub mod conflict;
pub mod context;
pub mod copy;
pub mod formatters;
pub mod game;
pub mod manifest;
pub mod placeholder;
pub mod probe;
pub mod reducer;
pub mod regtool;
pub mod report;
pub mod resolver;
pub mod restore;
pub mod template;
pub mod timestamps;

pub use backup::{Backup, BackupInstance};
pub use config::Settings;
pub use conflict::{BatchDecision, Conflict, ConflictResolver, PromptAnswer};
pub use context::ResolutionContext;
pub use formatters::Formatters;
pub use game::{Game, GameDatabase};
pub use manifest::{BackupManifest, BackupPathRecord, PathType};
pub use placeholder::{Placeholder, PlaceholderRegistry};
pub use probe::{DiskProbe, Probe};
pub use reducer::finalize;
pub use regtool::{NoRegistry, RegExe, RegistryTool};
pub use report::{BatchReport, GameOutcome, Operation};
pub use resolver::{Resolution, ResolvedPath, Resolver};
pub use restore::Restorer;

/// Name of the manifest written into every backup instance
pub const MANIFEST_FILE: &str = "backup_info.json";

/// File name used for exported registry keys inside a backup instance
pub const REGISTRY_EXPORT_FILE: &str = "registry.reg";

/// `chrono` format of backup instance directory names (`YYYY-MM-DD_HH-mm`)
pub const INSTANCE_NAME_FORMAT: &str = "%Y-%m-%d_%H-%M";

/// Default backup directory relative to the working directory
pub const BACKUP_DIR: &str = "backups";

/// Default number of backup instances kept per game
pub const DEFAULT_MAX_BACKUPS: usize = 5;

lazy_static! {
    /// Placeholder token, e.g. `{{p|steam}}`, `{{P\userprofile/documents}}`
    pub static ref PLACEHOLDER_REGEX: Regex =
        Regex::new(r"(?i)\{\{p[|/\\]([^{}]+)\}\}").unwrap();

    /// Backup instance directory name
    pub static ref INSTANCE_NAME_REGEX: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}_\d{2}-\d{2}$").unwrap();
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid wildcard pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Unresolved placeholder: {0}")]
    UnresolvedPlaceholder(String),

    #[error("Game not found: {0}")]
    GameNotFound(String),

    #[error("Multiple games found for '{0}': {1:?}")]
    MultipleGamesFound(String, Vec<String>),

    #[error("Registry tool failed: {0}")]
    RegistryTool(String),

    #[error("No backup available for {0}")]
    NoBackup(String),

    #[error("No save data found for {0}")]
    NoSaveData(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, Error>;
