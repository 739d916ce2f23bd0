//! ResolutionContext - Machine-specific inputs for expanding a template

use std::path::MAIN_SEPARATOR;

/// Per-invocation values needed to expand a template
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    /// Install directory of the game being processed
    pub game_install_path: Option<String>,
    /// Detected Steam install root
    pub steam_root: Option<String>,
    /// Detected Ubisoft Connect install root
    pub ubisoft_root: Option<String>,
    /// User IDs tried, in order, when a template contains `{{p|uid}}`
    pub candidate_uids: Vec<String>,
    /// Canonical path separator
    pub separator: char,
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self {
            game_install_path: None,
            steam_root: None,
            ubisoft_root: None,
            candidate_uids: Vec::new(),
            separator: MAIN_SEPARATOR,
        }
    }
}

impl ResolutionContext {
    /// Create an empty context using the host separator
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_game_install_path(mut self, path: impl Into<String>) -> Self {
        self.game_install_path = Some(path.into());
        self
    }

    pub fn with_steam_root(mut self, path: impl Into<String>) -> Self {
        self.steam_root = Some(path.into());
        self
    }

    pub fn with_ubisoft_root(mut self, path: impl Into<String>) -> Self {
        self.ubisoft_root = Some(path.into());
        self
    }

    /// Append a candidate user ID (lower priority than those already added)
    pub fn with_candidate_uid(mut self, uid: impl Into<String>) -> Self {
        self.candidate_uids.push(uid.into());
        self
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Same context for a different game install directory
    pub fn for_game(&self, game_install_path: Option<&str>) -> Self {
        Self {
            game_install_path: game_install_path.map(|s| s.to_string()),
            ..self.clone()
        }
    }
}
