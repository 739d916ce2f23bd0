//! Game - Save-location metadata for a game and the database it comes from

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Default game database file, relative to the working directory
pub const GAMES_FILE: &str = "games.json";

/// Characters that cannot appear in a Windows file name
const ILLEGAL_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// A game and the templates describing where it keeps its saves
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub title: String,
    #[serde(default, rename = "zh_CN")]
    pub zh_cn: Option<String>,
    /// Install folder name, the key of the game database
    #[serde(default)]
    pub install_folder: Option<String>,
    /// Where the game is installed on this machine
    #[serde(default)]
    pub install_path: Option<String>,
    #[serde(default)]
    pub win_paths: Vec<String>,
    #[serde(default)]
    pub reg_paths: Vec<String>,
    #[serde(default)]
    pub mac_paths: Vec<String>,
    #[serde(default)]
    pub linux_paths: Vec<String>,
}

impl Game {
    /// Create a game with no save locations
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    /// File templates for the current OS
    pub fn templates(&self) -> &[String] {
        if cfg!(windows) {
            &self.win_paths
        } else if cfg!(target_os = "macos") {
            &self.mac_paths
        } else {
            &self.linux_paths
        }
    }

    /// Registry templates (only meaningful on Windows)
    pub fn registry_templates(&self) -> &[String] {
        if cfg!(windows) {
            &self.reg_paths
        } else {
            &[]
        }
    }

    /// Directory name under the backup root holding this game's instances
    pub fn backup_dir_name(&self) -> String {
        let name: String = self
            .title
            .trim()
            .chars()
            .map(|c| {
                if ILLEGAL_NAME_CHARS.contains(&c) || c.is_control() {
                    '_'
                } else {
                    c
                }
            })
            .collect();
        let name = name.trim_end_matches(&['.', ' '][..]);
        if name.is_empty() {
            "_".to_string()
        } else {
            name.to_string()
        }
    }
}

/// Games loaded from a JSON file
#[derive(Debug, Clone, Default)]
pub struct GameDatabase {
    pub games: Vec<Game>,
}

impl GameDatabase {
    pub fn new(games: Vec<Game>) -> Self {
        Self { games }
    }

    /// Load a JSON array of games
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let games: Vec<Game> = serde_json::from_reader(BufReader::new(file))?;
        tracing::debug!("Loaded {} games from {}", games.len(), path.display());
        Ok(Self::new(games))
    }

    /// Find a game from user input
    ///
    /// An exact (case-insensitive) title or install folder wins. Otherwise the
    /// input must be a prefix of exactly one title.
    pub fn find(&self, input: &str) -> Result<&Game> {
        let needle = input.trim().to_lowercase();

        let exact = self.games.iter().find(|g| {
            g.title.to_lowercase() == needle
                || g.install_folder
                    .as_deref()
                    .map(|f| f.to_lowercase() == needle)
                    .unwrap_or(false)
        });
        if let Some(game) = exact {
            return Ok(game);
        }

        let matches: Vec<&Game> = self
            .games
            .iter()
            .filter(|g| g.title.to_lowercase().starts_with(&needle))
            .collect();

        match matches.as_slice() {
            [] => Err(Error::GameNotFound(input.to_string())),
            [game] => Ok(*game),
            _ => Err(Error::MultipleGamesFound(
                input.to_string(),
                matches.iter().map(|g| g.title.clone()).collect(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database() -> GameDatabase {
        let mut hades = Game::new("Hades");
        hades.install_folder = Some("Hades".to_string());
        let mut hades2 = Game::new("Hades II");
        hades2.install_folder = Some("Hades II".to_string());
        let mut witcher = Game::new("The Witcher 3: Wild Hunt");
        witcher.install_folder = Some("The Witcher 3".to_string());
        GameDatabase::new(vec![hades, hades2, witcher])
    }

    #[test]
    fn exact_match_beats_prefix() {
        let db = database();
        assert_eq!(db.find("hades").unwrap().title, "Hades");
        assert_eq!(db.find("The Witcher 3").unwrap().title, "The Witcher 3: Wild Hunt");
    }

    #[test]
    fn ambiguous_and_missing_inputs() {
        let db = database();
        assert!(matches!(db.find("had"), Err(Error::MultipleGamesFound(_, ref v)) if v.len() == 2));
        assert!(matches!(db.find("portal"), Err(Error::GameNotFound(_))));
        assert_eq!(db.find("the w").unwrap().install_folder.as_deref(), Some("The Witcher 3"));
    }

    #[test]
    fn backup_dir_name_is_a_legal_file_name() {
        assert_eq!(Game::new("The Witcher 3: Wild Hunt").backup_dir_name(), "The Witcher 3_ Wild Hunt");
        assert_eq!(Game::new("What?.").backup_dir_name(), "What_");
    }

    #[test]
    fn blank_titles_still_get_their_own_directory() {
        assert_eq!(Game::new("...").backup_dir_name(), "_");
        assert_eq!(Game::new("   ").backup_dir_name(), "_");
    }

    #[test]
    fn missing_template_lists_default_to_empty() {
        let game: Game = serde_json::from_str(r#"{"title":"Celeste","win_paths":["{{p|localappdata}}\\Celeste"]}"#).unwrap();
        assert_eq!(game.win_paths.len(), 1);
        assert!(game.reg_paths.is_empty());
        assert_eq!(game.zh_cn, None);
    }
}
