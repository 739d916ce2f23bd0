//! Placeholder - Symbolic `{{p|name}}` tokens and their machine values

use crate::context::ResolutionContext;
use std::collections::HashMap;
use std::env;
use std::path::MAIN_SEPARATOR;

/// Placeholder names that resolve to a fixed, OS-derived value
pub const STATIC_NAMES: &[&str] = &[
    "username",
    "userprofile",
    "userprofile/documents",
    "appdata",
    "localappdata",
    "programfiles",
    "programdata",
    "public",
    "windir",
    "hkcu",
    "hklm",
    "wow64",
    "osxhome",
    "linuxhome",
    "xdgdatahome",
    "xdgconfighome",
];

/// Placeholders that need per-invocation context to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contextual {
    Game,
    Steam,
    Ubisoft,
}

/// A parsed placeholder name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// Fixed value known at resolution time
    Static(String),
    /// Value taken from the resolution context
    Contextual(Contextual),
    /// `uid`, only discoverable by probing the filesystem
    Deferred,
    /// Not part of the vocabulary; preserved literally
    Unknown(String),
}

impl Placeholder {
    /// Parse a raw placeholder name (case-insensitive, either slash)
    pub fn parse(raw: &str) -> Self {
        let name = normalize_name(raw);
        match name.as_str() {
            "game" => Placeholder::Contextual(Contextual::Game),
            "steam" => Placeholder::Contextual(Contextual::Steam),
            "uplay" | "ubisoftconnect" => Placeholder::Contextual(Contextual::Ubisoft),
            "uid" => Placeholder::Deferred,
            n if STATIC_NAMES.contains(&n) => Placeholder::Static(name),
            _ => Placeholder::Unknown(name),
        }
    }

    /// Canonical name of this placeholder
    pub fn name(&self) -> &str {
        match self {
            Placeholder::Static(name) | Placeholder::Unknown(name) => name,
            Placeholder::Contextual(Contextual::Game) => "game",
            Placeholder::Contextual(Contextual::Steam) => "steam",
            Placeholder::Contextual(Contextual::Ubisoft) => "uplay",
            Placeholder::Deferred => "uid",
        }
    }

    /// Canonical `{{p|name}}` token, keeping the original spelling for
    /// aliases such as `ubisoftconnect`
    pub fn token_for(raw: &str) -> String {
        token(&normalize_name(raw))
    }
}

/// Lowercase a placeholder name and use `/` as its inner separator
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase().replace('\\', "/")
}

/// Build a `{{p|name}}` token
pub fn token(name: &str) -> String {
    format!("{{{{p|{}}}}}", name)
}

/// Static placeholder values for the current machine
#[derive(Debug, Clone, Default)]
pub struct PlaceholderRegistry {
    values: HashMap<String, String>,
}

impl PlaceholderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the process environment
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
        let home = var("HOME").or_else(|| var("USERPROFILE"));
        let userprofile = var("USERPROFILE").or_else(|| home.clone());

        let mut registry = Self::new()
            .with("hkcu", "HKEY_CURRENT_USER")
            .with("hklm", "HKEY_LOCAL_MACHINE")
            .with("wow64", "WOW6432Node");

        let pairs = [
            ("username", var("USERNAME").or_else(|| var("USER"))),
            (
                "userprofile/documents",
                userprofile
                    .as_ref()
                    .map(|p| format!("{}{}Documents", p, MAIN_SEPARATOR)),
            ),
            ("userprofile", userprofile),
            ("appdata", var("APPDATA")),
            ("localappdata", var("LOCALAPPDATA")),
            ("programfiles", var("ProgramFiles")),
            ("programdata", var("ProgramData")),
            ("public", var("PUBLIC")),
            ("windir", var("WINDIR").or_else(|| var("SystemRoot"))),
            ("osxhome", home.clone()),
            ("linuxhome", home.clone()),
            (
                "xdgdatahome",
                var("XDG_DATA_HOME").or_else(|| home.as_ref().map(|h| format!("{}/.local/share", h))),
            ),
            (
                "xdgconfighome",
                var("XDG_CONFIG_HOME").or_else(|| home.as_ref().map(|h| format!("{}/.config", h))),
            ),
        ];

        for (name, value) in pairs {
            if let Some(value) = value {
                registry.values.insert(name.to_string(), value);
            }
        }

        registry
    }

    /// Set a static value
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values.insert(normalize_name(name), value.to_string());
        self
    }

    /// Look up a static value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(&normalize_name(name)).map(|s| s.as_str())
    }

    /// Value a placeholder expands to, or `None` if it cannot be expanded
    /// from static knowledge and the given context
    pub fn value_of(&self, placeholder: &Placeholder, context: &ResolutionContext) -> Option<String> {
        match placeholder {
            Placeholder::Static(name) => self.get(name).map(|s| s.to_string()),
            Placeholder::Contextual(Contextual::Game) => context.game_install_path.clone(),
            Placeholder::Contextual(Contextual::Steam) => context.steam_root.clone(),
            Placeholder::Contextual(Contextual::Ubisoft) => context.ubisoft_root.clone(),
            Placeholder::Deferred | Placeholder::Unknown(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vocabulary_case_insensitively() {
        assert_eq!(Placeholder::parse("STEAM"), Placeholder::Contextual(Contextual::Steam));
        assert_eq!(Placeholder::parse("UbisoftConnect"), Placeholder::Contextual(Contextual::Ubisoft));
        assert_eq!(Placeholder::parse("uid"), Placeholder::Deferred);
        assert_eq!(
            Placeholder::parse("UserProfile\\Documents"),
            Placeholder::Static("userprofile/documents".to_string())
        );
        assert_eq!(Placeholder::parse("nope"), Placeholder::Unknown("nope".to_string()));
    }

    #[test]
    fn contextual_values_come_from_context() {
        let registry = PlaceholderRegistry::new().with("appdata", "C:\\Users\\me\\AppData\\Roaming");
        let context = ResolutionContext::new().with_steam_root("D:\\Steam");

        assert_eq!(
            registry.value_of(&Placeholder::parse("steam"), &context).as_deref(),
            Some("D:\\Steam")
        );
        assert_eq!(registry.value_of(&Placeholder::parse("game"), &context), None);
        assert_eq!(
            registry.value_of(&Placeholder::parse("APPDATA"), &context).as_deref(),
            Some("C:\\Users\\me\\AppData\\Roaming")
        );
        assert_eq!(registry.value_of(&Placeholder::Deferred, &context), None);
    }

    #[test]
    fn registry_roots_are_always_known() {
        let registry = PlaceholderRegistry::from_env();
        assert_eq!(registry.get("hkcu"), Some("HKEY_CURRENT_USER"));
        assert_eq!(registry.get("wow64"), Some("WOW6432Node"));
    }
}
