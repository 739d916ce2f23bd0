//! Resolver - Expands save-path templates into concrete paths on this machine
//!
//! Resolution never fails loudly. A template with a placeholder that cannot
//! be expanded is a data problem upstream and is logged; a template whose
//! `uid` matches nothing on disk is simply absent. Either way the template
//! contributes no paths and the rest of the game is still processed.

use crate::context::ResolutionContext;
use crate::game::Game;
use crate::manifest::PathType;
use crate::placeholder::{Placeholder, PlaceholderRegistry};
use crate::probe::Probe;
use crate::regtool::RegistryTool;
use crate::template::{self, WILDCARD};
use crate::timestamps;
use crate::PLACEHOLDER_REGEX;
use regex::Regex;

/// Outcome of expanding one template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Expanded path, possibly still holding `*` wildcards, and the uid used
    Resolved { path: String, uid: Option<String> },
    /// A placeholder could not be expanded
    Unresolved(String),
    /// The template needed a uid and nothing on disk matched
    NoMatch,
}

impl Resolution {
    /// Resolved path, or `""` when resolution failed
    pub fn path(&self) -> &str {
        match self {
            Resolution::Resolved { path, .. } => path,
            Resolution::Unresolved(_) | Resolution::NoMatch => "",
        }
    }

    pub fn uid(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { uid, .. } => uid.as_deref(),
            Resolution::Unresolved(_) | Resolution::NoMatch => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

/// A template expanded to one existing location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub template: String,
    pub resolved: String,
    pub uid: Option<String>,
    pub path_type: PathType,
}

/// Expands templates against a placeholder registry, context and filesystem
pub struct Resolver<'a> {
    placeholders: &'a PlaceholderRegistry,
    context: &'a ResolutionContext,
    probe: &'a dyn Probe,
}

impl<'a> Resolver<'a> {
    pub fn new(
        placeholders: &'a PlaceholderRegistry,
        context: &'a ResolutionContext,
        probe: &'a dyn Probe,
    ) -> Self {
        Self {
            placeholders,
            context,
            probe,
        }
    }

    pub fn context(&self) -> &ResolutionContext {
        self.context
    }

    pub fn placeholders(&self) -> &PlaceholderRegistry {
        self.placeholders
    }

    /// Expand a single template
    pub fn resolve(&self, template: &str) -> Resolution {
        let expanded = match self.substitute(template) {
            Ok(expanded) => expanded,
            Err(name) => {
                tracing::warn!("Unresolved placeholder '{}' in template {}", name, template);
                return Resolution::Unresolved(name);
            }
        };

        if !template::contains_uid(&expanded) {
            return Resolution::Resolved {
                path: expanded,
                uid: None,
            };
        }

        for uid in &self.context.candidate_uids {
            let candidate = template::substitute_uid(&expanded, uid);
            if !self.probe.glob(&candidate).is_empty() {
                tracing::debug!("uid {} matched {}", uid, candidate);
                return Resolution::Resolved {
                    path: candidate,
                    uid: Some(uid.clone()),
                };
            }
        }

        let pattern = template::substitute_uid(&expanded, &WILDCARD.to_string());
        let matches = self.probe.glob(&pattern);
        let Some(matched) = timestamps::most_recent(&matches, self.probe) else {
            tracing::debug!("No uid match for {}", template);
            return Resolution::NoMatch;
        };

        let uid = extract_uid(&expanded, matched);
        tracing::debug!("Discovered uid {:?} from {}", uid, matched);
        Resolution::Resolved {
            path: matched.clone(),
            uid,
        }
    }

    /// Expand a template into every existing location it refers to
    pub fn expand(&self, template: &str, registry: &dyn RegistryTool) -> Vec<ResolvedPath> {
        let resolution = self.resolve(template);
        let Resolution::Resolved { path, uid } = resolution else {
            return Vec::new();
        };

        if template::is_registry_path(&path) {
            if registry.key_exists(&path) {
                return vec![ResolvedPath {
                    template: template.to_string(),
                    resolved: path,
                    uid,
                    path_type: PathType::Reg,
                }];
            }
            tracing::debug!("Registry key {} does not exist", path);
            return Vec::new();
        }

        let found = self.probe.glob(&path);
        if found.is_empty() {
            tracing::debug!("Save path {} does not exist", path);
        }

        found
            .into_iter()
            .map(|resolved| {
                let path_type = if self.probe.is_dir(&resolved) {
                    PathType::Folder
                } else {
                    PathType::File
                };
                ResolvedPath {
                    template: template.to_string(),
                    resolved,
                    uid: uid.clone(),
                    path_type,
                }
            })
            .collect()
    }

    /// Every existing save location of a game, file templates first
    pub fn resolve_game(&self, game: &Game, registry: &dyn RegistryTool) -> Vec<ResolvedPath> {
        let mut paths: Vec<ResolvedPath> = Vec::new();

        for template in game.templates().iter().chain(game.registry_templates()) {
            for path in self.expand(template, registry) {
                if !paths.iter().any(|p| p.resolved == path.resolved) {
                    paths.push(path);
                }
            }
        }

        paths
    }

    /// Replace every placeholder except `uid`; `Err` carries the name of the
    /// first placeholder that could not be expanded
    fn substitute(&self, template: &str) -> Result<String, String> {
        let separator = self.context.separator;
        let mut unresolved: Option<String> = None;

        let segments: Vec<String> = template::split_segments(template)
            .iter()
            .map(|segment| {
                PLACEHOLDER_REGEX
                    .replace_all(segment, |captures: &regex::Captures| {
                        let raw = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
                        let placeholder = Placeholder::parse(raw);
                        if placeholder == Placeholder::Deferred {
                            return template::uid_token();
                        }
                        match self.placeholders.value_of(&placeholder, self.context) {
                            Some(value) => template::normalize_value(&value, separator),
                            None => {
                                unresolved.get_or_insert_with(|| placeholder.name().to_string());
                                captures[0].to_string()
                            }
                        }
                    })
                    .into_owned()
            })
            .collect();

        match unresolved {
            Some(name) => Err(name),
            None => Ok(template::join_segments(&segments, separator)),
        }
    }
}

/// Recover the uid a wildcard search matched
///
/// The segment of `expanded` holding the uid token is turned into a pattern
/// (literal text, `*` as anything, the uid as a capture) and applied to the
/// same segment of the matched path, so `user_{{p|uid}}` against
/// `user_477235894` yields `477235894`.
fn extract_uid(expanded: &str, matched: &str) -> Option<String> {
    let template_segments = template::split_path(expanded);
    let matched_segments = template::split_path(matched);
    let index = template_segments
        .iter()
        .position(|segment| template::contains_uid(segment))?;
    let pattern = uid_pattern(template_segments[index])?;

    pattern
        .captures(matched_segments.get(index)?)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

fn uid_pattern(segment: &str) -> Option<Regex> {
    let token = template::uid_token();
    let mut pattern = String::from("(?i)^");

    for (i, part) in segment.split(token.as_str()).enumerate() {
        match i {
            0 => {}
            1 => pattern.push_str("(.+?)"),
            _ => pattern.push_str(".+?"),
        }
        let literals: Vec<String> = part.split(WILDCARD).map(regex::escape).collect();
        pattern.push_str(&literals.join(".*?"));
    }
    pattern.push('$');

    Regex::new(&pattern).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::MemoryProbe;
    use crate::regtool::NoRegistry;

    fn steam_context() -> ResolutionContext {
        ResolutionContext::new()
            .with_separator('\\')
            .with_steam_root("D:\\Steam")
    }

    /// Holds for templates already written with the canonical separator;
    /// mixed separators are normalized first
    #[test]
    fn plain_canonical_templates_resolve_to_themselves() {
        let registry = PlaceholderRegistry::new();
        let context = ResolutionContext::new().with_separator('\\');
        let probe = MemoryProbe::new();
        let resolver = Resolver::new(&registry, &context, &probe);

        let resolution = resolver.resolve("C:\\Games\\Saves\\*.sav");
        assert_eq!(resolution.path(), "C:\\Games\\Saves\\*.sav");
        assert_eq!(resolution.uid(), None);

        assert_eq!(resolver.resolve("C:/Games\\Saves").path(), "C:\\Games\\Saves");
    }

    #[test]
    fn static_and_contextual_placeholders_expand() {
        let registry = PlaceholderRegistry::new().with("userprofile/documents", "C:/Users/me/Documents");
        let context = ResolutionContext::new()
            .with_separator('\\')
            .with_game_install_path("E:\\Games\\Celeste\\");
        let probe = MemoryProbe::new();
        let resolver = Resolver::new(&registry, &context, &probe);

        assert_eq!(
            resolver.resolve("{{p|userprofile\\documents}}/My Games/x").path(),
            "C:\\Users\\me\\Documents\\My Games\\x"
        );
        assert_eq!(resolver.resolve("{{P|GAME}}\\Saves").path(), "E:\\Games\\Celeste\\Saves");
    }

    #[test]
    fn missing_context_or_unknown_names_are_unresolved() {
        let registry = PlaceholderRegistry::new();
        let context = ResolutionContext::new();
        let probe = MemoryProbe::new();
        let resolver = Resolver::new(&registry, &context, &probe);

        assert_eq!(
            resolver.resolve("{{p|game}}/Saves"),
            Resolution::Unresolved("game".to_string())
        );
        assert_eq!(
            resolver.resolve("{{p|bogus}}/Saves"),
            Resolution::Unresolved("bogus".to_string())
        );
        assert_eq!(resolver.resolve("{{p|bogus}}/Saves").path(), "");
        assert!(!resolver.resolve("{{p|bogus}}/Saves").is_resolved());
    }

    #[test]
    fn first_matching_candidate_uid_wins() {
        let registry = PlaceholderRegistry::new();
        let context = steam_context()
            .with_candidate_uid("111")
            .with_candidate_uid("477235894");
        let probe = MemoryProbe::new()
            .with_file("D:\\Steam\\userdata\\477235894\\327030\\remote\\a.sav", 10)
            .with_file("D:\\Steam\\userdata\\999\\327030\\remote\\a.sav", 99);
        let resolver = Resolver::new(&registry, &context, &probe);

        let resolution = resolver.resolve("{{p|steam}}\\userdata\\{{p|uid}}\\327030");
        assert_eq!(
            resolution,
            Resolution::Resolved {
                path: "D:\\Steam\\userdata\\477235894\\327030".to_string(),
                uid: Some("477235894".to_string()),
            }
        );
    }

    #[test]
    fn wildcard_search_picks_newest_and_extracts_uid() {
        let registry = PlaceholderRegistry::new();
        let context = steam_context().with_candidate_uid("111");
        let probe = MemoryProbe::new()
            .with_file("D:\\Steam\\saves\\user_100\\a.sav", 10)
            .with_file("D:\\Steam\\saves\\user_477235894\\a.sav", 50)
            .with_file("D:\\Steam\\saves\\user_300\\a.sav", 20);
        let resolver = Resolver::new(&registry, &context, &probe);

        let resolution = resolver.resolve("{{p|steam}}\\saves\\user_{{p|uid}}");
        assert_eq!(resolution.path(), "D:\\Steam\\saves\\user_477235894");
        assert_eq!(resolution.uid(), Some("477235894"));
    }

    #[test]
    fn uid_with_nothing_on_disk_is_no_match() {
        let registry = PlaceholderRegistry::new();
        let context = steam_context().with_candidate_uid("1");
        let probe = MemoryProbe::new();
        let resolver = Resolver::new(&registry, &context, &probe);

        assert_eq!(
            resolver.resolve("{{p|steam}}\\userdata\\{{p|uid}}\\327030"),
            Resolution::NoMatch
        );
    }

    #[test]
    fn extract_uid_handles_prefix_suffix_and_wildcards() {
        assert_eq!(
            extract_uid("D:/x/user_{{p|uid}}.dat", "D:/x/user_42.dat").as_deref(),
            Some("42")
        );
        assert_eq!(
            extract_uid("D:/*/{{p|uid}}/x", "D:/anything/abc/x").as_deref(),
            Some("abc")
        );
        assert_eq!(extract_uid("D:/x/y", "D:/x/y"), None);
    }

    #[test]
    fn expand_types_and_deduplicates_paths() {
        let registry = PlaceholderRegistry::new();
        let context = ResolutionContext::new()
            .with_separator('\\')
            .with_game_install_path("E:\\Game");
        let probe = MemoryProbe::new()
            .with_file("E:\\Game\\Saves\\slot1.sav", 1)
            .with_file("E:\\Game\\Saves\\slot2.sav", 2)
            .with_file("E:\\Game\\Config\\user.ini", 3);
        let resolver = Resolver::new(&registry, &context, &probe);

        let mut game = Game::new("Game");
        game.win_paths = vec![
            "{{p|game}}\\Saves\\*.sav".to_string(),
            "{{p|game}}\\Saves\\slot1.sav".to_string(),
            "{{p|game}}\\Config".to_string(),
            "{{p|game}}\\Missing".to_string(),
        ];
        game.linux_paths = game.win_paths.clone();
        game.mac_paths = game.win_paths.clone();

        let paths = resolver.resolve_game(&game, &NoRegistry);
        assert_eq!(paths.len(), 3);
        assert!(paths.iter().filter(|p| p.path_type == PathType::File).count() == 2);
        assert!(paths
            .iter()
            .any(|p| p.resolved == "E:\\Game\\Config" && p.path_type == PathType::Folder));
    }
}
