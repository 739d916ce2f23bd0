//! Reducer - Turns a resolved path back into a portable template
//!
//! The template and the resolved path are walked segment by segment. Root
//! placeholders stay symbolic, with the cursor in the resolved path skipping
//! however many segments their value spans. Wildcard segments collapse to
//! the entry they matched, and `uid` is replaced by the discovered id.

use crate::context::ResolutionContext;
use crate::placeholder::{Placeholder, PlaceholderRegistry};
use crate::template;

/// Build the template stored in a backup manifest
pub fn finalize(
    template: &str,
    resolved: &str,
    uid: Option<&str>,
    placeholders: &PlaceholderRegistry,
    context: &ResolutionContext,
) -> String {
    let template_segments = template::split_segments(template);
    let resolved_segments = template::split_path(resolved);
    let mut cursor = 0;
    let mut out: Vec<String> = Vec::with_capacity(template_segments.len());

    for segment in &template_segments {
        let matched = resolved_segments.get(cursor).copied();

        if let Some(placeholder) = template::sole_placeholder(segment) {
            match placeholder {
                Placeholder::Deferred => {
                    out.push(uid.or(matched).unwrap_or(segment).to_string());
                    cursor += 1;
                }
                Placeholder::Unknown(_) => {
                    out.push(segment.clone());
                    cursor += 1;
                }
                _ => {
                    out.push(segment.clone());
                    cursor += placeholders
                        .value_of(&placeholder, context)
                        .map(|value| template::segment_count(&value))
                        .unwrap_or(1);
                }
            }
            continue;
        }

        let reduced = if template::has_wildcard(segment) {
            matched.unwrap_or(segment).to_string()
        } else if template::contains_uid(segment) {
            match uid {
                Some(uid) => template::substitute_uid(segment, uid),
                None => matched.unwrap_or(segment).to_string(),
            }
        } else {
            segment.clone()
        };
        out.push(reduced);
        cursor += 1;
    }

    template::join_segments(&out, context.separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::MemoryProbe;
    use crate::resolver::Resolver;

    #[test]
    fn steam_uid_is_baked_in() {
        let registry = PlaceholderRegistry::new();
        let context = ResolutionContext::new()
            .with_separator('\\')
            .with_steam_root("D:\\Steam");

        assert_eq!(
            finalize(
                "{{p|steam}}\\userdata\\{{p|uid}}\\327030",
                "D:\\Steam\\userdata\\477235894\\327030",
                Some("477235894"),
                &registry,
                &context,
            ),
            "{{p|steam}}\\userdata\\477235894\\327030"
        );
    }

    #[test]
    fn multi_segment_values_advance_the_cursor() {
        let registry = PlaceholderRegistry::new().with("userprofile/documents", "C:\\Users\\me\\Documents");
        let context = ResolutionContext::new().with_separator('\\');

        assert_eq!(
            finalize(
                "{{p|userprofile/documents}}\\My Games\\*\\Saves",
                "C:\\Users\\me\\Documents\\My Games\\Slot A\\Saves",
                None,
                &registry,
                &context,
            ),
            "{{p|userprofile/documents}}\\My Games\\Slot A\\Saves"
        );
    }

    #[test]
    fn mixed_segments_keep_their_literal_parts() {
        let registry = PlaceholderRegistry::new();
        let context = ResolutionContext::new()
            .with_separator('/')
            .with_game_install_path("/games/deep/rock");

        assert_eq!(
            finalize(
                "{{p|game}}/Saves/user_{{p|uid}}/*.sav",
                "/games/deep/rock/Saves/user_42/slot1.sav",
                Some("42"),
                &registry,
                &context,
            ),
            "{{p|game}}/Saves/user_42/slot1.sav"
        );
    }

    #[test]
    fn normalizes_mixed_separators() {
        let registry = PlaceholderRegistry::new().with("appdata", "C:/Users/me/AppData/Roaming");
        let context = ResolutionContext::new().with_separator('\\');

        assert_eq!(
            finalize(
                "{{P|AppData}}/Game/*",
                "C:\\Users\\me\\AppData\\Roaming\\Game\\profile.dat",
                None,
                &registry,
                &context,
            ),
            "{{p|appdata}}\\Game\\profile.dat"
        );
    }

    #[test]
    fn finalized_template_resolves_to_the_same_path() {
        let registry = PlaceholderRegistry::new();
        let context = ResolutionContext::new()
            .with_separator('\\')
            .with_ubisoft_root("C:\\Program Files (x86)\\Ubisoft\\Ubisoft Game Launcher")
            .with_candidate_uid("nobody");
        let probe = MemoryProbe::new()
            .with_file(
                "C:\\Program Files (x86)\\Ubisoft\\Ubisoft Game Launcher\\savegames\\0c1d-ab\\856\\1.save",
                100,
            );
        let resolver = Resolver::new(&registry, &context, &probe);

        let template = "{{p|uplay}}\\savegames\\{{p|uid}}\\856";
        let first = resolver.resolve(template);
        assert_eq!(first.uid(), Some("0c1d-ab"));

        let portable = finalize(template, first.path(), first.uid(), &registry, &context);
        assert_eq!(portable, "{{p|uplay}}\\savegames\\0c1d-ab\\856");
        assert_eq!(resolver.resolve(&portable).path(), first.path());
    }
}
