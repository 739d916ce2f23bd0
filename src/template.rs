//! Template - Path segment helpers shared by the resolver and reducer
//!
//! Templates may mix `/` and `\`. Placeholder names may themselves contain a
//! slash (`{{p|userprofile/documents}}`), so splitting has to treat every
//! placeholder token as atomic.

use crate::placeholder::{self, Placeholder};
use crate::PLACEHOLDER_REGEX;

/// Filesystem wildcard character
pub const WILDCARD: char = '*';

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Check whether a string contains a wildcard outside placeholder tokens
pub fn has_wildcard(s: &str) -> bool {
    PLACEHOLDER_REGEX.replace_all(s, "").contains(WILDCARD)
}

/// Check whether a resolved path lives in the Windows registry namespace
pub fn is_registry_path(path: &str) -> bool {
    path.get(..5)
        .map(|prefix| prefix.eq_ignore_ascii_case("HKEY_"))
        .unwrap_or(false)
}

/// Split a template into path segments, keeping placeholder tokens whole
/// and rewriting them to their canonical `{{p|name}}` spelling
pub fn split_segments(template: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut last = 0;

    fn push_literal(literal: &str, current: &mut String, segments: &mut Vec<String>) {
        for c in literal.chars() {
            if is_separator(c) {
                segments.push(std::mem::take(current));
            } else {
                current.push(c);
            }
        }
    }

    for captures in PLACEHOLDER_REGEX.captures_iter(template) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        push_literal(&template[last..whole.start()], &mut current, &mut segments);
        current.push_str(&Placeholder::token_for(name.as_str()));
        last = whole.end();
    }
    push_literal(&template[last..], &mut current, &mut segments);
    segments.push(current);

    segments
}

/// Split a concrete path on either separator
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(is_separator).collect()
}

/// Join segments with the canonical separator
pub fn join_segments<S: AsRef<str>>(segments: &[S], separator: char) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(separator);
        }
        out.push_str(segment.as_ref());
    }
    out
}

/// Rewrite all separators (outside placeholder tokens) to `separator`
pub fn normalize(template: &str, separator: char) -> String {
    join_segments(&split_segments(template), separator)
}

/// Normalize separators of a plain value and drop trailing ones
pub fn normalize_value(value: &str, separator: char) -> String {
    let trimmed = value.trim_end_matches(is_separator);
    let trimmed = if trimmed.is_empty() { value } else { trimmed };
    trimmed.chars().map(|c| if is_separator(c) { separator } else { c }).collect()
}

/// Number of path segments a placeholder value spans
pub fn segment_count(value: &str) -> usize {
    split_path(value.trim_end_matches(is_separator)).len()
}

/// If the segment consists of exactly one placeholder token, parse it
pub fn sole_placeholder(segment: &str) -> Option<Placeholder> {
    let captures = PLACEHOLDER_REGEX.captures(segment)?;
    let whole = captures.get(0)?;
    if whole.start() == 0 && whole.end() == segment.len() {
        captures.get(1).map(|name| Placeholder::parse(name.as_str()))
    } else {
        None
    }
}

/// Check whether a segment contains the `uid` token
pub fn contains_uid(segment: &str) -> bool {
    PLACEHOLDER_REGEX
        .captures_iter(segment)
        .filter_map(|c| c.get(1))
        .any(|name| Placeholder::parse(name.as_str()) == Placeholder::Deferred)
}

/// Replace every `uid` token in `s` with `value`
pub fn substitute_uid(s: &str, value: &str) -> String {
    PLACEHOLDER_REGEX
        .replace_all(s, |captures: &regex::Captures| {
            let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            if Placeholder::parse(name) == Placeholder::Deferred {
                value.to_string()
            } else {
                captures[0].to_string()
            }
        })
        .into_owned()
}

/// Canonical token for `uid`
pub fn uid_token() -> String {
    placeholder::token("uid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_both_separators_keeping_tokens_whole() {
        assert_eq!(
            split_segments("{{P|UserProfile/Documents}}\\My Games/Save"),
            vec!["{{p|userprofile/documents}}", "My Games", "Save"]
        );
        assert_eq!(
            split_segments("{{p|steam}}\\userdata\\user_{{p|uid}}"),
            vec!["{{p|steam}}", "userdata", "user_{{p|uid}}"]
        );
    }

    #[test]
    fn normalizes_to_one_separator() {
        assert_eq!(normalize("a/b\\c", '\\'), "a\\b\\c");
        assert_eq!(normalize("/home/me/x", '/'), "/home/me/x");
        assert_eq!(normalize_value("D:/Steam\\", '\\'), "D:\\Steam");
    }

    #[test]
    fn counts_segments_of_multi_level_values() {
        assert_eq!(segment_count("D:\\Steam"), 2);
        assert_eq!(segment_count("D:\\Games\\Steam\\"), 3);
        assert_eq!(segment_count("/home/me"), 3);
    }

    #[test]
    fn wildcards_inside_tokens_do_not_count() {
        assert!(has_wildcard("{{p|appdata}}\\Game\\*.sav"));
        assert!(!has_wildcard("{{p|appdata}}\\Game"));
    }

    #[test]
    fn detects_registry_paths() {
        assert!(is_registry_path("HKEY_CURRENT_USER\\Software\\Game"));
        assert!(is_registry_path("hkey_local_machine\\Software"));
        assert!(!is_registry_path("C:\\HKEY"));
    }

    #[test]
    fn substitutes_uid_only() {
        assert_eq!(
            substitute_uid("{{p|steam}}/user_{{P|UID}}", "42"),
            "{{p|steam}}/user_42"
        );
        assert!(contains_uid("user_{{p|uid}}"));
        assert!(!contains_uid("{{p|steam}}"));
        assert_eq!(sole_placeholder("{{p|game}}"), Some(Placeholder::parse("game")));
        assert_eq!(sole_placeholder("x{{p|game}}"), None);
    }
}
