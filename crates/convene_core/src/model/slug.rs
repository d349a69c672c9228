//! URI-friendly slugs derived from display names.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug separator regex"));

/// Derives a slug from `name`: lowercase ASCII alphanumerics joined by `-`.
///
/// Returns `None` when nothing slug-worthy remains (e.g. `"!!!"` or `"   "`).
///
/// Non-ASCII letters are dropped rather than transliterated.
pub fn slugify(name: &str) -> Option<String> {
    let lowered = name.trim().to_ascii_lowercase();
    let slug = NON_SLUG_RE.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        return None;
    }
    Some(slug.to_string())
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn collapses_separators_and_lowercases() {
        assert_eq!(slugify("Entrance Hall").as_deref(), Some("entrance-hall"));
        assert_eq!(slugify("  Talk to  Zee!  ").as_deref(), Some("talk-to-zee"));
        assert_eq!(slugify("Listed Room 1").as_deref(), Some("listed-room-1"));
    }

    #[test]
    fn rejects_names_without_slug_characters() {
        assert_eq!(slugify("!!!"), None);
        assert_eq!(slugify("   "), None);
    }

    #[test]
    fn different_names_can_share_a_slug() {
        assert_eq!(slugify("Lobby"), slugify("lobby!"));
    }
}
