//! Story slugs.

use regex::Regex;
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("static slug pattern"));

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("static slug pattern"));

/// Turn a title into a lowercase, hyphen-separated slug.
///
/// Characters other than letters, digits, underscores, whitespace and
/// hyphens are dropped; runs of whitespace and hyphens collapse to a single
/// hyphen. Leading and trailing hyphens and underscores are trimmed.
#[must_use]
pub fn slugify(title: &str) -> String {
    let ascii: String = title.chars().filter(char::is_ascii).collect();
    let lowered = ascii.to_lowercase();
    let cleaned = NON_WORD.replace_all(&lowered, "");
    let hyphenated = SEPARATORS.replace_all(cleaned.trim(), "-");
    hyphenated.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Append a disambiguating suffix to a slug that is already taken.
#[must_use]
pub fn slug_with_suffix(slug: &str, suffix: &str) -> String {
    if slug.is_empty() {
        suffix.to_string()
    } else {
        format!("{slug}-{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("The Lost Lighthouse"), "the-lost-lighthouse");
    }

    #[test]
    fn test_slugify_punctuation_and_spaces() {
        assert_eq!(slugify("  Hello,   World! -- Again  "), "hello-world-again");
    }

    #[test]
    fn test_slugify_drops_non_ascii() {
        assert_eq!(slugify("Café Noir"), "caf-noir");
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slug_with_suffix() {
        assert_eq!(slug_with_suffix("my-story", "1a2b3c4d"), "my-story-1a2b3c4d");
        assert_eq!(slug_with_suffix("", "1a2b3c4d"), "1a2b3c4d");
    }
}
