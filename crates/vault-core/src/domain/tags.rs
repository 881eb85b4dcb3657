use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Normalized, deduplicated tag set. Unlike [`crate::domain::KeywordSet`]
/// tags are user-supplied and get normalized rather than filtered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet(BTreeSet<String>);

/// Lowercase, collapse whitespace runs into a single hyphen, strip
/// characters outside `[a-z0-9\s-]`, truncate to 50 characters.
pub fn normalize_tag(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let filtered: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    let hyphenated = filtered
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    hyphenated.chars().take(50).collect()
}

impl TagSet {
    pub fn new(raw_tags: impl IntoIterator<Item = String>) -> Self {
        let set = raw_tags
            .into_iter()
            .map(|t| normalize_tag(&t))
            .filter(|t| !t.is_empty())
            .collect();
        TagSet(set)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl IntoIterator for TagSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_spaces_to_hyphens() {
        assert_eq!(normalize_tag("  Rust  Lang  "), "rust-lang");
    }

    #[test]
    fn strips_special_characters() {
        assert_eq!(normalize_tag("C++ / Rust!"), "c-rust");
    }

    #[test]
    fn truncates_to_50_chars() {
        let long = "a".repeat(80);
        assert_eq!(normalize_tag(&long).chars().count(), 50);
    }

    #[test]
    fn tag_set_dedupes_after_normalization() {
        let tags = TagSet::new(["Rust Lang".into(), "rust-lang".into(), "  ".into()]);
        assert_eq!(tags.len(), 1);
        assert!(tags.contains("rust-lang"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalize_tag_never_exceeds_50_chars(raw in ".{0,200}") {
            prop_assert!(normalize_tag(&raw).chars().count() <= 50);
        }

        #[test]
        fn normalize_tag_is_idempotent(raw in ".{0,200}") {
            let once = normalize_tag(&raw);
            let twice = normalize_tag(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn normalize_tag_output_is_lowercase_hyphen_alnum(raw in ".{0,200}") {
            let normalized = normalize_tag(&raw);
            prop_assert!(normalized.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn tag_set_never_exceeds_input_len(raws in prop::collection::vec(".{0,30}", 0..10)) {
            let count = raws.len();
            let tags = TagSet::new(raws);
            prop_assert!(tags.len() <= count);
        }
    }
}
