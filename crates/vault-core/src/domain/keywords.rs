use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Common English function words excluded from keyword extraction. Not
/// exhaustive — tuned for short note-like content, not general-purpose NLP.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had",
    "her", "was", "one", "our", "out", "day", "get", "has", "him", "his",
    "how", "man", "new", "now", "old", "see", "two", "way", "who", "boy",
    "did", "its", "let", "put", "say", "she", "too", "use", "with", "that",
    "this", "from", "have", "been", "they", "will", "would", "there",
    "their", "what", "about", "which", "when", "make", "like", "time",
    "just", "into", "than", "them", "some", "could", "these", "those",
    "were", "where", "being", "does", "doing", "while", "after", "before",
];

/// Deduplicated, order-independent set of keywords extracted from node
/// content. `BTreeSet` keeps iteration deterministic for index fan-out
/// and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSet(BTreeSet<String>);

impl KeywordSet {
    /// Lowercase, strip non-alphanumeric characters, split on whitespace,
    /// drop stop words and tokens shorter than 3 characters.
    pub fn extract(content: &str) -> Self {
        let lowered = content.to_lowercase();
        let cleaned: String = lowered
            .chars()
            .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
            .collect();

        let set = cleaned
            .split_whitespace()
            .filter(|tok| tok.chars().count() >= 3)
            .filter(|tok| !STOP_WORDS.contains(tok))
            .map(|tok| tok.to_string())
            .collect();

        KeywordSet(set)
    }

    pub fn from_raw(words: impl IntoIterator<Item = String>) -> Self {
        KeywordSet(words.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn intersection_count(&self, other: &KeywordSet) -> usize {
        self.0.intersection(&other.0).count()
    }

    /// `|self ∩ other| / |self|`. Zero when `self` is empty, per the
    /// connection engine's "no keywords, no candidates" rule.
    pub fn overlap_ratio(&self, other: &KeywordSet) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        self.intersection_count(other) as f64 / self.0.len() as f64
    }
}

impl IntoIterator for KeywordSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn extract_is_idempotent(content in ".{0,200}") {
            let once = KeywordSet::extract(&content);
            let words: Vec<String> = once.iter().cloned().collect();
            let twice = KeywordSet::from_raw(words.clone());
            prop_assert_eq!(words, twice.iter().cloned().collect::<Vec<_>>());
        }

        #[test]
        fn overlap_ratio_is_bounded(
            a in prop::collection::vec("[a-z]{3,8}", 0..10),
            b in prop::collection::vec("[a-z]{3,8}", 0..10),
        ) {
            let set_a = KeywordSet::from_raw(a);
            let set_b = KeywordSet::from_raw(b);
            let ratio = set_a.overlap_ratio(&set_b);
            prop_assert!((0.0..=1.0).contains(&ratio));
        }

        #[test]
        fn self_overlap_is_always_one_unless_empty(words in prop::collection::vec("[a-z]{3,8}", 1..10)) {
            let set = KeywordSet::from_raw(words);
            prop_assert!((set.overlap_ratio(&set) - 1.0).abs() < 1e-9);
        }

        #[test]
        fn extract_never_keeps_tokens_under_three_chars(content in "[a-zA-Z ]{0,200}") {
            let kw = KeywordSet::extract(&content);
            prop_assert!(kw.iter().all(|w| w.chars().count() >= 3));
        }
    }
}
