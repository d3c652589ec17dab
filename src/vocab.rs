//! Word frequency vocabularies supplied alongside each dataset split.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// Ordered list of `(word, count)` entries.
///
/// Merging concatenates entries, so a word seen in several splits appears once per split
/// with its split-local count. Counts are never summed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Vocabulary {
    entries: Vec<(String, u64)>,
}

impl Vocabulary {
    /// Creates an empty vocabulary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenates the entries of every vocabulary in order.
    #[must_use]
    pub fn merge<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a Vocabulary>,
    {
        let mut entries = Vec::new();
        for part in parts {
            entries.extend(part.entries.iter().cloned());
        }
        Self { entries }
    }

    /// Appends a single entry.
    pub fn push(&mut self, word: impl Into<String>, count: u64) {
        self.entries.push((word.into(), count));
    }

    /// Iterates entries in insertion order, duplicates included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(word, count)| (word.as_str(), *count))
    }

    /// Number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set of distinct words, used for membership checks while scanning embedding sources.
    #[must_use]
    pub fn word_set(&self) -> AHashSet<&str> {
        self.entries.iter().map(|(word, _)| word.as_str()).collect()
    }

    /// Number of distinct words.
    #[must_use]
    pub fn distinct_words(&self) -> usize {
        self.word_set().len()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for Vocabulary {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(word, count)| (word.into(), count))
                .collect(),
        }
    }
}
