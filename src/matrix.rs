//! Word-to-index assignment and the dense embedding matrices built on top of it.
//!
//! Index assignment is a separate pass from filling matrix rows. A [`WordIndex`] is built
//! once and then shared, unchanged, by the pretrained matrix and the randomly initialised
//! baseline, so an index sequence is valid against either matrix.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView1};
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::embeddings::EmbeddingSet;
use crate::error::{PrepError, Result};
use crate::synth::{uniform_vector, UNKNOWN_TOKEN};
use crate::vocab::Vocabulary;

/// Row index into an embedding matrix. `0` is the padding row.
pub type WordId = u32;

/// Index of the all-zero padding row.
pub const PADDING_INDEX: WordId = 0;

/// Bijection from word to a 1-based row index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "HashMap<String, WordId>")]
pub struct WordIndex {
    words: Vec<String>,
    lookup: FxHashMap<String, WordId>,
    unknown: WordId,
}

impl WordIndex {
    /// Assigns indices to every vocabulary word that has a vector in `vectors`.
    ///
    /// Words are numbered from 1 in order of first appearance in `vocab`. The unknown token
    /// is numbered last unless the vocabulary already listed it. It must have a vector.
    pub fn build(
        vocab: &Vocabulary,
        vectors: &EmbeddingSet,
        unknown_token: &str,
    ) -> Result<Self> {
        if !vectors.contains(unknown_token) {
            return Err(PrepError::MissingVector(unknown_token.to_owned()));
        }
        let mut index = Self {
            words: Vec::new(),
            lookup: FxHashMap::default(),
            unknown: PADDING_INDEX,
        };
        for (word, _) in vocab.iter() {
            if vectors.contains(word) {
                index.assign(word)?;
            }
        }
        index.unknown = index.assign(unknown_token)?;
        Ok(index)
    }

    fn assign(&mut self, word: &str) -> Result<WordId> {
        if let Some(&id) = self.lookup.get(word) {
            return Ok(id);
        }
        let id = WordId::try_from(self.words.len() + 1)
            .map_err(|_| PrepError::Internal("word index exceeded u32::MAX".into()))?;
        self.words.push(word.to_owned());
        self.lookup.insert(word.to_owned(), id);
        Ok(id)
    }

    /// Index of `word`, if it has one.
    #[must_use]
    pub fn get(&self, word: &str) -> Option<WordId> {
        self.lookup.get(word).copied()
    }

    /// Index of `word`, falling back to the unknown token's index.
    #[must_use]
    pub fn get_or_unknown(&self, word: &str) -> WordId {
        self.get(word).unwrap_or(self.unknown)
    }

    /// Index assigned to the unknown token. Never [`PADDING_INDEX`].
    #[must_use]
    pub fn unknown_index(&self) -> WordId {
        self.unknown
    }

    /// Word stored at `id`, if any.
    #[must_use]
    pub fn word(&self, id: WordId) -> Option<&str> {
        let slot = (id as usize).checked_sub(1)?;
        self.words.get(slot).map(String::as_str)
    }

    /// Number of indexed words (padding row excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` when no word is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Matrix rows needed for this index, padding row included.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.words.len() + 1
    }

    /// Iterates `(word, index)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, WordId)> + '_ {
        self.words
            .iter()
            .zip(1..)
            .map(|(word, id)| (word.as_str(), id))
    }
}

impl Serialize for WordIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.words.len()))?;
        for (word, id) in self.iter() {
            map.serialize_entry(word, &id)?;
        }
        map.end()
    }
}

impl TryFrom<HashMap<String, WordId>> for WordIndex {
    type Error = PrepError;

    fn try_from(map: HashMap<String, WordId>) -> Result<Self> {
        let mut slots: Vec<Option<String>> = vec![None; map.len()];
        for (word, id) in map {
            let slot = (id as usize)
                .checked_sub(1)
                .filter(|&slot| slot < slots.len())
                .ok_or_else(|| {
                    PrepError::Serialization(format!("index {id} for {word:?} is out of range"))
                })?;
            if slots[slot].replace(word).is_some() {
                return Err(PrepError::Serialization(format!(
                    "index {id} assigned more than once"
                )));
            }
        }
        let words: Vec<String> = slots.into_iter().flatten().collect();
        let lookup: FxHashMap<String, WordId> = words.iter().cloned().zip(1..).collect();
        let unknown = lookup.get(UNKNOWN_TOKEN).copied().ok_or_else(|| {
            PrepError::Serialization(format!("mapping lacks the {UNKNOWN_TOKEN} entry"))
        })?;
        Ok(Self {
            words,
            lookup,
            unknown,
        })
    }
}

/// Dense `(rows, dim)` matrix whose row `i` is the vector of the word with index `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingMatrix {
    data: Array2<f32>,
}

impl EmbeddingMatrix {
    /// Fills a matrix from `vectors` following `index`; row 0 stays zero.
    ///
    /// Fails with [`PrepError::MissingVector`] if an indexed word has no vector.
    pub fn from_vectors(index: &WordIndex, vectors: &EmbeddingSet) -> Result<Self> {
        let mut data = Array2::zeros((index.rows(), vectors.dim()));
        for (word, id) in index.iter() {
            let vector = vectors
                .get(word)
                .ok_or_else(|| PrepError::MissingVector(word.to_owned()))?;
            data.row_mut(id as usize)
                .iter_mut()
                .zip(vector)
                .for_each(|(cell, &value)| *cell = value);
        }
        Ok(Self { data })
    }

    /// Draws a fresh uniform vector for every indexed word, ignoring any pretrained values.
    pub fn random<R: Rng + ?Sized>(index: &WordIndex, dim: usize, rng: &mut R) -> Self {
        let mut data = Array2::zeros((index.rows(), dim));
        for (_, id) in index.iter() {
            let vector = uniform_vector(dim, rng);
            data.row_mut(id as usize)
                .iter_mut()
                .zip(vector)
                .for_each(|(cell, value)| *cell = value);
        }
        Self { data }
    }

    /// `(rows, dim)` of the matrix.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Row for index `id`.
    #[must_use]
    pub fn row(&self, id: WordId) -> Option<ArrayView1<'_, f32>> {
        let id = id as usize;
        (id < self.data.nrows()).then(|| self.data.row(id))
    }

    /// Underlying array.
    #[must_use]
    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }
}
