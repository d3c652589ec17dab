//! Pseudo-random vectors for vocabulary words without a pretrained embedding.
//!
//! Components are drawn uniformly from `[-0.25, 0.25]`. The generator is always passed in
//! by the caller, so a run seeded once up front is reproducible.

use log::debug;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::embeddings::EmbeddingSet;
use crate::error::Result;
use crate::vocab::Vocabulary;

/// Sentinel word standing in for every token that has no index of its own.
pub const UNKNOWN_TOKEN: &str = "**unknown**";

/// Bound of the symmetric uniform range used for synthesized components.
pub const UNIFORM_BOUND: f32 = 0.25;

/// Draws a single vector of `dim` components from `[-UNIFORM_BOUND, UNIFORM_BOUND]`.
pub fn uniform_vector<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Vec<f32> {
    let range = Uniform::new_inclusive(-UNIFORM_BOUND, UNIFORM_BOUND);
    range.sample_iter(rng).take(dim).collect()
}

/// Adds vectors for vocabulary words missing from `vectors` whose count reaches
/// `min_frequency`, then (re)draws the vector for `unknown_token` unconditionally.
///
/// Entries are visited in vocabulary order. Each entry is judged on its own count, so a word
/// listed twice with count 1 does not qualify for a threshold of 2. Returns how many
/// vectors were drawn, the unknown token included.
pub fn add_unknown_words<R: Rng + ?Sized>(
    vectors: &mut EmbeddingSet,
    vocab: &Vocabulary,
    min_frequency: u64,
    unknown_token: &str,
    rng: &mut R,
) -> Result<usize> {
    let dim = vectors.dim();
    let mut drawn = 0usize;
    for (word, count) in vocab.iter() {
        if count >= min_frequency && !vectors.contains(word) {
            vectors.insert(word, uniform_vector(dim, rng))?;
            drawn += 1;
        }
    }
    vectors.insert(unknown_token, uniform_vector(dim, rng))?;
    drawn += 1;
    debug!("synthesized {drawn} vectors (min_frequency={min_frequency})");
    Ok(drawn)
}

/// [`add_unknown_words`] with a threshold of 1 and the standard [`UNKNOWN_TOKEN`].
pub fn add_all_unknown_words<R: Rng + ?Sized>(
    vectors: &mut EmbeddingSet,
    vocab: &Vocabulary,
    rng: &mut R,
) -> Result<usize> {
    add_unknown_words(vectors, vocab, 1, UNKNOWN_TOKEN, rng)
}
