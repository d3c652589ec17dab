//! Text tokenization used when turning utterances into index sequences.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::pre_tokenizers::whitespace::{Whitespace, WhitespaceSplit};
use tokenizers::pre_tokenizers::PreTokenizerWrapper;
use tokenizers::tokenizer::{OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};
use tokenizers::Tokenizer;

use crate::error::{PrepError, Result};

/// Splits a text into an ordered list of tokens.
pub trait Tokenize {
    /// Returns the tokens of `text` in order. Empty input yields no tokens.
    fn tokenize(&self, text: &str) -> Result<Vec<String>>;
}

impl<F> Tokenize for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        Ok(self(text))
    }
}

/// Built-in pre-tokenizers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TokenizerKind {
    /// Word characters and punctuation runs become separate tokens.
    #[default]
    Whitespace,
    /// Splits on whitespace only.
    WhitespaceSplit,
    /// BERT rules: whitespace plus every punctuation character on its own.
    Bert,
}

/// [`Tokenize`] implementation backed by a Hugging Face pre-tokenizer.
#[derive(Debug, Clone)]
pub struct TextTokenizer {
    inner: PreTokenizerWrapper,
}

impl TextTokenizer {
    /// Builds a tokenizer for one of the built-in kinds.
    #[must_use]
    pub fn new(kind: TokenizerKind) -> Self {
        let inner = match kind {
            TokenizerKind::Whitespace => PreTokenizerWrapper::Whitespace(Whitespace::default()),
            TokenizerKind::WhitespaceSplit => PreTokenizerWrapper::WhitespaceSplit(WhitespaceSplit),
            TokenizerKind::Bert => PreTokenizerWrapper::BertPreTokenizer(BertPreTokenizer),
        };
        Self { inner }
    }

    /// Reuses the pre-tokenizer stored in a `tokenizer.json` file.
    pub fn from_tokenizer_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PrepError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let tokenizer = Tokenizer::from_file(path)?;
        let inner = tokenizer.get_pre_tokenizer().cloned().ok_or_else(|| {
            PrepError::InvalidConfig(format!("{} defines no pre_tokenizer", path.display()))
        })?;
        Ok(Self { inner })
    }
}

impl Default for TextTokenizer {
    fn default() -> Self {
        Self::new(TokenizerKind::default())
    }
}

impl Tokenize for TextTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let mut pretokenized = PreTokenizedString::from(text);
        self.inner.pre_tokenize(&mut pretokenized)?;
        Ok(pretokenized
            .get_splits(OffsetReferential::Original, OffsetType::Byte)
            .into_iter()
            .map(|(token, _, _)| token.to_owned())
            .collect())
    }
}
