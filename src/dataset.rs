//! Dataset splits and their conversion from raw text to index sequences.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};
use crate::matrix::{WordId, WordIndex};
use crate::padding::{extend_cyclic, pad_count};
use crate::tokenize::Tokenize;
use crate::vocab::Vocabulary;

/// Integer label attached to each context/response pair.
pub type Label = i64;

/// Split with aligned context, response, and label columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split<T> {
    /// Context column (`c`).
    #[serde(rename = "c")]
    pub contexts: Vec<T>,
    /// Response column (`r`).
    #[serde(rename = "r")]
    pub responses: Vec<T>,
    /// Label column (`y`).
    #[serde(rename = "y")]
    pub labels: Vec<Label>,
}

/// Split whose context and response entries are still raw text.
pub type RawSplit = Split<String>;

/// Split whose context and response entries are index sequences.
pub type IndexedSplit = Split<Vec<WordId>>;

impl<T: Clone> Split<T> {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` when the split has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Checks that all three columns have the same length.
    pub fn validate(&self) -> Result<()> {
        let rows = self.labels.len();
        if self.contexts.len() != rows || self.responses.len() != rows {
            return Err(PrepError::InvalidDataset(format!(
                "column lengths differ: c={} r={} y={rows}",
                self.contexts.len(),
                self.responses.len()
            )));
        }
        Ok(())
    }

    /// Pads every column to a multiple of `batch_size`.
    ///
    /// The pad count is derived once from the label column and applied to all columns.
    pub fn pad_to_batch_size(&mut self, batch_size: usize) -> Result<()> {
        if batch_size == 0 {
            return Err(PrepError::InvalidConfig(
                "batch_size must be greater than zero".into(),
            ));
        }
        self.validate()?;
        let count = pad_count(self.labels.len(), batch_size);
        extend_cyclic(&mut self.contexts, count);
        extend_cyclic(&mut self.responses, count);
        extend_cyclic(&mut self.labels, count);
        Ok(())
    }
}

/// Contents of one split input file: the split plus its vocabulary counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitFile {
    /// Raw split columns.
    pub data: RawSplit,
    /// Word counts observed in the split.
    pub vocab: Vocabulary,
}

/// Loads and validates a split input file.
pub fn load_split<P: AsRef<Path>>(path: P) -> Result<SplitFile> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PrepError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let raw = fs::read(path).map_err(|err| PrepError::io(err, Some(path.to_path_buf())))?;
    let file: SplitFile = serde_json::from_slice(&raw).map_err(|err| {
        PrepError::InvalidDataset(format!("{} is not a split file: {err}", path.display()))
    })?;
    file.data.validate()?;
    Ok(file)
}

/// Token counts gathered while indexing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    /// Tokens produced by the tokenizer.
    pub tokens: usize,
    /// Tokens that fell back to the unknown index.
    pub unknown: usize,
}

impl Coverage {
    /// Adds the counts of `other`.
    pub fn absorb(&mut self, other: Coverage) {
        self.tokens += other.tokens;
        self.unknown += other.unknown;
    }

    /// Share of tokens that found their own index, `1.0` when nothing was indexed.
    #[must_use]
    pub fn known_ratio(&self) -> f64 {
        if self.tokens == 0 {
            1.0
        } else {
            (self.tokens - self.unknown) as f64 / self.tokens as f64
        }
    }
}

/// Maps text to index sequences through a tokenizer and a [`WordIndex`].
#[derive(Debug)]
pub struct SequenceIndexer<'a, T: ?Sized> {
    tokenizer: &'a T,
    index: &'a WordIndex,
}

impl<'a, T: Tokenize + ?Sized> SequenceIndexer<'a, T> {
    /// Creates an indexer borrowing `tokenizer` and `index`.
    pub fn new(tokenizer: &'a T, index: &'a WordIndex) -> Self {
        Self { tokenizer, index }
    }

    /// One index per token, in order. Tokens without an index map to the unknown index.
    pub fn index_text(&self, text: &str) -> Result<Vec<WordId>> {
        Ok(self.index_text_with_coverage(text)?.0)
    }

    fn index_text_with_coverage(&self, text: &str) -> Result<(Vec<WordId>, Coverage)> {
        let tokens = self.tokenizer.tokenize(text)?;
        let mut coverage = Coverage {
            tokens: tokens.len(),
            unknown: 0,
        };
        let ids = tokens
            .iter()
            .map(|token| {
                self.index.get(token).unwrap_or_else(|| {
                    coverage.unknown += 1;
                    self.index.unknown_index()
                })
            })
            .collect();
        Ok((ids, coverage))
    }

    /// Converts the context and response columns of `split`, keeping labels as they are.
    pub fn index_split(&self, split: RawSplit) -> Result<(IndexedSplit, Coverage)> {
        split.validate()?;
        let mut coverage = Coverage::default();
        let mut convert = |column: Vec<String>| -> Result<Vec<Vec<WordId>>> {
            column
                .iter()
                .map(|text| {
                    let (ids, counts) = self.index_text_with_coverage(text)?;
                    coverage.absorb(counts);
                    Ok(ids)
                })
                .collect()
        };
        let contexts = convert(split.contexts)?;
        let responses = convert(split.responses)?;
        let indexed = IndexedSplit {
            contexts,
            responses,
            labels: split.labels,
        };
        Ok((indexed, coverage))
    }
}
