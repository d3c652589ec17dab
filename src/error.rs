//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T, E = PrepError> = std::result::Result<T, E>;

/// Domain-specific error describing failures while loading inputs, resolving embeddings,
/// indexing datasets, or writing artifacts.
#[derive(Debug, Error)]
pub enum PrepError {
    /// Pipeline configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A required input artifact does not exist.
    #[error("missing input artifact {path:?}")]
    MissingInput {
        /// Path that was expected to exist.
        path: PathBuf,
    },
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// An embedding source record could not be parsed.
    #[error("malformed embedding record {record} in {path:?}: {reason}")]
    MalformedEmbedding {
        /// Embedding source being read, when known.
        path: Option<PathBuf>,
        /// 1-based record number (line number for text sources).
        record: usize,
        /// Human readable description of the defect.
        reason: String,
    },
    /// A dataset split violated its shape invariants.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
    /// A word was assigned an index without a backing vector.
    #[error("no vector available for indexed word {0:?}")]
    MissingVector(String),
    /// Error bubbled up from the `tokenizers` crate.
    #[error("huggingface tokenizers error: {0}")]
    Tokenizers(String),
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Catch-all variant for invariants that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<tokenizers::Error> for PrepError {
    fn from(err: tokenizers::Error) -> Self {
        Self::Tokenizers(err.to_string())
    }
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl PrepError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }

    pub(crate) fn malformed(
        path: Option<PathBuf>,
        record: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedEmbedding {
            path,
            record,
            reason: reason.into(),
        }
    }
}
