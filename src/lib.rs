//! Embedding vocabulary construction and dataset indexing for dialogue corpora.
//!
//! The crate turns context/response text splits into integer index sequences backed by an
//! embedding matrix. Per-split vocabularies are merged, resolved against a pretrained
//! word2vec or GloVe source, completed with synthesized vectors for frequent unknown words,
//! and laid out as a dense matrix whose row 0 is reserved for padding. A second, randomly
//! initialised matrix shares the same word index as a baseline. The CLI is exposed as
//! `embprep`.
//!
//! ```no_run
//! use embprep::{PathsConfig, Pipeline, PipelineConfig};
//!
//! # fn main() -> embprep::Result<()> {
//! let cfg = PipelineConfig::builder()
//!     .batch_size(256)
//!     .unknown_min_frequency(2)
//!     .show_progress(false)
//!     .build()?;
//! let paths = PathsConfig {
//!     embeddings: "glove.840B.300d.txt".into(),
//!     ..PathsConfig::default()
//! };
//! let artifacts = Pipeline::new(cfg).run(&paths)?;
//! artifacts.write(&paths)?;
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature. Library users can disable
//! default features to avoid the CLI dependencies.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod embeddings;
pub mod error;
pub mod matrix;
pub mod metrics;
pub mod padding;
pub mod pipeline;
pub mod synth;
pub mod tokenize;
pub mod vocab;

pub use config::{EmbeddingFormat, PathsConfig, PipelineBuilder, PipelineConfig};
pub use dataset::{IndexedSplit, RawSplit, SequenceIndexer, Split, SplitFile};
pub use embeddings::{resolve_embeddings, EmbeddingSet};
pub use error::{PrepError, Result};
pub use matrix::{EmbeddingMatrix, WordId, WordIndex, PADDING_INDEX};
pub use metrics::PipelineMetrics;
pub use padding::pad_to_batch_size;
pub use pipeline::{DatasetSplits, Pipeline, PipelineArtifacts, PipelineInputs};
pub use synth::{add_unknown_words, UNKNOWN_TOKEN};
pub use tokenize::{TextTokenizer, TokenizerKind, Tokenize};
pub use vocab::Vocabulary;
