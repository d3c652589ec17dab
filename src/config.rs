//! Configuration builders controlling the indexing pipeline and its file layout.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};
use crate::tokenize::TokenizerKind;

/// Default number of rows per downstream training batch.
pub const DEFAULT_BATCH_SIZE: usize = 256;
/// Default dimension of pretrained word vectors.
pub const DEFAULT_EMBEDDING_DIM: usize = 300;
/// Default minimum count a word needs before it receives a synthesized vector.
pub const DEFAULT_UNKNOWN_MIN_FREQUENCY: u64 = 2;
/// Default seed for vector synthesis.
pub const DEFAULT_SEED: u64 = 42;

/// Numeric and behavioural settings for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Train and validation splits are padded to a multiple of this size.
    pub batch_size: usize,
    /// Dimension of every vector in both embedding matrices.
    pub embedding_dim: usize,
    /// Words absent from the embedding source need at least this count to get an index.
    pub unknown_min_frequency: u64,
    /// Seed for the single random generator used by vector synthesis.
    pub seed: u64,
    /// Enables the embedding-source progress bar.
    pub show_progress: bool,
    /// Pre-tokenizer used to split context and response texts.
    pub tokenizer: TokenizerKind,
}

impl PipelineConfig {
    /// Returns a builder initialised with [`PipelineConfig::default`].
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Validates the invariants required by the pipeline stages.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PrepError::InvalidConfig(
                "batch_size must be greater than zero".into(),
            ));
        }
        if self.embedding_dim == 0 {
            return Err(PrepError::InvalidConfig(
                "embedding_dim must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            unknown_min_frequency: DEFAULT_UNKNOWN_MIN_FREQUENCY,
            seed: DEFAULT_SEED,
            show_progress: true,
            tokenizer: TokenizerKind::Whitespace,
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Default, Clone)]
pub struct PipelineBuilder {
    cfg: PipelineConfig,
}

impl PipelineBuilder {
    /// Creates a builder with [`PipelineConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch size used to pad train and validation splits.
    #[must_use]
    pub fn batch_size(mut self, value: usize) -> Self {
        self.cfg.batch_size = value;
        self
    }

    /// Sets the embedding dimension.
    #[must_use]
    pub fn embedding_dim(mut self, value: usize) -> Self {
        self.cfg.embedding_dim = value;
        self
    }

    /// Sets the minimum count for synthesizing vectors of words without embeddings.
    #[must_use]
    pub fn unknown_min_frequency(mut self, value: u64) -> Self {
        self.cfg.unknown_min_frequency = value;
        self
    }

    /// Sets the synthesis seed.
    #[must_use]
    pub fn seed(mut self, value: u64) -> Self {
        self.cfg.seed = value;
        self
    }

    /// Enables or disables progress reporting.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Selects the pre-tokenizer.
    #[must_use]
    pub fn tokenizer(mut self, kind: TokenizerKind) -> Self {
        self.cfg.tokenizer = kind;
        self
    }

    /// Finalises the builder, returning a validated [`PipelineConfig`].
    pub fn build(self) -> Result<PipelineConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// On-disk layout of the embedding source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EmbeddingFormat {
    /// Pick [`EmbeddingFormat::Binary`] for `.bin` files, [`EmbeddingFormat::Text`] otherwise.
    #[default]
    Auto,
    /// word2vec binary layout: header line then `word<space><dim f32 LE>` records.
    Binary,
    /// GloVe text layout: one `word f1 f2 ...` line per record.
    Text,
}

impl EmbeddingFormat {
    /// Resolves [`EmbeddingFormat::Auto`] against the source path.
    #[must_use]
    pub fn resolve(self, path: &Path) -> Self {
        match self {
            Self::Auto => {
                let is_bin = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("bin"));
                if is_bin {
                    Self::Binary
                } else {
                    Self::Text
                }
            }
            other => other,
        }
    }
}

/// Input and output locations for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Directory holding the three split files.
    pub input_dir: PathBuf,
    /// Directory receiving the four artifacts.
    pub output_dir: PathBuf,
    /// Appended to the train input name and to every output name.
    pub suffix: String,
    /// Pretrained embedding source.
    pub embeddings: PathBuf,
    /// Layout of [`PathsConfig::embeddings`].
    pub embedding_format: EmbeddingFormat,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("../data"),
            output_dir: PathBuf::from("."),
            suffix: String::new(),
            embeddings: PathBuf::from("../embeddings/glove/glove.840B.300d.txt"),
            embedding_format: EmbeddingFormat::Auto,
        }
    }
}

impl PathsConfig {
    /// Train split input; the only input carrying the suffix.
    #[must_use]
    pub fn train_input(&self) -> PathBuf {
        self.input_dir.join(format!("trainset{}.json", self.suffix))
    }

    /// Validation split input.
    #[must_use]
    pub fn validation_input(&self) -> PathBuf {
        self.input_dir.join("valset.json")
    }

    /// Test split input.
    #[must_use]
    pub fn test_input(&self) -> PathBuf {
        self.input_dir.join("testset.json")
    }

    /// Output path for an artifact stem such as `dataset`.
    #[must_use]
    pub fn output(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{stem}{}.json", self.suffix))
    }

    /// Embedding source format with [`EmbeddingFormat::Auto`] resolved.
    #[must_use]
    pub fn resolved_format(&self) -> EmbeddingFormat {
        self.embedding_format.resolve(&self.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = PipelineConfig::builder()
            .batch_size(32)
            .embedding_dim(50)
            .unknown_min_frequency(3)
            .seed(7)
            .show_progress(false)
            .build()
            .expect("config should be valid");
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.embedding_dim, 50);
        assert_eq!(cfg.unknown_min_frequency, 3);
        assert_eq!(cfg.seed, 7);
        assert!(!cfg.show_progress);
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let err = PipelineConfig::builder()
            .batch_size(0)
            .build()
            .expect_err("validation should fail");
        assert!(matches!(
            err,
            PrepError::InvalidConfig(message) if message.contains("batch_size")
        ));
    }

    #[test]
    fn suffix_applies_to_train_input_and_outputs_only() {
        let paths = PathsConfig {
            input_dir: PathBuf::from("in"),
            output_dir: PathBuf::from("out"),
            suffix: "_small".into(),
            ..PathsConfig::default()
        };
        assert_eq!(paths.train_input(), PathBuf::from("in/trainset_small.json"));
        assert_eq!(paths.validation_input(), PathBuf::from("in/valset.json"));
        assert_eq!(paths.test_input(), PathBuf::from("in/testset.json"));
        assert_eq!(paths.output("vocab"), PathBuf::from("out/vocab_small.json"));
    }

    #[test]
    fn auto_format_follows_extension() {
        assert_eq!(
            EmbeddingFormat::Auto.resolve(Path::new("vectors.BIN")),
            EmbeddingFormat::Binary
        );
        assert_eq!(
            EmbeddingFormat::Auto.resolve(Path::new("glove.300d.txt")),
            EmbeddingFormat::Text
        );
        assert_eq!(
            EmbeddingFormat::Text.resolve(Path::new("vectors.bin")),
            EmbeddingFormat::Text
        );
    }
}
