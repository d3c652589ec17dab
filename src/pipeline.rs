//! End-to-end orchestration: load splits, build the shared index and matrices, index text.

use std::time::Instant;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::artifacts::{write_artifacts, ArtifactPaths};
use crate::config::{PathsConfig, PipelineConfig};
use crate::dataset::{
    load_split, Coverage, IndexedSplit, RawSplit, SequenceIndexer, SplitFile,
};
use crate::embeddings::{resolve_embeddings, EmbeddingSet};
use crate::error::{PrepError, Result};
use crate::matrix::{EmbeddingMatrix, WordIndex};
use crate::metrics::{PipelineMetrics, Stage, StageTiming};
use crate::synth::{add_unknown_words, UNKNOWN_TOKEN};
use crate::tokenize::{TextTokenizer, Tokenize};
use crate::vocab::Vocabulary;

/// The three split inputs of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineInputs {
    /// Train split and vocabulary.
    pub train: SplitFile,
    /// Validation split and vocabulary.
    pub validation: SplitFile,
    /// Test split and vocabulary.
    pub test: SplitFile,
}

impl PipelineInputs {
    /// Loads the three split files named by `paths`.
    ///
    /// Every path is checked before any file is parsed so a missing input is reported first.
    pub fn load(paths: &PathsConfig) -> Result<Self> {
        let locations = [
            paths.train_input(),
            paths.validation_input(),
            paths.test_input(),
        ];
        if let Some(missing) = locations.iter().find(|path| !path.exists()) {
            return Err(PrepError::MissingInput {
                path: missing.clone(),
            });
        }
        let [train, validation, test] = locations;
        Ok(Self {
            train: load_split(train)?,
            validation: load_split(validation)?,
            test: load_split(test)?,
        })
    }
}

/// Indexed train, validation, and test splits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSplits {
    /// Padded train split.
    pub train: IndexedSplit,
    /// Padded validation split.
    pub validation: IndexedSplit,
    /// Unpadded test split.
    pub test: IndexedSplit,
}

/// Everything a run produces.
#[must_use]
#[derive(Debug, Clone)]
pub struct PipelineArtifacts {
    /// Indexed splits.
    pub dataset: DatasetSplits,
    /// Matrix of pretrained and synthesized vectors.
    pub pretrained: EmbeddingMatrix,
    /// Matrix of synthesized vectors only, aligned to the same index.
    pub random: EmbeddingMatrix,
    /// Word index shared by both matrices.
    pub word_index: WordIndex,
    /// Merged vocabulary.
    pub vocabulary: Vocabulary,
    /// Counters and timings for the run.
    pub metrics: PipelineMetrics,
}

impl PipelineArtifacts {
    /// Writes the four artifacts; see [`write_artifacts`].
    pub fn write(&self, paths: &PathsConfig) -> Result<ArtifactPaths> {
        write_artifacts(self, paths)
    }
}

/// Runs the embedding and indexing stages with a fixed configuration and tokenizer.
#[derive(Debug, Clone)]
pub struct Pipeline<T = TextTokenizer> {
    cfg: PipelineConfig,
    tokenizer: T,
}

impl Pipeline<TextTokenizer> {
    /// Creates a pipeline using the built-in tokenizer selected by `cfg.tokenizer`.
    #[must_use]
    pub fn new(cfg: PipelineConfig) -> Self {
        let tokenizer = TextTokenizer::new(cfg.tokenizer);
        Self { cfg, tokenizer }
    }
}

impl<T: Tokenize> Pipeline<T> {
    /// Creates a pipeline with a caller supplied tokenizer.
    #[must_use]
    pub fn with_tokenizer(cfg: PipelineConfig, tokenizer: T) -> Self {
        Self { cfg, tokenizer }
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Loads inputs and the embedding source named by `paths` and runs every stage.
    ///
    /// Nothing is written; call [`PipelineArtifacts::write`] on the result.
    pub fn run(&self, paths: &PathsConfig) -> Result<PipelineArtifacts> {
        self.cfg.validate()?;
        let start = Instant::now();
        let inputs = PipelineInputs::load(paths)?;
        let load_elapsed = start.elapsed();
        info!("data loaded from {}", paths.input_dir.display());

        let format = paths.resolved_format();
        let mut artifacts = self.run_with_resolver(inputs, |vocab| {
            resolve_embeddings(
                &paths.embeddings,
                format,
                vocab,
                self.cfg.embedding_dim,
                self.cfg.show_progress,
            )
        })?;
        artifacts
            .metrics
            .stages
            .insert(0, StageTiming::new(Stage::Load, load_elapsed));
        artifacts.metrics.total_duration = start.elapsed();
        Ok(artifacts)
    }

    /// Runs every stage on in-memory inputs.
    ///
    /// `resolve` receives the merged vocabulary and returns the pretrained vectors found
    /// for it, typically through [`resolve_embeddings`].
    pub fn run_with_resolver<F>(
        &self,
        inputs: PipelineInputs,
        resolve: F,
    ) -> Result<PipelineArtifacts>
    where
        F: FnOnce(&Vocabulary) -> Result<EmbeddingSet>,
    {
        self.cfg.validate()?;
        let run_start = Instant::now();
        let mut metrics = PipelineMetrics::default();
        let PipelineInputs {
            train,
            validation,
            test,
        } = inputs;

        let vocabulary = Vocabulary::merge([&train.vocab, &validation.vocab, &test.vocab]);
        metrics.train.rows = train.data.len();
        metrics.validation.rows = validation.data.len();
        metrics.test.rows = test.data.len();
        metrics.vocab_entries = vocabulary.len();
        metrics.vocab_words = vocabulary.distinct_words();
        info!(
            "num train: {} | num val: {} | num test: {} | vocab size: {}",
            metrics.train.rows,
            metrics.validation.rows,
            metrics.test.rows,
            metrics.vocab_entries
        );

        let stage = Instant::now();
        let mut vectors = resolve(&vocabulary)?;
        if vectors.dim() != self.cfg.embedding_dim {
            return Err(PrepError::InvalidConfig(format!(
                "resolved vectors have dimension {}, expected {}",
                vectors.dim(),
                self.cfg.embedding_dim
            )));
        }
        metrics.resolved = vectors.len();
        metrics.record(Stage::Resolve, stage.elapsed());

        let stage = Instant::now();
        let mut rng = StdRng::seed_from_u64(self.cfg.seed);
        metrics.synthesized = add_unknown_words(
            &mut vectors,
            &vocabulary,
            self.cfg.unknown_min_frequency,
            UNKNOWN_TOKEN,
            &mut rng,
        )?;
        metrics.record(Stage::Synthesize, stage.elapsed());

        let stage = Instant::now();
        let word_index = WordIndex::build(&vocabulary, &vectors, UNKNOWN_TOKEN)?;
        let pretrained = EmbeddingMatrix::from_vectors(&word_index, &vectors)?;
        drop(vectors);
        metrics.matrix_shape = pretrained.shape();
        info!("pretrained matrix: {:?}", metrics.matrix_shape);
        metrics.record(Stage::BuildMatrix, stage.elapsed());

        let stage = Instant::now();
        let mut train = train.data;
        let mut validation = validation.data;
        let test = test.data;
        train.pad_to_batch_size(self.cfg.batch_size)?;
        validation.pad_to_batch_size(self.cfg.batch_size)?;
        metrics.train.padded_rows = train.len();
        metrics.validation.padded_rows = validation.len();
        metrics.test.padded_rows = test.len();
        metrics.record(Stage::Pad, stage.elapsed());

        let stage = Instant::now();
        let indexer = SequenceIndexer::new(&self.tokenizer, &word_index);
        let mut coverage = Coverage::default();
        let mut index_split = |split: RawSplit| -> Result<IndexedSplit> {
            let (indexed, counts) = indexer.index_split(split)?;
            coverage.absorb(counts);
            Ok(indexed)
        };
        let dataset = DatasetSplits {
            train: index_split(train)?,
            validation: index_split(validation)?,
            test: index_split(test)?,
        };
        metrics.coverage = coverage;
        for (name, split) in [
            ("train", &dataset.train),
            ("val", &dataset.validation),
            ("test", &dataset.test),
        ] {
            info!(
                "{name}: c={} r={} y={}",
                split.contexts.len(),
                split.responses.len(),
                split.labels.len()
            );
        }
        info!(
            "indexed {} tokens, {:.2}% with their own index",
            coverage.tokens,
            coverage.known_ratio() * 100.0
        );
        metrics.record(Stage::Index, stage.elapsed());

        let stage = Instant::now();
        let random = EmbeddingMatrix::random(&word_index, self.cfg.embedding_dim, &mut rng);
        info!("random matrix: {:?}", random.shape());
        metrics.record(Stage::RandomMatrix, stage.elapsed());

        metrics.total_duration = run_start.elapsed();
        Ok(PipelineArtifacts {
            dataset,
            pretrained,
            random,
            word_index,
            vocabulary,
            metrics,
        })
    }
}
