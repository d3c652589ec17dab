//! Reading and writing the four pipeline artifacts.
//!
//! Artifacts are JSON documents:
//!
//! * `dataset{suffix}.json` – `[train, validation, test]` indexed splits.
//! * `pretrained_embeddings{suffix}.json` – `[matrix, word_index]`.
//! * `random_embeddings{suffix}.json` – `[matrix, word_index]` with the same word index.
//! * `vocab{suffix}.json` – the merged vocabulary as `[[word, count], ...]`.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::de::DeserializeOwned;

use crate::config::PathsConfig;
use crate::dataset::IndexedSplit;
use crate::error::{PrepError, Result};
use crate::matrix::{EmbeddingMatrix, WordIndex};
use crate::pipeline::{DatasetSplits, PipelineArtifacts};
use crate::vocab::Vocabulary;

/// File stem of the indexed dataset artifact.
pub const DATASET_STEM: &str = "dataset";
/// File stem of the pretrained embedding artifact.
pub const PRETRAINED_STEM: &str = "pretrained_embeddings";
/// File stem of the random baseline embedding artifact.
pub const RANDOM_STEM: &str = "random_embeddings";
/// File stem of the merged vocabulary artifact.
pub const VOCAB_STEM: &str = "vocab";

/// Output locations of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Indexed splits.
    pub dataset: PathBuf,
    /// Pretrained matrix and word index.
    pub pretrained: PathBuf,
    /// Random matrix and word index.
    pub random: PathBuf,
    /// Merged vocabulary.
    pub vocabulary: PathBuf,
}

impl ArtifactPaths {
    /// Derives artifact locations from the output directory and suffix.
    #[must_use]
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            dataset: paths.output(DATASET_STEM),
            pretrained: paths.output(PRETRAINED_STEM),
            random: paths.output(RANDOM_STEM),
            vocabulary: paths.output(VOCAB_STEM),
        }
    }
}

/// Serialises all artifacts, then writes them under `paths.output_dir`.
///
/// Nothing touches the filesystem until every payload has been encoded.
pub fn write_artifacts(
    artifacts: &PipelineArtifacts,
    paths: &PathsConfig,
) -> Result<ArtifactPaths> {
    let targets = ArtifactPaths::new(paths);
    let splits = &artifacts.dataset;
    let payloads = [
        (
            &targets.dataset,
            serde_json::to_vec(&(&splits.train, &splits.validation, &splits.test))?,
        ),
        (
            &targets.pretrained,
            serde_json::to_vec(&(&artifacts.pretrained, &artifacts.word_index))?,
        ),
        (
            &targets.random,
            serde_json::to_vec(&(&artifacts.random, &artifacts.word_index))?,
        ),
        (&targets.vocabulary, serde_json::to_vec(&artifacts.vocabulary)?),
    ];

    fs::create_dir_all(&paths.output_dir)
        .map_err(|err| PrepError::io(err, Some(paths.output_dir.clone())))?;
    for (path, bytes) in &payloads {
        fs::write(path, bytes).map_err(|err| PrepError::io(err, Some(path.to_path_buf())))?;
        info!("wrote {} ({} bytes)", path.display(), bytes.len());
    }
    Ok(targets)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(PrepError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let raw = fs::read(path).map_err(|err| PrepError::io(err, Some(path.to_path_buf())))?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Loads the `[train, validation, test]` dataset artifact.
pub fn read_dataset_artifact<P: AsRef<Path>>(path: P) -> Result<DatasetSplits> {
    let (train, validation, test): (IndexedSplit, IndexedSplit, IndexedSplit) =
        read_json(path.as_ref())?;
    Ok(DatasetSplits {
        train,
        validation,
        test,
    })
}

/// Loads a `[matrix, word_index]` embedding artifact and checks that both agree in size.
pub fn read_embedding_artifact<P: AsRef<Path>>(path: P) -> Result<(EmbeddingMatrix, WordIndex)> {
    let (matrix, index): (EmbeddingMatrix, WordIndex) = read_json(path.as_ref())?;
    let (rows, _) = matrix.shape();
    if rows != index.rows() {
        return Err(PrepError::Serialization(format!(
            "matrix has {rows} rows but the word index needs {}",
            index.rows()
        )));
    }
    Ok((matrix, index))
}

/// Loads the merged vocabulary artifact.
pub fn read_vocabulary_artifact<P: AsRef<Path>>(path: P) -> Result<Vocabulary> {
    read_json(path.as_ref())
}
