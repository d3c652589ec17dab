//! Counters and timings describing a pipeline run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dataset::Coverage;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Stage {
    /// Reading the three split files.
    Load,
    /// Scanning the embedding source.
    Resolve,
    /// Drawing vectors for words without embeddings.
    Synthesize,
    /// Assigning indices and filling the pretrained matrix.
    BuildMatrix,
    /// Padding train and validation splits.
    Pad,
    /// Tokenizing and indexing every split.
    Index,
    /// Drawing the random baseline matrix.
    RandomMatrix,
}

/// Wall time spent in one stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageTiming {
    /// Stage measured.
    pub stage: Stage,
    /// Time spent in the stage.
    pub elapsed: Duration,
    /// Resident set size sampled when the stage finished.
    pub rss_kb: Option<usize>,
}

/// Row counts of one split before and after padding.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SplitCounts {
    /// Rows read from the input file.
    pub rows: usize,
    /// Rows after batch padding (equal to `rows` for the test split).
    pub padded_rows: usize,
}

/// Aggregate metrics produced by a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineMetrics {
    /// Train split counts.
    pub train: SplitCounts,
    /// Validation split counts.
    pub validation: SplitCounts,
    /// Test split counts.
    pub test: SplitCounts,
    /// Entries in the merged vocabulary, duplicates included.
    pub vocab_entries: usize,
    /// Distinct words in the merged vocabulary.
    pub vocab_words: usize,
    /// Vocabulary words found in the embedding source.
    pub resolved: usize,
    /// Vectors drawn for words without embeddings, unknown token included.
    pub synthesized: usize,
    /// `(rows, dim)` shared by both matrices.
    pub matrix_shape: (usize, usize),
    /// Token coverage across all splits.
    pub coverage: Coverage,
    /// Per-stage timings in execution order.
    pub stages: Vec<StageTiming>,
    /// Total duration of the run.
    pub total_duration: Duration,
}

impl StageTiming {
    /// Timing for a stage that just finished, with a fresh RSS sample.
    #[must_use]
    pub fn new(stage: Stage, elapsed: Duration) -> Self {
        Self {
            stage,
            elapsed,
            rss_kb: sample_rss_kb(),
        }
    }
}

impl PipelineMetrics {
    /// Records the timing of a finished stage.
    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        self.stages.push(StageTiming::new(stage, elapsed));
    }
}

#[cfg(target_os = "linux")]
fn current_rss_kb() -> Option<usize> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    let file = File::open("/proc/self/status").ok()?;
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            return rest
                .split_whitespace()
                .find_map(|part| part.parse::<usize>().ok());
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn current_rss_kb() -> Option<usize> {
    None
}

/// Samples the current resident set size (RSS) on supported platforms.
pub fn sample_rss_kb() -> Option<usize> {
    current_rss_kb()
}
