//! Resolution of vocabulary words against pretrained embedding sources.
//!
//! Two layouts are understood: the word2vec binary format (a `<count> <dim>` header line
//! followed by `word<space>` plus `dim` little-endian `f32` values per record) and the GloVe
//! text format (one whitespace separated `word f1 ... fdim` line per record). Source words
//! are lowercased before matching. Records whose word is not in the vocabulary are still
//! consumed and validated so the stream position stays correct, then dropped.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use ahash::AHashSet;
use bstr::ByteSlice;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::config::EmbeddingFormat;
use crate::error::{PrepError, Result};
use crate::vocab::Vocabulary;

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Word to vector mapping where every vector has the same dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSet {
    dim: usize,
    vectors: FxHashMap<String, Vec<f32>>,
}

impl EmbeddingSet {
    /// Creates an empty set for vectors of `dim` components.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: FxHashMap::default(),
        }
    }

    /// Vector dimension shared by every entry.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Inserts or replaces a vector, returning the previous one.
    pub fn insert(
        &mut self,
        word: impl Into<String>,
        vector: Vec<f32>,
    ) -> Result<Option<Vec<f32>>> {
        let word = word.into();
        if vector.len() != self.dim {
            return Err(PrepError::Internal(format!(
                "vector for {word:?} has {} components, expected {}",
                vector.len(),
                self.dim
            )));
        }
        Ok(self.vectors.insert(word, vector))
    }

    /// Returns the vector for `word` if present.
    #[must_use]
    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.vectors.get(word).map(Vec::as_slice)
    }

    /// Returns `true` when `word` has a vector.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.vectors.contains_key(word)
    }

    /// Number of words with a vector.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Returns `true` when the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Reads the embedding source at `path` and keeps vectors for words in `vocab`.
pub fn resolve_embeddings(
    path: &Path,
    format: EmbeddingFormat,
    vocab: &Vocabulary,
    dim: usize,
    show_progress: bool,
) -> Result<EmbeddingSet> {
    if !path.exists() {
        return Err(PrepError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|err| PrepError::io(err, Some(path.to_path_buf())))?;
    let total = file
        .metadata()
        .map_err(|err| PrepError::io(err, Some(path.to_path_buf())))?
        .len();
    let progress = source_progress(total, show_progress);
    let reader = BufReader::new(progress.wrap_read(file));

    let words = vocab.word_set();
    let format = format.resolve(path);
    info!(
        "resolving {} vocabulary words against {:?} ({format:?})",
        words.len(),
        path
    );
    let resolved = match format {
        EmbeddingFormat::Binary => read_binary_vectors(reader, &words, dim, Some(path)),
        EmbeddingFormat::Text | EmbeddingFormat::Auto => {
            read_text_vectors(reader, &words, dim, Some(path))
        }
    };
    progress.finish_and_clear();
    let resolved = resolved?;
    info!("num words with embeddings: {}", resolved.len());
    Ok(resolved)
}

fn source_progress(total: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner} loading embeddings [{bar:40}] {bytes}/{total_bytes} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
    pb.set_style(style);
    pb
}

/// Parses a word2vec binary stream.
///
/// Newline bytes inside a word are skipped rather than treated as delimiters; the word
/// ends at the first space. A header dimension other than `dim`, or a truncated record,
/// is reported as [`PrepError::MalformedEmbedding`].
pub fn read_binary_vectors<R: BufRead>(
    mut reader: R,
    vocab: &AHashSet<&str>,
    dim: usize,
    path: Option<&Path>,
) -> Result<EmbeddingSet> {
    let source = path.map(Path::to_path_buf);

    let mut header = Vec::new();
    reader
        .read_until(b'\n', &mut header)
        .map_err(|err| PrepError::io(err, source.clone()))?;
    let (count, header_dim) = parse_header(&header).ok_or_else(|| {
        PrepError::malformed(source.clone(), 0, "expected `<count> <dim>` header")
    })?;
    if header_dim != dim {
        return Err(PrepError::malformed(
            source,
            0,
            format!("header dimension {header_dim} does not match configured {dim}"),
        ));
    }

    let mut set = EmbeddingSet::new(dim);
    let mut word_buf = Vec::new();
    let mut payload = vec![0u8; dim * F32_BYTES];
    let mut duplicates = 0usize;
    for record in 1..=count {
        word_buf.clear();
        reader
            .read_until(b' ', &mut word_buf)
            .map_err(|err| PrepError::io(err, source.clone()))?;
        if word_buf.pop() != Some(b' ') {
            return Err(PrepError::malformed(
                source,
                record,
                "stream ended before the word delimiter",
            ));
        }
        word_buf.retain(|&byte| byte != b'\n');
        let word = word_buf.to_str_lossy().to_lowercase();

        reader.read_exact(&mut payload).map_err(|err| {
            if err.kind() == ErrorKind::UnexpectedEof {
                PrepError::malformed(
                    source.clone(),
                    record,
                    format!("vector payload shorter than {} bytes", dim * F32_BYTES),
                )
            } else {
                PrepError::io(err, source.clone())
            }
        })?;

        if vocab.contains(word.as_str()) {
            let vector = payload
                .chunks_exact(F32_BYTES)
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect();
            if set.insert(word, vector)?.is_some() {
                duplicates += 1;
            }
        }
    }
    log_duplicates(duplicates);
    Ok(set)
}

fn parse_header(line: &[u8]) -> Option<(usize, usize)> {
    let mut fields = line.fields();
    let count = fields.next()?.to_str().ok()?.parse().ok()?;
    let dim = fields.next()?.to_str().ok()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some((count, dim))
}

/// Parses a GloVe style text stream.
///
/// Blank lines are skipped. Every other line must carry exactly `1 + dim` fields; vector
/// fields are only parsed for words in `vocab`.
pub fn read_text_vectors<R: BufRead>(
    reader: R,
    vocab: &AHashSet<&str>,
    dim: usize,
    path: Option<&Path>,
) -> Result<EmbeddingSet> {
    let source: Option<PathBuf> = path.map(Path::to_path_buf);
    let mut set = EmbeddingSet::new(dim);
    let mut duplicates = 0usize;
    for (line_idx, line) in reader.split(b'\n').enumerate() {
        let line = line.map_err(|err| PrepError::io(err, source.clone()))?;
        let record = line_idx + 1;
        let mut fields = line.fields();
        let Some(word) = fields.next() else {
            continue;
        };
        let values: Vec<&[u8]> = fields.collect();
        if values.len() != dim {
            return Err(PrepError::malformed(
                source,
                record,
                format!("expected {dim} vector fields, found {}", values.len()),
            ));
        }
        let word = word.to_str_lossy().to_lowercase();
        if !vocab.contains(word.as_str()) {
            continue;
        }
        let vector = values
            .iter()
            .map(|field| {
                field
                    .to_str()
                    .ok()
                    .and_then(|text| text.parse::<f32>().ok())
                    .ok_or_else(|| {
                        PrepError::malformed(
                            source.clone(),
                            record,
                            format!("invalid float field {:?}", field.to_str_lossy()),
                        )
                    })
            })
            .collect::<Result<Vec<f32>>>()?;
        if set.insert(word, vector)?.is_some() {
            duplicates += 1;
        }
    }
    log_duplicates(duplicates);
    Ok(set)
}

fn log_duplicates(duplicates: usize) {
    if duplicates > 0 {
        debug!("{duplicates} source words collided after lowercasing; later records kept");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn binary_source(dim: usize, records: &[(&str, Vec<f32>)]) -> Vec<u8> {
        let mut bytes = format!("{} {dim}\n", records.len()).into_bytes();
        for (word, vector) in records {
            bytes.extend_from_slice(word.as_bytes());
            bytes.push(b' ');
            for value in vector {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
            bytes.push(b'\n');
        }
        bytes
    }

    fn vocab_of(words: &[&'static str]) -> AHashSet<&'static str> {
        words.iter().copied().collect()
    }

    #[test]
    fn binary_reader_keeps_vocabulary_words_only() {
        let data = binary_source(
            2,
            &[
                ("Cat", vec![1.0, 2.0]),
                ("tree", vec![3.0, 4.0]),
                ("dog", vec![5.0, 6.0]),
            ],
        );
        let vocab = vocab_of(&["cat", "dog"]);
        let set = read_binary_vectors(Cursor::new(data), &vocab, 2, None).expect("parse binary");
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("cat"), Some(&[1.0, 2.0][..]));
        assert_eq!(set.get("dog"), Some(&[5.0, 6.0][..]));
        assert!(!set.contains("tree"));
    }

    #[test]
    fn binary_reader_skips_newlines_inside_words() {
        let data = binary_source(1, &[("\nfoo", vec![0.5]), ("ba\nr", vec![1.5])]);
        let vocab = vocab_of(&["foo", "bar"]);
        let set = read_binary_vectors(Cursor::new(data), &vocab, 1, None).expect("parse binary");
        assert_eq!(set.get("foo"), Some(&[0.5][..]));
        assert_eq!(set.get("bar"), Some(&[1.5][..]));
    }

    #[test]
    fn binary_reader_rejects_truncated_payload() {
        let mut data = binary_source(3, &[("cat", vec![1.0, 2.0, 3.0])]);
        data.truncate(data.len() - 6);
        let err = read_binary_vectors(Cursor::new(data), &vocab_of(&["cat"]), 3, None)
            .expect_err("truncated record must fail");
        assert!(matches!(err, PrepError::MalformedEmbedding { record: 1, .. }));
    }

    #[test]
    fn binary_reader_rejects_dimension_mismatch() {
        let data = binary_source(2, &[("cat", vec![1.0, 2.0])]);
        let err = read_binary_vectors(Cursor::new(data), &vocab_of(&["cat"]), 300, None)
            .expect_err("dimension mismatch must fail");
        assert!(matches!(err, PrepError::MalformedEmbedding { record: 0, .. }));
    }

    #[test]
    fn text_reader_lowercases_and_filters() {
        let data = "The 0.1 0.2\nunused 1 2\n\nCAT -1 1e-1\n";
        let vocab = vocab_of(&["the", "cat"]);
        let set = read_text_vectors(Cursor::new(data), &vocab, 2, None).expect("parse text");
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("the"), Some(&[0.1, 0.2][..]));
        assert_eq!(set.get("cat"), Some(&[-1.0, 0.1][..]));
    }

    #[test]
    fn text_reader_later_duplicate_wins() {
        let data = "Cat 1 1\ncat 2 2\n";
        let set = read_text_vectors(Cursor::new(data), &vocab_of(&["cat"]), 2, None)
            .expect("parse text");
        assert_eq!(set.get("cat"), Some(&[2.0, 2.0][..]));
    }

    #[test]
    fn text_reader_fails_fast_on_wrong_field_count() {
        let data = "cat 1 2\nskip 1\n";
        let err = read_text_vectors(Cursor::new(data), &vocab_of(&["cat"]), 2, None)
            .expect_err("short line must fail even for out-of-vocabulary words");
        assert!(matches!(err, PrepError::MalformedEmbedding { record: 2, .. }));
    }

    #[test]
    fn text_reader_rejects_non_numeric_fields() {
        let data = "cat 1 abc\n";
        let err = read_text_vectors(Cursor::new(data), &vocab_of(&["cat"]), 2, None)
            .expect_err("non numeric field must fail");
        assert!(matches!(err, PrepError::MalformedEmbedding { record: 1, .. }));
    }

    #[test]
    fn resolve_embeddings_detects_binary_by_extension() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vectors.bin");
        fs::write(&path, binary_source(2, &[("cat", vec![1.0, 2.0])])).expect("write source");
        let vocab: Vocabulary = [("cat", 3), ("dog", 1)].into_iter().collect();
        let set = resolve_embeddings(&path, EmbeddingFormat::Auto, &vocab, 2, false)
            .expect("resolve embeddings");
        assert_eq!(set.len(), 1);
        assert!(set.contains("cat"));
    }

    #[test]
    fn resolve_embeddings_reports_missing_source() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("absent.txt");
        let err = resolve_embeddings(&path, EmbeddingFormat::Text, &Vocabulary::new(), 2, false)
            .expect_err("missing source must fail");
        assert!(matches!(err, PrepError::MissingInput { .. }));
    }
}
