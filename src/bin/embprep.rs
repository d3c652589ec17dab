use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use embprep::artifacts::read_embedding_artifact;
use embprep::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_EMBEDDING_DIM, DEFAULT_SEED, DEFAULT_UNKNOWN_MIN_FREQUENCY,
};
use embprep::{
    EmbeddingFormat, PathsConfig, Pipeline, PipelineConfig, TextTokenizer, TokenizerKind,
};
use env_logger::Env;
use log::{info, LevelFilter};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(author, version, about = "Embedding matrix and dataset index builder", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build embedding matrices and index the train, validation, and test splits
    Build(BuildArgs),
    /// Inspect an embedding artifact
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Pretrained embedding source (word2vec .bin or GloVe text)
    #[arg(long, value_name = "PATH")]
    embeddings: PathBuf,

    /// Directory holding trainset{suffix}.json, valset.json and testset.json
    #[arg(long, value_name = "DIR", default_value = "../data")]
    input_dir: PathBuf,

    /// Directory receiving the four artifacts
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Suffix appended to the train input and every output name
    #[arg(long, default_value = "")]
    suffix: String,

    /// Layout of the embedding source
    #[arg(long, value_enum, default_value_t = FormatArg::Auto)]
    embedding_format: FormatArg,

    /// Train and validation splits are padded to a multiple of this size
    #[arg(long, value_name = "SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Dimension of every embedding vector
    #[arg(long, value_name = "DIM", default_value_t = DEFAULT_EMBEDDING_DIM)]
    embedding_dim: usize,

    /// Minimum count for words without a pretrained vector to receive an index
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_UNKNOWN_MIN_FREQUENCY)]
    min_frequency: u64,

    /// Seed for synthesized vectors
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Built-in pre-tokenizer used to split texts
    #[arg(long, value_enum, default_value_t = TokenizerArg::Whitespace)]
    tokenizer: TokenizerArg,

    /// Use the pre-tokenizer of a Hugging Face tokenizer.json instead of --tokenizer
    #[arg(long, value_name = "PATH")]
    tokenizer_json: Option<PathBuf>,

    /// Write run metrics as JSON to this path
    #[arg(long, value_name = "PATH")]
    metrics: Option<PathBuf>,

    /// Disable the embedding-source progress bar
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// pretrained_embeddings or random_embeddings artifact
    artifact: PathBuf,

    /// Emit JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatArg {
    /// Binary for `.bin` files, text otherwise
    Auto,
    /// word2vec binary layout
    Binary,
    /// GloVe text layout
    Text,
}

impl From<FormatArg> for EmbeddingFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Auto => EmbeddingFormat::Auto,
            FormatArg::Binary => EmbeddingFormat::Binary,
            FormatArg::Text => EmbeddingFormat::Text,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TokenizerArg {
    /// Word characters and punctuation runs
    Whitespace,
    /// Whitespace only
    WhitespaceSplit,
    /// BERT punctuation rules
    Bert,
}

impl From<TokenizerArg> for TokenizerKind {
    fn from(value: TokenizerArg) -> Self {
        match value {
            TokenizerArg::Whitespace => TokenizerKind::Whitespace,
            TokenizerArg::WhitespaceSplit => TokenizerKind::WhitespaceSplit,
            TokenizerArg::Bert => TokenizerKind::Bert,
        }
    }
}

impl fmt::Display for TokenizerArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TokenizerArg::Whitespace => "whitespace",
            TokenizerArg::WhitespaceSplit => "whitespace-split",
            TokenizerArg::Bert => "bert",
        };
        f.write_str(label)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Info(args) => run_info(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    // Without -v/-q the RUST_LOG filter (or `info`) applies unchanged.
    if let Some(level) = level_override(verbose, quiet) {
        builder.filter_level(level);
    }
    let _ = builder.try_init();
}

fn level_override(verbose: u8, quiet: u8) -> Option<LevelFilter> {
    match (verbose, quiet) {
        (_, 1) => Some(LevelFilter::Warn),
        (_, q) if q > 1 => Some(LevelFilter::Error),
        (0, _) => None,
        (1, _) => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}

fn run_build(args: BuildArgs) -> Result<()> {
    let cfg = PipelineConfig::builder()
        .batch_size(args.batch_size)
        .embedding_dim(args.embedding_dim)
        .unknown_min_frequency(args.min_frequency)
        .seed(args.seed)
        .show_progress(!args.no_progress)
        .tokenizer(args.tokenizer.into())
        .build()?;

    let paths = PathsConfig {
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        suffix: args.suffix,
        embeddings: args.embeddings,
        embedding_format: args.embedding_format.into(),
    };

    let tokenizer = match &args.tokenizer_json {
        Some(path) => TextTokenizer::from_tokenizer_file(path)
            .with_context(|| format!("failed to load tokenizer from {}", path.display()))?,
        None => {
            info!("using the {} pre-tokenizer", args.tokenizer);
            TextTokenizer::new(cfg.tokenizer)
        }
    };

    let pipeline = Pipeline::with_tokenizer(cfg, tokenizer);
    let artifacts = pipeline.run(&paths).with_context(|| {
        format!(
            "failed to build embeddings from {} and {}",
            paths.input_dir.display(),
            paths.embeddings.display()
        )
    })?;
    let written = artifacts.write(&paths).with_context(|| {
        format!(
            "failed to write artifacts to {}",
            paths.output_dir.display()
        )
    })?;

    if let Some(path) = &args.metrics {
        let body = serde_json::to_string_pretty(&artifacts.metrics)?;
        fs::write(path, body)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
        info!("metrics written to {}", path.display());
    }

    let metrics = &artifacts.metrics;
    let (rows, dim) = metrics.matrix_shape;
    println!(
        "indexed {} train / {} val / {} test rows; matrix {rows}x{dim} ({} pretrained, {} synthesized) in {:.2}s -> {}",
        metrics.train.padded_rows,
        metrics.validation.padded_rows,
        metrics.test.padded_rows,
        metrics.resolved,
        metrics.synthesized,
        metrics.total_duration.as_secs_f64(),
        written.dataset.display()
    );

    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let (matrix, index) = read_embedding_artifact(&args.artifact)
        .with_context(|| format!("failed to read {}", args.artifact.display()))?;
    let (rows, dim) = matrix.shape();
    let unknown = index.unknown_index();

    if args.json {
        let summary = json!({
            "path": args.artifact.display().to_string(),
            "rows": rows,
            "dim": dim,
            "vocab_size": index.len(),
            "unknown_index": unknown,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Rows         : {rows}");
        println!("Dimension    : {dim}");
        println!("Vocab size   : {}", index.len());
        println!("Unknown index: {unknown}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_override_only_applies_with_flags() {
        assert_eq!(level_override(0, 0), None);
        assert_eq!(level_override(1, 0), Some(LevelFilter::Debug));
        assert_eq!(level_override(2, 0), Some(LevelFilter::Trace));
        assert_eq!(level_override(0, 1), Some(LevelFilter::Warn));
        assert_eq!(level_override(3, 2), Some(LevelFilter::Error));
    }
}
