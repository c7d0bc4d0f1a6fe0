//! Command-line argument parsing for the pairscore CLI
//!
//! Uses clap derive macros for type-safe argument parsing.
//! All argument structures are unit-testable.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use crate::model::{Device, EmbeddingLayer};
use crate::scorer::ScoreMode;

/// pairscore: evaluate a learned pairwise similarity
///
/// Checks metric properties and retrieval quality of a model that embeds
/// items and scores pairs of embeddings.
#[derive(Parser, Debug, Clone)]
#[command(name = "pairscore")]
#[command(version)]
#[command(about = "Pairwise embedding-similarity evaluation", long_about = None)]
#[command(propagate_version = true)]
#[allow(clippy::struct_excessive_bools)] // CLI flags are naturally boolean
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (no progress output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as JSON (machine-readable)
    #[arg(long, global = true)]
    pub json: bool,

    /// Compute device: cpu or cuda:N
    #[arg(long, global = true, default_value = "cpu")]
    pub device: Device,

    /// Seed for sampling and clustering (default: random)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Frames per prepared input
    #[arg(long, global = true, default_value_t = crate::features::DEFAULT_MIN_FRAMES)]
    pub min_frames: usize,

    /// Which model layer provides the embedding
    #[arg(long, global = true, value_enum, default_value = "inner")]
    pub layer: LayerArg,

    /// Accept checkpoints with unknown keys or missing discriminator heads
    #[arg(long, global = true)]
    pub permissive: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Score distribution over all pairs of one sample
    Metric(MetricArgs),

    /// Minimum eigenvalue of the distance matrix over repeated samples
    Spectral(SpectralArgs),

    /// Triangle-inequality violations over all triples of one sample
    Triangle(TriangleArgs),

    /// Recall@K over a labeled population
    Retrieval(RetrievalArgs),

    /// K-means clustering of embeddings scored by NMI
    Cluster(ClusterArgs),
}

/// Inputs shared by every command
#[derive(ClapArgs, Debug, Clone)]
pub struct DataArgs {
    /// Directory of Kaldi text feature archives (*.ark)
    #[arg(long)]
    pub test_data: PathBuf,

    /// Model checkpoint (JSON)
    #[arg(long)]
    pub cp_path: Option<PathBuf>,

    /// spk2utt file giving speaker labels and the utterance list
    #[arg(long)]
    pub spk2utt: Option<PathBuf>,

    /// Trials file; restricts items to its test column
    #[arg(long)]
    pub trials: Option<PathBuf>,

    /// Pair scoring mode (default depends on the command)
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Wall-clock budget per repetition in seconds
    #[arg(long)]
    pub budget_secs: Option<f64>,
}

/// Arguments for the metric command
#[derive(Parser, Debug, Clone)]
pub struct MetricArgs {
    /// Shared inputs
    #[command(flatten)]
    pub data: DataArgs,

    /// Items per sample
    #[arg(long, default_value_t = crate::config::DEFAULT_SAMPLE_SIZE)]
    pub sample_size: usize,

    /// Histogram bins
    #[arg(long, default_value_t = crate::stats::DEFAULT_HISTOGRAM_BINS)]
    pub bins: usize,

    /// Write the score histogram as CSV
    #[arg(long)]
    pub histogram: Option<PathBuf>,
}

/// Arguments for the spectral command
#[derive(Parser, Debug, Clone)]
pub struct SpectralArgs {
    /// Shared inputs
    #[command(flatten)]
    pub data: DataArgs,

    /// Items per sample
    #[arg(long, default_value_t = crate::config::DEFAULT_SAMPLE_SIZE)]
    pub sample_size: usize,

    /// Number of independent repetitions
    #[arg(long, default_value = "1")]
    pub n_repeat: usize,
}

/// Arguments for the triangle command
#[derive(Parser, Debug, Clone)]
pub struct TriangleArgs {
    /// Shared inputs
    #[command(flatten)]
    pub data: DataArgs,

    /// Items per sample
    #[arg(long, default_value_t = crate::config::DEFAULT_SAMPLE_SIZE)]
    pub sample_size: usize,

    /// Histogram bins
    #[arg(long, default_value_t = crate::stats::DEFAULT_HISTOGRAM_BINS)]
    pub bins: usize,

    /// Write the violation histogram as CSV
    #[arg(long)]
    pub histogram: Option<PathBuf>,
}

/// Arguments for the retrieval command
#[derive(Parser, Debug, Clone)]
pub struct RetrievalArgs {
    /// Shared inputs
    #[command(flatten)]
    pub data: DataArgs,

    /// Comma-separated K values
    #[arg(long, value_delimiter = ',', default_value = "1,5,10")]
    pub k_list: Vec<usize>,
}

/// Arguments for the cluster command
#[derive(Parser, Debug, Clone)]
pub struct ClusterArgs {
    /// Shared inputs
    #[command(flatten)]
    pub data: DataArgs,

    /// Number of clusters (default: number of distinct labels)
    #[arg(long)]
    pub clusters: Option<usize>,
}

/// Pair scoring mode
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// One head call on (a, b)
    Directional,
    /// Mean of (a, b) and (b, a)
    Symmetrized,
}

impl From<ModeArg> for ScoreMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Directional => Self::Directional,
            ModeArg::Symmetrized => Self::Symmetrized,
        }
    }
}

/// Embedding layer
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerArg {
    /// Projection output
    #[default]
    Inner,
    /// Second linear layer output
    Outer,
}

impl From<LayerArg> for EmbeddingLayer {
    fn from(arg: LayerArg) -> Self {
        match arg {
            LayerArg::Inner => Self::Inner,
            LayerArg::Outer => Self::Outer,
        }
    }
}

impl Command {
    /// Shared inputs of this command
    #[must_use]
    pub fn data(&self) -> &DataArgs {
        match self {
            Self::Metric(a) => &a.data,
            Self::Spectral(a) => &a.data,
            Self::Triangle(a) => &a.data,
            Self::Retrieval(a) => &a.data,
            Self::Cluster(a) => &a.data,
        }
    }
}
