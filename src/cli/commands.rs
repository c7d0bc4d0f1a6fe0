//! Command implementations for the pairscore CLI
//!
//! Each command is implemented as a plain function for testability.
//! The main `run` function dispatches to the appropriate command.

use std::fs;
use std::io::{self, Write as IoWrite};
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::EvalConfig;
use crate::dataset::{self, Dataset};
use crate::evaluator::PairwiseScoreEvaluator;
use crate::model::{DiscriminatorModel, LoadMode, LoadOptions};
use crate::progress::Progress;
use crate::stats::Histogram;
use crate::EvalError;

use super::args::{
    Args, ClusterArgs, Command, DataArgs, MetricArgs, RetrievalArgs, SpectralArgs, TriangleArgs,
};
use super::output::{self, OutputFormat};

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Evaluation error
    #[error("{0}")]
    Eval(#[from] EvalError),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

/// Command execution result
#[derive(Debug)]
pub struct CommandResult {
    /// Formatted report
    pub message: String,
    /// Wall-clock time of the evaluation
    pub elapsed: Option<Duration>,
}

impl CommandResult {
    /// Create a success result
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            elapsed: None,
        }
    }

    /// Attach elapsed time
    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }
}

/// Run CLI with parsed arguments
///
/// This is the main entry point called by the binary. The checkpoint path is
/// validated before any data is read.
///
/// # Errors
///
/// Returns [`CliError`] for missing inputs, load failures, or evaluation
/// failures.
pub fn run(args: Args) -> CliResult<CommandResult> {
    let data = args.command.data();
    let cp_path = data
        .cp_path
        .as_deref()
        .ok_or(CliError::Eval(EvalError::MissingCheckpoint))?;
    if !cp_path.exists() {
        return Err(CliError::FileNotFound(cp_path.display().to_string()));
    }
    if !data.test_data.is_dir() {
        return Err(CliError::FileNotFound(data.test_data.display().to_string()));
    }

    let model = load_model(cp_path, &args)?;
    let dataset = load_dataset(data)?;
    info!(items = dataset.len(), labeled = dataset.labels().is_some(), "Dataset loaded");

    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let started = Instant::now();

    let message = match &args.command {
        Command::Metric(m) => run_metric(m, &args, &model, &dataset, format)?,
        Command::Spectral(s) => run_spectral(s, &args, &model, &dataset, format)?,
        Command::Triangle(t) => run_triangle(t, &args, &model, &dataset, format)?,
        Command::Retrieval(r) => run_retrieval(r, &args, &model, &dataset, format)?,
        Command::Cluster(c) => run_cluster(c, &args, &model, &dataset, format)?,
    };

    let elapsed = started.elapsed();
    debug!(elapsed_ms = elapsed.as_millis() as u64, "Evaluation finished");
    Ok(CommandResult::success(message).with_elapsed(elapsed))
}

/// Run the score distribution command
///
/// # Errors
///
/// Propagates evaluation and output failures.
pub fn run_metric(
    cmd: &MetricArgs,
    global: &Args,
    model: &DiscriminatorModel,
    dataset: &Dataset,
    format: OutputFormat,
) -> CliResult<String> {
    let config = eval_config(global, &cmd.data)?
        .with_sample_size(cmd.sample_size)
        .with_histogram_bins(cmd.bins);
    let mut evaluator = evaluator(model, dataset, config, global);
    let report = evaluator.score_distribution()?;
    if let Some(path) = &cmd.histogram {
        write_histogram(path, &report.histogram)?;
    }
    output::format_distribution(&report, format)
}

/// Run the spectral command
///
/// # Errors
///
/// Propagates evaluation and output failures.
pub fn run_spectral(
    cmd: &SpectralArgs,
    global: &Args,
    model: &DiscriminatorModel,
    dataset: &Dataset,
    format: OutputFormat,
) -> CliResult<String> {
    let config = eval_config(global, &cmd.data)?
        .with_sample_size(cmd.sample_size)
        .with_n_repeat(cmd.n_repeat);
    let mut evaluator = evaluator(model, dataset, config, global);
    let report = evaluator.spectral_check()?;
    output::format_spectral(&report, format)
}

/// Run the triangle inequality command
///
/// # Errors
///
/// Propagates evaluation and output failures.
pub fn run_triangle(
    cmd: &TriangleArgs,
    global: &Args,
    model: &DiscriminatorModel,
    dataset: &Dataset,
    format: OutputFormat,
) -> CliResult<String> {
    let config = eval_config(global, &cmd.data)?
        .with_sample_size(cmd.sample_size)
        .with_histogram_bins(cmd.bins);
    let mut evaluator = evaluator(model, dataset, config, global);
    let report = evaluator.triangle_check()?;
    if let Some(path) = &cmd.histogram {
        write_histogram(path, &report.histogram)?;
    }
    output::format_triangle(&report, format)
}

/// Run the retrieval command
///
/// # Errors
///
/// Returns [`CliError::InvalidArgument`] without `--spk2utt`, otherwise
/// propagates evaluation and output failures.
pub fn run_retrieval(
    cmd: &RetrievalArgs,
    global: &Args,
    model: &DiscriminatorModel,
    dataset: &Dataset,
    format: OutputFormat,
) -> CliResult<String> {
    require_labels(dataset, "retrieval")?;
    let config = eval_config(global, &cmd.data)?;
    let mut evaluator = evaluator(model, dataset, config, global);
    let report = evaluator.retrieval_check(&cmd.k_list)?;
    output::format_retrieval(&report, format)
}

/// Run the clustering command
///
/// # Errors
///
/// Returns [`CliError::InvalidArgument`] without `--spk2utt`, otherwise
/// propagates evaluation and output failures.
pub fn run_cluster(
    cmd: &ClusterArgs,
    global: &Args,
    model: &DiscriminatorModel,
    dataset: &Dataset,
    format: OutputFormat,
) -> CliResult<String> {
    require_labels(dataset, "cluster")?;
    let config = eval_config(global, &cmd.data)?;
    let mut evaluator = evaluator(model, dataset, config, global);
    let report = evaluator.cluster_check(cmd.clusters)?;
    output::format_cluster(&report, format)
}

/// Build the evaluation config from global and shared arguments
///
/// # Errors
///
/// Returns [`CliError::InvalidArgument`] for a negative or non-finite budget.
pub fn eval_config(global: &Args, data: &DataArgs) -> CliResult<EvalConfig> {
    let mut config = EvalConfig::default()
        .with_min_frames(global.min_frames)
        .with_device(global.device);
    if let Some(seed) = global.seed {
        config = config.with_seed(seed);
    }
    if let Some(mode) = data.mode {
        config = config.with_score_mode(mode.into());
    }
    if let Some(secs) = data.budget_secs {
        let budget = Duration::try_from_secs_f64(secs)
            .map_err(|e| CliError::InvalidArgument(format!("--budget-secs {secs}: {e}")))?;
        config = config.with_repetition_budget(budget);
    }
    Ok(config)
}

fn load_model(path: &Path, global: &Args) -> CliResult<DiscriminatorModel> {
    let mode = if global.permissive {
        LoadMode::Permissive
    } else {
        LoadMode::Strict
    };
    let options = LoadOptions::default()
        .with_mode(mode)
        .with_layer(global.layer.into())
        .with_device(global.device);
    let model = DiscriminatorModel::load(Some(path), options)?;
    info!(
        path = %path.display(),
        embedding_dim = model.embedding_dim(),
        discriminators = model.num_discriminators(),
        "Model loaded"
    );
    Ok(model)
}

/// Load features, then restrict and label them by the trials and spk2utt
/// files when given
///
/// # Errors
///
/// Propagates loader failures.
pub fn load_dataset(data: &DataArgs) -> CliResult<Dataset> {
    let mut dataset = dataset::load_feature_dir(&data.test_data)?;
    if let Some(trials) = &data.trials {
        let ids = dataset::read_trials(trials)?;
        dataset = dataset.select(&ids)?;
    }
    if let Some(spk2utt) = &data.spk2utt {
        let speakers = dataset::read_spk2utt(spk2utt)?;
        dataset = dataset.with_speakers(&speakers)?;
    }
    Ok(dataset)
}

fn evaluator<'a>(
    model: &'a DiscriminatorModel,
    dataset: &'a Dataset,
    config: EvalConfig,
    global: &Args,
) -> PairwiseScoreEvaluator<'a, DiscriminatorModel> {
    let mut evaluator = PairwiseScoreEvaluator::new(model, dataset, config);
    if !global.quiet && !global.json {
        evaluator.set_progress(Box::new(print_progress));
    }
    evaluator
}

fn require_labels(dataset: &Dataset, command: &str) -> CliResult<()> {
    if dataset.labels().is_none() {
        return Err(CliError::InvalidArgument(format!(
            "{command} needs speaker labels (--spk2utt)"
        )));
    }
    Ok(())
}

/// Print progress to stderr at whole-percent steps
fn print_progress(progress: &Progress) {
    let step = (progress.total / 100).max(1);
    if progress.current % step == 0 || progress.is_complete() {
        eprint!("\r{}", progress.display_message());
        if progress.is_complete() {
            eprintln!();
        }
        io::stderr().flush().ok();
    }
}

fn write_histogram(path: &Path, histogram: &Histogram) -> CliResult<()> {
    fs::write(path, histogram.to_csv())?;
    info!(path = %path.display(), bins = histogram.bins(), "Histogram written");
    Ok(())
}
