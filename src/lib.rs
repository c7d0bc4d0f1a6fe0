//! # pairscore
//!
//! Pairwise embedding-similarity evaluation engine.
//!
//! ## Overview
//!
//! Given a population of items (utterances, images) and a model that embeds an
//! item and scores a pair of embeddings, pairscore checks how well the learned
//! pair score behaves as a metric and as a retrieval signal:
//! - score distribution over all pairs of a sample
//! - minimum eigenvalue of the `1 - score` matrix over repeated samples
//! - triangle-inequality violations over all triples of a sample
//! - recall@K with labeled items as queries
//! - k-means clustering of embeddings scored by NMI against labels
//!
//! Each item is embedded at most once per repetition through a memoized cache.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pairscore::{dataset, DiscriminatorModel, EvalConfig, LoadOptions, PairwiseScoreEvaluator};
//!
//! let data = dataset::load_feature_dir("feats/".as_ref())?;
//! let model = DiscriminatorModel::load(Some("model.json".as_ref()), LoadOptions::default())?;
//! let config = EvalConfig::default().with_sample_size(100).with_n_repeat(10);
//! let report = PairwiseScoreEvaluator::new(&model, &data, config).spectral_check()?;
//! println!("{}", report.summary.summary());
//! ```
//!
//! ## Features
//!
//! - `cli` (default): command-line interface (clap, tracing-subscriber)

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

pub mod cache;
pub mod config;
pub mod dataset;
pub mod embedding;
pub mod error;
pub mod evaluator;
pub mod features;
pub mod model;
pub mod progress;
pub mod reduce;
pub mod sampler;
pub mod scorer;
pub mod stats;

/// Command-line interface
#[cfg(feature = "cli")]
pub mod cli;

pub use cache::{CacheStats, EmbeddingCache, MemoCache};
pub use config::EvalConfig;
pub use dataset::Dataset;
pub use embedding::Embedding;
pub use error::{EvalError, EvalResult};
pub use evaluator::PairwiseScoreEvaluator;
pub use features::{prepare, FeatureMatrix, DEFAULT_MIN_FRAMES};
pub use model::{
    Device, DiscriminatorModel, EmbeddingLayer, EmbeddingModel, LoadMode, LoadOptions,
};
pub use reduce::{
    ClusterReport, RetrievalReport, ScoreDistributionReport, SpectralReport, TriangleReport,
};
pub use sampler::{sample, SampleSet};
pub use scorer::{PairwiseScorer, ScoreMode, ScoreTransform};
pub use stats::{DescriptiveStats, Histogram};

/// Opaque identifier of one item (utterance, image)
pub type ItemId = String;
