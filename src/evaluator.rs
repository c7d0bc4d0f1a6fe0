//! Pairwise score evaluator
//!
//! [`PairwiseScoreEvaluator`] drives every check: it draws a sample, embeds
//! each sampled item at most once through a per-repetition [`MemoCache`],
//! fills a score matrix with a [`PairwiseScorer`] and hands the matrix to one
//! of the reducers in [`crate::reduce`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pairscore::{Dataset, EvalConfig, PairwiseScoreEvaluator};
//!
//! let config = EvalConfig::default().with_sample_size(50).with_n_repeat(5);
//! let mut evaluator = PairwiseScoreEvaluator::new(&model, &dataset, config);
//! let report = evaluator.spectral_check()?;
//! println!("{}", report.summary.summary());
//! ```

use std::sync::Arc;
use std::time::Instant;

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::cache::{EmbeddingCache, MemoCache};
use crate::config::EvalConfig;
use crate::dataset::Dataset;
use crate::embedding::Embedding;
use crate::error::{EvalError, EvalResult};
use crate::features::prepare;
use crate::model::EmbeddingModel;
use crate::progress::{BoxedProgressCallback, Phase, Progress};
use crate::reduce::{
    self, encode_labels, normalized_mutual_info, ClusterReport, KMeans, RetrievalReport,
    ScoreDistributionReport, SpectralReport, TriangleReport,
};
use crate::sampler::{self, SampleSet};
use crate::scorer::{PairwiseScorer, ScoreMode, ScoreTransform};
use crate::stats::DescriptiveStats;

/// Evaluates a pairwise scoring model over a dataset
pub struct PairwiseScoreEvaluator<'a, M: EmbeddingModel + ?Sized> {
    model: &'a M,
    dataset: &'a Dataset,
    config: EvalConfig,
    rng: StdRng,
    progress: Option<BoxedProgressCallback>,
}

impl<M: EmbeddingModel + ?Sized> std::fmt::Debug for PairwiseScoreEvaluator<'_, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairwiseScoreEvaluator")
            .field("items", &self.dataset.len())
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a, M: EmbeddingModel + ?Sized> PairwiseScoreEvaluator<'a, M> {
    /// Create an evaluator.
    ///
    /// The RNG is seeded from `config.seed` when set, otherwise from entropy.
    /// Every check fails with [`EvalError::UnsupportedDevice`] unless
    /// `config.device` matches [`EmbeddingModel::device`].
    #[must_use]
    pub fn new(model: &'a M, dataset: &'a Dataset, config: EvalConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            model,
            dataset,
            config,
            rng,
            progress: None,
        }
    }

    /// Install a progress callback, invoked after each pair and each triple
    pub fn set_progress(&mut self, callback: BoxedProgressCallback) {
        self.progress = Some(callback);
    }

    /// Evaluation settings
    #[must_use]
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Dataset under evaluation
    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        self.dataset
    }

    /// Draw a fresh sample of `config.sample_size` items
    pub fn draw_sample(&mut self) -> SampleSet {
        sampler::sample(self.dataset.len(), self.config.sample_size, &mut self.rng)
    }

    /// Distribution of pair scores over one sample.
    ///
    /// Defaults to directional similarity scores.
    ///
    /// # Errors
    ///
    /// Fails when fewer than two items are available or any embedding or
    /// score fails; errors are wrapped with repetition 0.
    pub fn score_distribution(&mut self) -> EvalResult<ScoreDistributionReport> {
        self.check_device()?;
        let mode = self.config.score_mode_or(ScoreMode::Directional);
        let bins = self.config.histogram_bins;
        info!(
            sample_size = self.config.sample_size,
            mode = %mode,
            "Running score distribution check"
        );

        self.repetition(0, |this, started| {
            let sample = this.draw_sample();
            require_items(&sample, 2, "score distribution")?;
            let matrix =
                this.score_matrix(&sample, mode, ScoreTransform::Similarity, 0, started)?;
            reduce::summarize(&matrix, mode, bins)
        })
    }

    /// Minimum eigenvalue of the `1 - score` matrix over `n_repeat`
    /// independent samples.
    ///
    /// # Errors
    ///
    /// Fails when `n_repeat` is zero or a repetition fails; repetition
    /// failures carry their index.
    pub fn spectral_check(&mut self) -> EvalResult<SpectralReport> {
        self.check_device()?;
        let n_repeat = self.config.n_repeat;
        if n_repeat == 0 {
            return Err(EvalError::InvalidInput(
                "n_repeat must be at least 1".into(),
            ));
        }
        let mode = self.config.score_mode_or(ScoreMode::Directional);
        info!(
            sample_size = self.config.sample_size,
            n_repeat,
            mode = %mode,
            "Running spectral check"
        );

        let mut min_eigenvalues = Vec::with_capacity(n_repeat);
        let mut sample_size = 0;
        let mut last_spectrum = Vec::new();
        for rep in 0..n_repeat {
            let spectrum = self.repetition(rep, |this, started| {
                let sample = this.draw_sample();
                require_items(&sample, 1, "spectral check")?;
                let matrix =
                    this.score_matrix(&sample, mode, ScoreTransform::Distance, rep, started)?;
                reduce::eigenvalues(&matrix)
            })?;
            let min = spectrum.first().copied().unwrap_or(f64::NAN);
            info!(repetition = rep, min_eigenvalue = min, "Repetition done");
            sample_size = spectrum.len();
            min_eigenvalues.push(min);
            last_spectrum = spectrum;
        }

        let summary = DescriptiveStats::from_values(&min_eigenvalues)?;
        Ok(SpectralReport {
            sample_size,
            min_eigenvalues,
            summary,
            last_spectrum,
        })
    }

    /// Triangle-inequality violations over all triples of one sample.
    ///
    /// Defaults to symmetrized `1 - score` distances.
    ///
    /// # Errors
    ///
    /// Fails when fewer than three items are available, a score fails, or the
    /// repetition budget runs out.
    pub fn triangle_check(&mut self) -> EvalResult<TriangleReport> {
        self.check_device()?;
        let mode = self.config.score_mode_or(ScoreMode::Symmetrized);
        let bins = self.config.histogram_bins;
        info!(
            sample_size = self.config.sample_size,
            mode = %mode,
            "Running triangle inequality check"
        );

        self.repetition(0, |this, started| {
            let sample = this.draw_sample();
            require_items(&sample, 3, "triangle check")?;
            let distances =
                this.score_matrix(&sample, mode, ScoreTransform::Distance, 0, started)?;
            let total = reduce::num_triples(sample.len());
            let violations = reduce::violations(&distances, |done| {
                this.report(Phase::Triples, 0, done, total);
                this.check_budget(started)
            })?;
            let report = TriangleReport::from_violations(sample.len(), violations, bins)?;
            info!(
                triples = report.triples,
                violated = report.violated,
                "Triangle check done"
            );
            Ok(report)
        })
    }

    /// Recall@K over the whole labeled population.
    ///
    /// Each item queries all others ranked by descending symmetrized
    /// similarity.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::MissingLabels`] for unlabeled datasets, and
    /// [`EvalError::InvalidInput`] when `ks` is empty or contains zero.
    pub fn retrieval_check(&mut self, ks: &[usize]) -> EvalResult<RetrievalReport> {
        self.check_device()?;
        let dataset = self.dataset;
        let labels = dataset
            .labels()
            .ok_or(EvalError::MissingLabels("retrieval check"))?;
        let mode = self.config.score_mode_or(ScoreMode::Symmetrized);
        info!(items = dataset.len(), ?ks, mode = %mode, "Running retrieval check");

        self.repetition(0, |this, started| {
            let sample = SampleSet::full(dataset.len());
            require_items(&sample, 2, "retrieval check")?;
            let matrix =
                this.score_matrix(&sample, mode, ScoreTransform::Similarity, 0, started)?;
            let report = reduce::recall_at_k(&matrix, labels, ks)?;
            for (k, recall) in &report.recall {
                info!(k, recall, "Recall@K");
            }
            Ok(report)
        })
    }

    /// K-means over the embeddings of the whole labeled population, scored by
    /// NMI against the labels.
    ///
    /// `clusters` defaults to the number of distinct labels.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::MissingLabels`] for unlabeled datasets, or any
    /// embedding or clustering failure.
    pub fn cluster_check(&mut self, clusters: Option<usize>) -> EvalResult<ClusterReport> {
        self.check_device()?;
        let dataset = self.dataset;
        let labels = dataset
            .labels()
            .ok_or(EvalError::MissingLabels("cluster check"))?;
        info!(items = dataset.len(), ?clusters, "Running cluster check");

        self.repetition(0, |this, started| {
            let total = dataset.len();
            let mut cache = MemoCache::with_capacity(total);
            let mut embeddings: Vec<Arc<Embedding>> = Vec::with_capacity(total);
            for position in 0..total {
                embeddings.push(this.embedding(&mut cache, position)?);
                this.report(Phase::Embedding, 0, position + 1, total);
                this.check_budget(started)?;
            }

            let (truth, label_classes) = encode_labels(labels);
            let k = clusters.unwrap_or(label_classes);
            let points: Vec<&Embedding> = embeddings.iter().map(AsRef::as_ref).collect();
            let fit = KMeans::new(k).fit(&points, &mut this.rng)?;
            let nmi = normalized_mutual_info(&fit.labels, &truth)?;
            info!(nmi, clusters = k, iterations = fit.iterations, "Cluster check done");

            Ok(ClusterReport {
                items: total,
                clusters: k,
                label_classes,
                nmi,
                inertia: fit.inertia,
                iterations: fit.iterations,
            })
        })
    }

    /// Score a pair of sample positions, embedding both endpoints through
    /// `cache`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::SelfPair`] when `i == j`.
    pub fn score_pair<C: EmbeddingCache>(
        &self,
        cache: &mut C,
        scorer: &PairwiseScorer<'_, M>,
        sample: &SampleSet,
        i: usize,
        j: usize,
    ) -> EvalResult<f64> {
        if i == j {
            return Err(EvalError::SelfPair(i));
        }
        let a = self.embedding(cache, sample_index(sample, i)?)?;
        let b = self.embedding(cache, sample_index(sample, j)?)?;
        scorer.score(&a, &b)
    }

    /// Square score matrix over `sample` with a zero diagonal.
    ///
    /// Symmetrized modes score each unordered pair once and mirror it.
    fn score_matrix(
        &mut self,
        sample: &SampleSet,
        mode: ScoreMode,
        transform: ScoreTransform,
        repetition: usize,
        started: Instant,
    ) -> EvalResult<DMatrix<f64>> {
        let n = sample.len();
        let symmetric = mode.is_symmetric();
        let total = if symmetric {
            n * n.saturating_sub(1) / 2
        } else {
            n * n.saturating_sub(1)
        };
        let scorer = PairwiseScorer::new(self.model, mode, transform);
        let mut cache = MemoCache::with_capacity(n);
        let mut matrix = DMatrix::zeros(n, n);
        let mut done = 0;

        for i in 0..n {
            for j in 0..n {
                if i == j || (symmetric && j < i) {
                    continue;
                }
                let score = self.score_pair(&mut cache, &scorer, sample, i, j)?;
                matrix[(i, j)] = score;
                if symmetric {
                    matrix[(j, i)] = score;
                }
                done += 1;
                self.report(Phase::Pairs, repetition, done, total);
                self.check_budget(started)?;
            }
        }

        let stats = cache.stats();
        debug!(
            repetition,
            embedded = cache.len(),
            hits = stats.hits,
            misses = stats.misses,
            hit_rate = stats.hit_rate(),
            "Embedding cache"
        );
        Ok(matrix)
    }

    /// Embedding of the item at dataset `position`, computed on a miss
    fn embedding<C: EmbeddingCache>(
        &self,
        cache: &mut C,
        position: usize,
    ) -> EvalResult<Arc<Embedding>> {
        let item_id = self
            .dataset
            .id(position)
            .ok_or_else(|| EvalError::UnknownItem(format!("#{position}")))?;
        let features = self
            .dataset
            .features(position)
            .ok_or_else(|| EvalError::UnknownItem(item_id.to_string()))?;
        let min_frames = self.config.min_frames;
        let model = self.model;

        cache.get_or_compute(item_id, |id| {
            prepare(features, min_frames)
                .and_then(|input| model.embed(&input))
                .map_err(|e| EvalError::EmbeddingCompute {
                    item_id: id.to_string(),
                    reason: e.to_string(),
                })
        })
    }

    /// Run one repetition, attaching its index to any error
    fn repetition<T, F>(&mut self, repetition: usize, run: F) -> EvalResult<T>
    where
        F: FnOnce(&mut Self, Instant) -> EvalResult<T>,
    {
        debug!(repetition, "Starting repetition");
        let started = Instant::now();
        let result = run(self, started).map_err(|e| e.in_repetition(repetition));
        debug!(
            repetition,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Repetition finished"
        );
        result
    }

    fn report(&mut self, phase: Phase, repetition: usize, current: usize, total: usize) {
        if let Some(callback) = self.progress.as_mut() {
            callback(&Progress::new(phase, repetition, current, total));
        }
    }

    fn check_device(&self) -> EvalResult<()> {
        let loaded = self.model.device();
        if loaded != self.config.device {
            return Err(EvalError::UnsupportedDevice(format!(
                "evaluation configured for {} but the model is loaded on {loaded}",
                self.config.device
            )));
        }
        Ok(())
    }

    fn check_budget(&self, started: Instant) -> EvalResult<()> {
        match self.config.repetition_budget {
            Some(budget) if started.elapsed() > budget => Err(EvalError::BudgetExceeded {
                budget,
                elapsed: started.elapsed(),
            }),
            _ => Ok(()),
        }
    }
}

fn sample_index(sample: &SampleSet, position: usize) -> EvalResult<usize> {
    sample.get(position).ok_or_else(|| {
        EvalError::InvalidInput(format!(
            "sample position {position} out of range for {} items",
            sample.len()
        ))
    })
}

fn require_items(sample: &SampleSet, min: usize, check: &str) -> EvalResult<()> {
    if sample.len() < min {
        return Err(EvalError::InvalidInput(format!(
            "{check} needs at least {min} items, got {}",
            sample.len()
        )));
    }
    Ok(())
}
