//! Evaluation configuration
//!
//! Every tunable of a run lives here, including the compute device, so that
//! nothing is picked up from process-global state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::features::DEFAULT_MIN_FRAMES;
use crate::model::Device;
use crate::scorer::ScoreMode;
use crate::stats::DEFAULT_HISTOGRAM_BINS;

/// Default items per repetition
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Evaluation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Items drawn per repetition (clamped to the population)
    pub sample_size: usize,
    /// Independent repetitions for the spectral check
    pub n_repeat: usize,
    /// Frames fed to the model per item
    pub min_frames: usize,
    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
    /// Device the evaluated model must be loaded on
    pub device: Device,
    /// Score mode override; each check has its own default when `None`
    pub score_mode: Option<ScoreMode>,
    /// Histogram bin count
    pub histogram_bins: usize,
    /// Wall-clock budget per repetition
    #[serde(with = "optional_secs")]
    pub repetition_budget: Option<Duration>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            n_repeat: 1,
            min_frames: DEFAULT_MIN_FRAMES,
            seed: None,
            device: Device::Cpu,
            score_mode: None,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            repetition_budget: None,
        }
    }
}

impl EvalConfig {
    /// Set sample size
    #[must_use]
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Set repetition count
    #[must_use]
    pub fn with_n_repeat(mut self, n_repeat: usize) -> Self {
        self.n_repeat = n_repeat;
        self
    }

    /// Set frame count fed to the model
    #[must_use]
    pub fn with_min_frames(mut self, min_frames: usize) -> Self {
        self.min_frames = min_frames;
        self
    }

    /// Set RNG seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set device
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Override the score mode for every check
    #[must_use]
    pub fn with_score_mode(mut self, mode: ScoreMode) -> Self {
        self.score_mode = Some(mode);
        self
    }

    /// Set histogram bin count
    #[must_use]
    pub fn with_histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = bins;
        self
    }

    /// Set wall-clock budget per repetition
    #[must_use]
    pub fn with_repetition_budget(mut self, budget: Duration) -> Self {
        self.repetition_budget = Some(budget);
        self
    }

    /// Score mode for a check whose default is `default`
    #[must_use]
    pub fn score_mode_or(&self, default: ScoreMode) -> ScoreMode {
        self.score_mode.unwrap_or(default)
    }
}

mod optional_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        secs.map(|s| {
            Duration::try_from_secs_f64(s).map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
