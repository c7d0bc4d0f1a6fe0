//! Model collaborator interface
//!
//! The evaluator only needs two operations from a model: embed one prepared
//! feature matrix, and score a concatenated embedding pair with the
//! discriminator head. [`EmbeddingModel`] is that seam; [`DiscriminatorModel`]
//! is the CPU reference implementation loaded from a JSON checkpoint.

pub mod checkpoint;
pub mod discriminator;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use checkpoint::{Checkpoint, HeadWeights, LinearWeights};
pub use discriminator::DiscriminatorModel;

use crate::embedding::Embedding;
use crate::error::{EvalError, EvalResult};
use crate::features::FeatureMatrix;

/// Model operations consumed by the evaluator
pub trait EmbeddingModel {
    /// Embed one prepared feature matrix
    ///
    /// # Errors
    ///
    /// Returns an error when the input shape is wrong or the forward pass
    /// produces unusable output.
    fn embed(&self, input: &FeatureMatrix) -> EvalResult<Embedding>;

    /// Score the concatenation `[emb_a, emb_b]` with the discriminator head
    ///
    /// # Errors
    ///
    /// Returns an error when the model has no discriminator head or the pair
    /// has the wrong width.
    fn pairwise_score(&self, concatenated: &[f32]) -> EvalResult<f32>;

    /// Device the model was loaded on
    fn device(&self) -> Device {
        Device::Cpu
    }
}

impl<M: EmbeddingModel + ?Sized> EmbeddingModel for &M {
    fn embed(&self, input: &FeatureMatrix) -> EvalResult<Embedding> {
        (**self).embed(input)
    }

    fn pairwise_score(&self, concatenated: &[f32]) -> EvalResult<f32> {
        (**self).pairwise_score(concatenated)
    }

    fn device(&self) -> Device {
        (**self).device()
    }
}

/// Compute device the model runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Device {
    /// Host CPU
    #[default]
    Cpu,
    /// Accelerator by ordinal
    Accelerator(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Accelerator(index) => write!(f, "cuda:{index}"),
        }
    }
}

impl FromStr for Device {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "cpu" {
            return Ok(Self::Cpu);
        }
        let ordinal = s
            .strip_prefix("cuda:")
            .or_else(|| s.strip_prefix("gpu:"))
            .map(str::parse::<usize>);
        match ordinal {
            Some(Ok(index)) => Ok(Self::Accelerator(index)),
            _ if s == "cuda" || s == "gpu" => Ok(Self::Accelerator(0)),
            _ => Err(EvalError::InvalidInput(format!(
                "unknown device '{s}', expected cpu or cuda:N"
            ))),
        }
    }
}

/// Which network layer provides the embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingLayer {
    /// Inner projection layer (default)
    #[default]
    Inner,
    /// Outer layer on top of the inner projection
    Outer,
}

/// Checkpoint loading strictness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Every key must be known and every required tensor present
    #[default]
    Strict,
    /// Unknown keys are ignored and the outer layer or discriminator heads
    /// may be absent, for embedding-only reuse of a checkpoint
    Permissive,
}

/// Options for loading a checkpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Strictness
    pub mode: LoadMode,
    /// Embedding layer to expose
    pub layer: EmbeddingLayer,
    /// Target device
    pub device: Device,
}

impl LoadOptions {
    /// Set load mode
    #[must_use]
    pub fn with_mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set embedding layer
    #[must_use]
    pub fn with_layer(mut self, layer: EmbeddingLayer) -> Self {
        self.layer = layer;
        self
    }

    /// Set device
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_parse() {
        assert_eq!("cpu".parse::<Device>().ok(), Some(Device::Cpu));
        assert_eq!("CUDA:2".parse::<Device>().ok(), Some(Device::Accelerator(2)));
        assert_eq!("gpu".parse::<Device>().ok(), Some(Device::Accelerator(0)));
        assert!("tpu:1".parse::<Device>().is_err());
        assert!("cuda:x".parse::<Device>().is_err());
    }

    #[test]
    fn test_device_display_roundtrip() {
        let device = Device::Accelerator(3);
        assert_eq!(device.to_string().parse::<Device>().ok(), Some(device));
    }

    #[test]
    fn test_load_options_builders() {
        let opts = LoadOptions::default()
            .with_mode(LoadMode::Permissive)
            .with_layer(EmbeddingLayer::Outer);
        assert_eq!(opts.mode, LoadMode::Permissive);
        assert_eq!(opts.layer, EmbeddingLayer::Outer);
        assert_eq!(opts.device, Device::Cpu);
    }
}
