//! Reference discriminator model
//!
//! Statistics pooling over frames, a linear projection to the inner embedding,
//! an optional second layer for the outer embedding, and logistic
//! discriminator heads over concatenated embedding pairs.

use std::path::Path;

use tracing::{debug, info};

use super::checkpoint::{Checkpoint, HeadWeights};
use super::{Device, EmbeddingLayer, EmbeddingModel, LoadMode, LoadOptions};
use crate::embedding::Embedding;
use crate::error::{EvalError, EvalResult};
use crate::features::FeatureMatrix;

/// CPU model built from a validated [`Checkpoint`]
#[derive(Debug, Clone)]
pub struct DiscriminatorModel {
    checkpoint: Checkpoint,
    layer: EmbeddingLayer,
    embedding_dim: usize,
    device: Device,
}

impl DiscriminatorModel {
    /// Load a model from a checkpoint path.
    ///
    /// # Errors
    ///
    /// - [`EvalError::MissingCheckpoint`] when `path` is `None`
    /// - [`EvalError::UnsupportedDevice`] for accelerator devices
    /// - [`EvalError::ModelLoadMismatch`] for key or shape mismatches
    pub fn load(path: Option<&Path>, options: LoadOptions) -> EvalResult<Self> {
        let path = path.ok_or(EvalError::MissingCheckpoint)?;
        Self::check_device(options.device)?;
        info!(
            path = %path.display(),
            mode = ?options.mode,
            layer = ?options.layer,
            "loading checkpoint"
        );
        let checkpoint = Checkpoint::from_path(path, options.mode)?;
        Self::from_checkpoint(checkpoint, options)
    }

    /// Build a model from an in-memory checkpoint.
    ///
    /// # Errors
    ///
    /// See [`DiscriminatorModel::load`].
    pub fn from_checkpoint(checkpoint: Checkpoint, options: LoadOptions) -> EvalResult<Self> {
        Self::check_device(options.device)?;

        if checkpoint.projection.out_dim() != checkpoint.latent_size {
            return Err(EvalError::ModelLoadMismatch(format!(
                "projection: produces {} values, latent_size is {}",
                checkpoint.projection.out_dim(),
                checkpoint.latent_size
            )));
        }
        checkpoint
            .projection
            .validate("projection", 2 * checkpoint.ncoef)?;

        match &checkpoint.output {
            Some(output) => output.validate("output", checkpoint.latent_size)?,
            None if options.mode == LoadMode::Strict => {
                return Err(EvalError::ModelLoadMismatch(
                    "checkpoint has no 'output' layer; load permissively to skip it".into(),
                ));
            }
            None => {}
        }

        let embedding_dim = match options.layer {
            EmbeddingLayer::Inner => checkpoint.latent_size,
            EmbeddingLayer::Outer => checkpoint
                .output
                .as_ref()
                .map(|o| o.out_dim())
                .ok_or_else(|| {
                    EvalError::ModelLoadMismatch(
                        "outer embedding requested but checkpoint has no 'output' layer".into(),
                    )
                })?,
        };

        if checkpoint.discriminators.is_empty() && options.mode == LoadMode::Strict {
            return Err(EvalError::ModelLoadMismatch(
                "checkpoint has no discriminator heads; load permissively for embedding-only use"
                    .into(),
            ));
        }
        for (i, head) in checkpoint.discriminators.iter().enumerate() {
            Self::validate_head(i, head, 2 * embedding_dim)?;
        }

        debug!(
            embedding_dim,
            heads = checkpoint.discriminators.len(),
            "checkpoint validated"
        );

        Ok(Self {
            checkpoint,
            layer: options.layer,
            embedding_dim,
            device: options.device,
        })
    }

    fn check_device(device: Device) -> EvalResult<()> {
        match device {
            Device::Cpu => Ok(()),
            Device::Accelerator(_) => Err(EvalError::UnsupportedDevice(format!(
                "{device}: the reference model runs on the host CPU only"
            ))),
        }
    }

    fn validate_head(index: usize, head: &HeadWeights, input_dim: usize) -> EvalResult<()> {
        let mut expected_in = input_dim;
        for (l, layer) in head.layers.iter().enumerate() {
            layer.validate(&format!("discriminators[{index}].layers[{l}]"), expected_in)?;
            expected_in = layer.out_dim();
        }
        if head.layers.is_empty() || expected_in != 1 {
            return Err(EvalError::ModelLoadMismatch(format!(
                "discriminators[{index}]: head must end in a single output"
            )));
        }
        Ok(())
    }

    /// Embedding width
    #[must_use]
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Number of discriminator heads
    #[must_use]
    pub fn num_discriminators(&self) -> usize {
        self.checkpoint.discriminators.len()
    }

    /// Expected coefficients per frame
    #[must_use]
    pub fn ncoef(&self) -> usize {
        self.checkpoint.ncoef
    }

    /// Exposed embedding layer
    #[must_use]
    pub fn layer(&self) -> EmbeddingLayer {
        self.layer
    }

    fn head_forward(head: &HeadWeights, input: &[f32]) -> f32 {
        let mut activations = input.to_vec();
        let last = head.layers.len().saturating_sub(1);
        for (l, layer) in head.layers.iter().enumerate() {
            activations = layer.forward(&activations);
            if l < last {
                relu(&mut activations);
            }
        }
        sigmoid(activations.first().copied().unwrap_or(0.0))
    }
}

impl EmbeddingModel for DiscriminatorModel {
    fn embed(&self, input: &FeatureMatrix) -> EvalResult<Embedding> {
        if input.num_coefs() != self.checkpoint.ncoef {
            return Err(EvalError::InvalidInput(format!(
                "input has {} coefficients per frame, model expects {}",
                input.num_coefs(),
                self.checkpoint.ncoef
            )));
        }

        let pooled = input.stats_pool();
        let mut hidden = self.checkpoint.projection.forward(&pooled);

        if self.layer == EmbeddingLayer::Outer {
            if let Some(output) = &self.checkpoint.output {
                relu(&mut hidden);
                hidden = output.forward(&hidden);
            }
        }

        let embedding = Embedding::new(hidden);
        if !embedding.is_finite() {
            return Err(EvalError::InvalidInput(
                "forward pass produced non-finite values".into(),
            ));
        }
        Ok(embedding)
    }

    fn pairwise_score(&self, concatenated: &[f32]) -> EvalResult<f32> {
        if self.checkpoint.discriminators.is_empty() {
            return Err(EvalError::ModelLoadMismatch(
                "model was loaded without discriminator heads; pair scoring is unavailable".into(),
            ));
        }
        if concatenated.len() != 2 * self.embedding_dim {
            return Err(EvalError::InvalidInput(format!(
                "pair has {} values, expected {}",
                concatenated.len(),
                2 * self.embedding_dim
            )));
        }

        let heads = &self.checkpoint.discriminators;
        let total: f32 = heads
            .iter()
            .map(|head| Self::head_forward(head, concatenated))
            .sum();
        Ok(total / heads.len() as f32)
    }

    fn device(&self) -> Device {
        self.device
    }
}

fn relu(values: &mut [f32]) {
    for v in values {
        *v = v.max(0.0);
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
