//! JSON checkpoint format
//!
//! ```json
//! {
//!   "ncoef": 23,
//!   "latent_size": 256,
//!   "projection": { "weights": [[...], ...], "bias": [...] },
//!   "output": { "weights": [[...], ...], "bias": [...] },
//!   "discriminators": [ { "layers": [ { "weights": ..., "bias": ... } ] } ]
//! }
//! ```
//!
//! `weights` are `out x in` row-major. `output` and `discriminators` are
//! optional when loading permissively.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::LoadMode;
use crate::error::{EvalError, EvalResult};

/// Top-level keys a checkpoint may carry
pub const KNOWN_KEYS: [&str; 6] = [
    "arch",
    "ncoef",
    "latent_size",
    "projection",
    "output",
    "discriminators",
];

/// Dense layer weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearWeights {
    /// `out x in` weight rows
    pub weights: Vec<Vec<f32>>,
    /// Bias, one per output
    pub bias: Vec<f32>,
}

impl LinearWeights {
    /// Output width
    #[must_use]
    pub fn out_dim(&self) -> usize {
        self.weights.len()
    }

    /// Input width (zero for an empty layer)
    #[must_use]
    pub fn in_dim(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    /// Check the layer maps `expected_in` inputs, with consistent rows and bias.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ModelLoadMismatch`] naming `name` on any mismatch.
    pub fn validate(&self, name: &str, expected_in: usize) -> EvalResult<()> {
        if self.weights.is_empty() {
            return Err(EvalError::ModelLoadMismatch(format!("{name}: empty weight matrix")));
        }
        if let Some(row) = self.weights.iter().position(|r| r.len() != expected_in) {
            return Err(EvalError::ModelLoadMismatch(format!(
                "{name}: row {row} has {} inputs, expected {expected_in}",
                self.weights[row].len()
            )));
        }
        if self.bias.len() != self.out_dim() {
            return Err(EvalError::ModelLoadMismatch(format!(
                "{name}: bias has {} entries, expected {}",
                self.bias.len(),
                self.out_dim()
            )));
        }
        Ok(())
    }

    /// `W x + b`
    #[must_use]
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .zip(self.bias.iter())
            .map(|(row, &b)| row.iter().zip(input).map(|(&w, &x)| w * x).sum::<f32>() + b)
            .collect()
    }
}

/// One discriminator head: dense layers with ReLU between them, ending in a
/// single logit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadWeights {
    /// Layers in forward order
    pub layers: Vec<LinearWeights>,
}

/// Deserialized checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Free-form architecture tag
    #[serde(default)]
    pub arch: Option<String>,
    /// Feature coefficients per frame
    pub ncoef: usize,
    /// Inner embedding width
    pub latent_size: usize,
    /// Pooled statistics to inner embedding
    pub projection: LinearWeights,
    /// Inner embedding to outer embedding
    #[serde(default)]
    pub output: Option<LinearWeights>,
    /// Discriminator heads; scores are averaged across heads
    #[serde(default)]
    pub discriminators: Vec<HeadWeights>,
}

impl Checkpoint {
    /// Read and parse a checkpoint file
    ///
    /// # Errors
    ///
    /// I/O and JSON errors, and [`EvalError::ModelLoadMismatch`] for unknown
    /// keys in strict mode.
    pub fn from_path(path: &Path, mode: LoadMode) -> EvalResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text, mode)
    }

    /// Parse a checkpoint from JSON text
    ///
    /// # Errors
    ///
    /// See [`Checkpoint::from_path`].
    pub fn from_json(text: &str, mode: LoadMode) -> EvalResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let object = value.as_object().ok_or_else(|| {
            EvalError::ModelLoadMismatch("checkpoint root must be a JSON object".into())
        })?;

        let unknown: Vec<&str> = object
            .keys()
            .map(String::as_str)
            .filter(|k| !KNOWN_KEYS.contains(k))
            .collect();
        if !unknown.is_empty() {
            match mode {
                LoadMode::Strict => {
                    return Err(EvalError::ModelLoadMismatch(format!(
                        "unexpected keys in checkpoint: {}",
                        unknown.join(", ")
                    )))
                }
                LoadMode::Permissive => {
                    warn!(keys = ?unknown, "ignoring unexpected checkpoint keys");
                }
            }
        }

        serde_json::from_value(value)
            .map_err(|e| EvalError::ModelLoadMismatch(format!("malformed checkpoint: {e}")))
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn to_json(&self) -> EvalResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(out: usize, inp: usize, value: f32) -> LinearWeights {
        LinearWeights {
            weights: vec![vec![value; inp]; out],
            bias: vec![0.0; out],
        }
    }

    #[test]
    fn test_linear_forward() {
        let l = LinearWeights {
            weights: vec![vec![1.0, 2.0], vec![0.0, -1.0]],
            bias: vec![0.5, 0.0],
        };
        assert_eq!(l.forward(&[1.0, 1.0]), vec![3.5, -1.0]);
    }

    #[test]
    fn test_linear_validate() {
        let l = layer(3, 4, 0.1);
        assert!(l.validate("projection", 4).is_ok());
        assert!(l.validate("projection", 5).is_err());

        let mut bad_bias = layer(3, 4, 0.1);
        bad_bias.bias.pop();
        assert!(bad_bias.validate("projection", 4).is_err());
    }

    #[test]
    fn test_strict_rejects_unknown_keys() {
        let text = r#"{"ncoef":1,"latent_size":1,"projection":{"weights":[[1.0,1.0]],"bias":[0.0]},"optimizer_state":{}}"#;
        let err = Checkpoint::from_json(text, LoadMode::Strict).expect_err("unknown key");
        assert!(err.to_string().contains("optimizer_state"));

        let ckpt = Checkpoint::from_json(text, LoadMode::Permissive).expect("permissive");
        assert_eq!(ckpt.latent_size, 1);
        assert!(ckpt.discriminators.is_empty());
    }

    #[test]
    fn test_missing_required_key() {
        let text = r#"{"ncoef":1,"latent_size":1}"#;
        let err = Checkpoint::from_json(text, LoadMode::Permissive).expect_err("no projection");
        assert!(matches!(err, EvalError::ModelLoadMismatch(_)));
    }

    #[test]
    fn test_json_roundtrip() {
        let ckpt = Checkpoint {
            arch: Some("resnet_lstm".into()),
            ncoef: 2,
            latent_size: 3,
            projection: layer(3, 4, 0.2),
            output: None,
            discriminators: vec![HeadWeights {
                layers: vec![layer(1, 6, 0.1)],
            }],
        };
        let text = ckpt.to_json().expect("serialize");
        let back = Checkpoint::from_json(&text, LoadMode::Strict).expect("parse");
        assert_eq!(back, ckpt);
    }
}
