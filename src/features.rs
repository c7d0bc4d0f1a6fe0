//! Feature matrices and frame preparation
//!
//! Raw features arrive as `frames x coefficients` matrices (Kaldi layout).
//! Before any embedding call they are brought to a fixed number of frames with
//! [`prepare`]: short inputs are tiled along the frame axis, then every input is
//! cut to exactly `min_frames` frames.

use crate::error::{EvalError, EvalResult};

/// Default number of frames fed to the model
pub const DEFAULT_MIN_FRAMES: usize = 100;

/// Dense row-major feature matrix, one row per frame
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Vec<f32>,
    num_frames: usize,
    num_coefs: usize,
}

impl FeatureMatrix {
    /// Build a matrix from row-major data.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidInput`] when `data.len()` is not
    /// `num_frames * num_coefs`.
    pub fn new(data: Vec<f32>, num_frames: usize, num_coefs: usize) -> EvalResult<Self> {
        if data.len() != num_frames * num_coefs {
            return Err(EvalError::InvalidInput(format!(
                "feature data has {} values, expected {num_frames}x{num_coefs}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            num_frames,
            num_coefs,
        })
    }

    /// Build a matrix from frame rows; all rows must have the same length.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidInput`] on ragged rows.
    pub fn from_rows(rows: &[Vec<f32>]) -> EvalResult<Self> {
        let num_coefs = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != num_coefs) {
            return Err(EvalError::InvalidInput(format!(
                "frame {bad} has {} coefficients, expected {num_coefs}",
                rows[bad].len()
            )));
        }
        let data = rows.iter().flatten().copied().collect();
        Self::new(data, rows.len(), num_coefs)
    }

    /// Number of frames (rows)
    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Number of coefficients per frame (columns)
    #[must_use]
    pub fn num_coefs(&self) -> usize {
        self.num_coefs
    }

    /// One frame
    #[must_use]
    pub fn frame(&self, index: usize) -> &[f32] {
        let start = index * self.num_coefs;
        &self.data[start..start + self.num_coefs]
    }

    /// Iterate over frames
    pub fn frames(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on zero, and a zero-width matrix has no frame data
        self.data.chunks_exact(self.num_coefs.max(1))
    }

    /// Raw row-major data
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Statistics pooling: per-coefficient mean followed by per-coefficient
    /// population standard deviation over all frames.
    #[must_use]
    pub fn stats_pool(&self) -> Vec<f32> {
        let mut means = vec![0.0f32; self.num_coefs];
        let mut stds = vec![0.0f32; self.num_coefs];

        if self.num_frames == 0 {
            means.extend(stds);
            return means;
        }

        for frame in self.frames() {
            for (acc, &val) in means.iter_mut().zip(frame) {
                *acc += val;
            }
        }
        let n = self.num_frames as f32;
        for mean in &mut means {
            *mean /= n;
        }

        for frame in self.frames() {
            for ((acc, &val), &mean) in stds.iter_mut().zip(frame).zip(means.iter()) {
                let diff = val - mean;
                *acc += diff * diff;
            }
        }
        for std in &mut stds {
            *std = (*std / n).sqrt();
        }

        means.extend(stds);
        means
    }
}

/// Bring `raw` to exactly `min_frames` frames.
///
/// Inputs shorter than `min_frames` are tiled `ceil(min_frames / frames)` times
/// along the frame axis; the result (or any longer input) is truncated to the
/// first `min_frames` frames.
///
/// # Errors
///
/// Returns [`EvalError::InvalidInput`] when `raw` has no frames or
/// `min_frames` is zero.
pub fn prepare(raw: &FeatureMatrix, min_frames: usize) -> EvalResult<FeatureMatrix> {
    if min_frames == 0 {
        return Err(EvalError::InvalidInput("min_frames must be positive".into()));
    }
    if raw.num_frames() == 0 {
        return Err(EvalError::InvalidInput(
            "cannot prepare a feature matrix with zero frames".into(),
        ));
    }

    let frames = raw.num_frames();
    let data = if frames < min_frames {
        let repeats = min_frames.div_ceil(frames);
        let mut tiled = Vec::with_capacity(repeats * raw.as_slice().len());
        for _ in 0..repeats {
            tiled.extend_from_slice(raw.as_slice());
        }
        tiled.truncate(min_frames * raw.num_coefs());
        tiled
    } else {
        raw.as_slice()[..min_frames * raw.num_coefs()].to_vec()
    };

    FeatureMatrix::new(data, min_frames, raw.num_coefs())
}
