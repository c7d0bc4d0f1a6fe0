//! Embedding vectors
//!
//! An [`Embedding`] is the fixed-length vector a model produces for one item.
//! It is immutable once produced; the evaluator shares it between pairs through
//! the embedding cache.

use serde::{Deserialize, Serialize};

/// Embedding vector for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    vector: Vec<f32>,
}

impl Embedding {
    /// Create an embedding from a vector
    #[must_use]
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }

    /// Get the embedding vector
    #[must_use]
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    /// Get embedding dimension
    #[must_use]
    pub fn dim(&self) -> usize {
        self.vector.len()
    }

    /// Whether every component is finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.vector.iter().all(|v| v.is_finite())
    }

    /// Concatenate `self` and `other` in that order.
    ///
    /// The order matters: discriminator heads are not commutative.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Vec<f32> {
        let mut joined = Vec::with_capacity(self.dim() + other.dim());
        joined.extend_from_slice(&self.vector);
        joined.extend_from_slice(&other.vector);
        joined
    }

    /// Squared Euclidean distance to another embedding
    #[must_use]
    pub fn squared_distance(&self, other: &Self) -> f32 {
        if self.vector.len() != other.vector.len() {
            return f32::MAX;
        }

        self.vector
            .iter()
            .zip(other.vector.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum()
    }

    /// Compute mean of multiple embeddings
    #[must_use]
    pub fn mean(embeddings: &[&Self]) -> Option<Self> {
        let first = embeddings.first()?;
        let dim = first.dim();
        if embeddings.iter().any(|e| e.dim() != dim) {
            return None;
        }

        let mut mean_vec = vec![0.0f32; dim];
        for embedding in embeddings {
            for (acc, &val) in mean_vec.iter_mut().zip(embedding.vector.iter()) {
                *acc += val;
            }
        }

        let n = embeddings.len() as f32;
        for val in &mut mean_vec {
            *val /= n;
        }

        Some(Self::new(mean_vec))
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vector: Vec<f32>) -> Self {
        Self::new(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_new() {
        let emb = Embedding::new(vec![0.1; 128]);
        assert_eq!(emb.dim(), 128);
        assert!(emb.is_finite());
    }

    #[test]
    fn test_concat_preserves_order() {
        let a = Embedding::new(vec![1.0, 2.0]);
        let b = Embedding::new(vec![3.0]);
        assert_eq!(a.concat(&b), vec![1.0, 2.0, 3.0]);
        assert_eq!(b.concat(&a), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_squared_distance_dim_mismatch() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![1.0, 0.0, 0.0]);
        assert_eq!(a.squared_distance(&b), f32::MAX);
    }

    #[test]
    fn test_squared_distance() {
        let a = Embedding::new(vec![0.0, 0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0, 0.0]);
        assert!((a.squared_distance(&b) - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_is_finite_detects_nan() {
        let emb = Embedding::new(vec![0.0, f32::NAN]);
        assert!(!emb.is_finite());
    }

    #[test]
    fn test_mean() {
        let a = Embedding::new(vec![1.0, 2.0, 3.0]);
        let b = Embedding::new(vec![3.0, 4.0, 5.0]);
        let mean = Embedding::mean(&[&a, &b]).expect("should compute mean");
        assert_eq!(mean.vector(), &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_mean_empty() {
        assert!(Embedding::mean(&[]).is_none());
    }
}
