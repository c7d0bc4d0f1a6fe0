//! Pair scoring
//!
//! Wraps a model's discriminator head into a direction-aware pair score.
//! Self-pairs are the caller's responsibility to skip.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::error::{EvalError, EvalResult};
use crate::model::EmbeddingModel;

/// How the two directions of a pair are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    /// One head call on `[emb_i, emb_j]`
    Directional,
    /// Mean of the `[emb_i, emb_j]` and `[emb_j, emb_i]` calls
    Symmetrized,
}

impl ScoreMode {
    /// Whether `score(i, j) == score(j, i)` holds by construction
    #[must_use]
    pub const fn is_symmetric(self) -> bool {
        matches!(self, Self::Symmetrized)
    }
}

impl fmt::Display for ScoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directional => write!(f, "directional"),
            Self::Symmetrized => write!(f, "symmetrized"),
        }
    }
}

impl FromStr for ScoreMode {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "directional" => Ok(Self::Directional),
            "symmetrized" | "symmetric" => Ok(Self::Symmetrized),
            other => Err(EvalError::InvalidInput(format!(
                "unknown score mode '{other}', expected directional or symmetrized"
            ))),
        }
    }
}

/// Transform applied to the head output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTransform {
    /// Raw head output ("same speaker" probability)
    #[default]
    Similarity,
    /// `1 - score`, turning a same-class probability into a distance
    Distance,
}

impl ScoreTransform {
    /// Apply the transform to a raw score
    #[must_use]
    pub fn apply(self, score: f64) -> f64 {
        match self {
            Self::Similarity => score,
            Self::Distance => 1.0 - score,
        }
    }
}

/// Scores embedding pairs through a model's discriminator head
pub struct PairwiseScorer<'m, M: ?Sized> {
    model: &'m M,
    mode: ScoreMode,
    transform: ScoreTransform,
}

impl<M: ?Sized> Clone for PairwiseScorer<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: ?Sized> Copy for PairwiseScorer<'_, M> {}

impl<'m, M: EmbeddingModel + ?Sized> PairwiseScorer<'m, M> {
    /// Create a scorer over `model`
    #[must_use]
    pub fn new(model: &'m M, mode: ScoreMode, transform: ScoreTransform) -> Self {
        Self {
            model,
            mode,
            transform,
        }
    }

    /// Scoring mode
    #[must_use]
    pub fn mode(&self) -> ScoreMode {
        self.mode
    }

    /// Output transform
    #[must_use]
    pub fn transform(&self) -> ScoreTransform {
        self.transform
    }

    /// Raw head output for the ordered pair `(a, b)`
    ///
    /// # Errors
    ///
    /// Propagates model errors.
    pub fn directional(&self, a: &Embedding, b: &Embedding) -> EvalResult<f64> {
        Ok(f64::from(self.model.pairwise_score(&a.concat(b))?))
    }

    /// Score the pair according to mode and transform
    ///
    /// # Errors
    ///
    /// Propagates model errors.
    pub fn score(&self, a: &Embedding, b: &Embedding) -> EvalResult<f64> {
        let raw = match self.mode {
            ScoreMode::Directional => self.directional(a, b)?,
            ScoreMode::Symmetrized => (self.directional(a, b)? + self.directional(b, a)?) / 2.0,
        };
        Ok(self.transform.apply(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureMatrix;

    /// Head returns the first component of the first embedding
    struct FirstComponent;

    impl EmbeddingModel for FirstComponent {
        fn embed(&self, _input: &FeatureMatrix) -> EvalResult<Embedding> {
            Ok(Embedding::new(vec![0.0]))
        }

        fn pairwise_score(&self, concatenated: &[f32]) -> EvalResult<f32> {
            Ok(concatenated[0])
        }
    }

    #[test]
    fn test_directional() {
        let scorer = PairwiseScorer::new(
            &FirstComponent,
            ScoreMode::Directional,
            ScoreTransform::Similarity,
        );
        let a = Embedding::new(vec![0.25]);
        let b = Embedding::new(vec![0.75]);
        assert!((scorer.score(&a, &b).expect("score") - 0.25).abs() < 1e-9);
        assert!((scorer.score(&b, &a).expect("score") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_symmetrized() {
        let scorer = PairwiseScorer::new(
            &FirstComponent,
            ScoreMode::Symmetrized,
            ScoreTransform::Similarity,
        );
        let a = Embedding::new(vec![0.25]);
        let b = Embedding::new(vec![0.75]);
        let ab = scorer.score(&a, &b).expect("score");
        let ba = scorer.score(&b, &a).expect("score");
        assert!((ab - 0.5).abs() < 1e-9);
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn test_distance_transform() {
        let scorer = PairwiseScorer::new(
            &FirstComponent,
            ScoreMode::Directional,
            ScoreTransform::Distance,
        );
        let a = Embedding::new(vec![0.25]);
        let b = Embedding::new(vec![0.75]);
        assert!((scorer.score(&a, &b).expect("score") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Directional".parse::<ScoreMode>().ok(), Some(ScoreMode::Directional));
        assert_eq!("symmetric".parse::<ScoreMode>().ok(), Some(ScoreMode::Symmetrized));
        assert!("both".parse::<ScoreMode>().is_err());
        assert!(ScoreMode::Symmetrized.is_symmetric());
    }
}
