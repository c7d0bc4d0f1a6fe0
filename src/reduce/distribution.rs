//! Score distribution: descriptive statistics and histogram over all pairs

use nalgebra::DMatrix;
use serde::Serialize;

use crate::error::EvalResult;
use crate::scorer::ScoreMode;
use crate::stats::{DescriptiveStats, Histogram};

/// Distribution of pair scores over one sample
#[derive(Debug, Clone, Serialize)]
pub struct ScoreDistributionReport {
    /// Items in the sample
    pub sample_size: usize,
    /// Scoring mode used
    pub mode: ScoreMode,
    /// Pairs scored
    pub pairs: usize,
    /// Statistics over the pair scores
    pub stats: DescriptiveStats,
    /// Density histogram of the pair scores
    pub histogram: Histogram,
    /// Pair scores in row-major pair order
    #[serde(skip)]
    pub scores: Vec<f64>,
}

/// Off-diagonal entries of a score matrix.
///
/// Symmetric matrices yield each unordered pair once (upper triangle);
/// otherwise every ordered pair is returned.
#[must_use]
pub fn pair_scores(matrix: &DMatrix<f64>, symmetric: bool) -> Vec<f64> {
    let n = matrix.nrows().min(matrix.ncols());
    let mut out = Vec::with_capacity(n * n.saturating_sub(1));
    for i in 0..n {
        for j in 0..n {
            if i == j || (symmetric && j < i) {
                continue;
            }
            out.push(matrix[(i, j)]);
        }
    }
    out
}

/// Summarize the pair scores of `matrix`
///
/// # Errors
///
/// Fails when there are no pairs (fewer than two items) or `bins` is zero.
pub fn summarize(
    matrix: &DMatrix<f64>,
    mode: ScoreMode,
    bins: usize,
) -> EvalResult<ScoreDistributionReport> {
    let scores = pair_scores(matrix, mode.is_symmetric());
    let stats = DescriptiveStats::from_values(&scores)?;
    let histogram = Histogram::new(&scores, bins)?;
    Ok(ScoreDistributionReport {
        sample_size: matrix.nrows(),
        mode,
        pairs: scores.len(),
        stats,
        histogram,
        scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_scores_directional() {
        let m = DMatrix::from_row_slice(2, 2, &[0.0, 0.3, 0.7, 0.0]);
        assert_eq!(pair_scores(&m, false), vec![0.3, 0.7]);
    }

    #[test]
    fn test_pair_scores_symmetric() {
        let m = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 2.0, 1.0, 0.0, 3.0, 2.0, 3.0, 0.0]);
        assert_eq!(pair_scores(&m, true), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_summarize_constant() {
        let m = DMatrix::from_fn(3, 3, |i, j| if i == j { 0.0 } else { 0.4 });
        let report = summarize(&m, ScoreMode::Directional, 10).expect("summary");
        assert_eq!(report.pairs, 6);
        assert!((report.stats.mean - 0.4).abs() < 1e-12);
        assert!(report.stats.std.abs() < 1e-12);
    }

    #[test]
    fn test_summarize_single_item_fails() {
        let m = DMatrix::zeros(1, 1);
        assert!(summarize(&m, ScoreMode::Directional, 10).is_err());
    }
}
