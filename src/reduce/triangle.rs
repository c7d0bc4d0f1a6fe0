//! Triangle-inequality violations of a learned distance

use nalgebra::DMatrix;
use serde::Serialize;

use crate::error::{EvalError, EvalResult};
use crate::stats::{DescriptiveStats, Histogram};

/// Distribution of violations over all triples of one sample
#[derive(Debug, Clone, Serialize)]
pub struct TriangleReport {
    /// Items in the sample
    pub sample_size: usize,
    /// Triples examined, `C(n, 3)`
    pub triples: usize,
    /// Triples with a strictly positive violation
    pub violated: usize,
    /// Statistics over every triple's violation (zeros included)
    pub stats: DescriptiveStats,
    /// Density histogram of the violations
    pub histogram: Histogram,
    /// Violation per triple in `(i, j, k)` lexicographic order
    #[serde(skip)]
    pub violations: Vec<f64>,
}

impl TriangleReport {
    /// Summarize the per-triple violations of one sample
    ///
    /// # Errors
    ///
    /// Fails when `violations` is empty or `bins` is zero.
    pub fn from_violations(
        sample_size: usize,
        violations: Vec<f64>,
        bins: usize,
    ) -> EvalResult<Self> {
        let stats = DescriptiveStats::from_values(&violations)?;
        let histogram = Histogram::new(&violations, bins)?;
        Ok(Self {
            sample_size,
            triples: violations.len(),
            violated: violations.iter().filter(|&&v| v > 0.0).count(),
            stats,
            histogram,
            violations,
        })
    }

    /// Fraction of triples that violate the inequality
    #[must_use]
    pub fn violation_rate(&self) -> f64 {
        if self.triples == 0 {
            0.0
        } else {
            self.violated as f64 / self.triples as f64
        }
    }
}

/// `max(d(j,k) - d(i,j) - d(i,k), 0)`
#[must_use]
pub fn violation(d_ij: f64, d_ik: f64, d_jk: f64) -> f64 {
    (d_jk - d_ij - d_ik).max(0.0)
}

/// Number of unordered triples in `n` items
#[must_use]
pub fn num_triples(n: usize) -> usize {
    if n < 3 {
        0
    } else {
        n * (n - 1) * (n - 2) / 6
    }
}

/// Violation of every triple `i < j < k` of a distance matrix.
///
/// Distances are read as `d(i,j) = m[(i,j)]`, `d(i,k) = m[(i,k)]`,
/// `d(j,k) = m[(j,k)]`. `on_triple` is called after each triple with the
/// number of triples done so far.
///
/// # Errors
///
/// Returns [`EvalError::InvalidInput`] for non-square matrices or fewer than
/// three items.
pub fn violations<F>(distances: &DMatrix<f64>, mut on_triple: F) -> EvalResult<Vec<f64>>
where
    F: FnMut(usize) -> EvalResult<()>,
{
    let n = distances.nrows();
    if !distances.is_square() {
        return Err(EvalError::InvalidInput(format!(
            "distance matrix must be square, got {}x{}",
            distances.nrows(),
            distances.ncols()
        )));
    }
    if n < 3 {
        return Err(EvalError::InvalidInput(format!(
            "triangle check needs at least 3 items, got {n}"
        )));
    }

    let mut out = Vec::with_capacity(num_triples(n));
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                out.push(violation(
                    distances[(i, j)],
                    distances[(i, k)],
                    distances[(j, k)],
                ));
                on_triple(out.len())?;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(d_ij: f64, d_ik: f64, d_jk: f64) -> DMatrix<f64> {
        DMatrix::from_row_slice(
            3,
            3,
            &[0.0, d_ij, d_ik, d_ij, 0.0, d_jk, d_ik, d_jk, 0.0],
        )
    }

    #[test]
    fn test_equilateral_no_violation() {
        assert!(violation(1.0, 1.0, 1.0).abs() < f64::EPSILON);
        let v = violations(&triangle(1.0, 1.0, 1.0), |_| Ok(())).expect("triples");
        assert_eq!(v, vec![0.0]);
    }

    #[test]
    fn test_violation_of_three() {
        assert!((violation(1.0, 1.0, 5.0) - 3.0).abs() < f64::EPSILON);
        let v = violations(&triangle(1.0, 1.0, 5.0), |_| Ok(())).expect("triples");
        assert_eq!(v, vec![3.0]);
    }

    #[test]
    fn test_equality_case_is_not_a_violation() {
        assert!(violation(1.0, 1.0, 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_num_triples() {
        assert_eq!(num_triples(2), 0);
        assert_eq!(num_triples(3), 1);
        assert_eq!(num_triples(5), 10);
    }

    #[test]
    fn test_counts_every_triple_and_reports_progress() {
        let m = DMatrix::from_element(5, 5, 0.5);
        let mut calls = Vec::new();
        let v = violations(&m, |done| {
            calls.push(done);
            Ok(())
        })
        .expect("triples");
        assert_eq!(v.len(), 10);
        assert_eq!(calls, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_callback_error_aborts() {
        let m = DMatrix::from_element(4, 4, 0.5);
        let result = violations(&m, |done| {
            if done == 2 {
                Err(EvalError::InvalidInput("stop".into()))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_too_small() {
        assert!(violations(&DMatrix::zeros(2, 2), |_| Ok(())).is_err());
    }

    #[test]
    fn test_violation_rate() {
        let report =
            TriangleReport::from_violations(4, vec![0.0, 0.0, 0.0, 3.0], 5).expect("report");
        assert_eq!(report.triples, 4);
        assert_eq!(report.violated, 1);
        assert!((report.violation_rate() - 0.25).abs() < f64::EPSILON);
    }
}
