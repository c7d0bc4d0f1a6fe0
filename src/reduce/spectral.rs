//! Eigenvalue spectrum of a pairwise score matrix
//!
//! A distance-like matrix produced by a consistent metric keeps its minimum
//! eigenvalue above a bound tied to positive semi-definiteness of the related
//! kernel. Consistently negative minima across repetitions flag a scorer that
//! breaks metric assumptions.

use nalgebra::{DMatrix, SymmetricEigen};
use serde::Serialize;

use crate::error::{EvalError, EvalResult};
use crate::stats::DescriptiveStats;

/// Tolerance for treating a matrix as symmetric
const SYMMETRY_TOLERANCE: f64 = 1e-12;

/// Result of a multi-repetition spectral check
#[derive(Debug, Clone, Serialize)]
pub struct SpectralReport {
    /// Items per repetition
    pub sample_size: usize,
    /// Minimum eigenvalue of each repetition, in order
    pub min_eigenvalues: Vec<f64>,
    /// Statistics over `min_eigenvalues`
    pub summary: DescriptiveStats,
    /// Full spectrum (ascending) of the last repetition
    pub last_spectrum: Vec<f64>,
}

impl SpectralReport {
    /// Number of repetitions run
    #[must_use]
    pub fn repetitions(&self) -> usize {
        self.min_eigenvalues.len()
    }

    /// Repetitions whose minimum eigenvalue fell below zero
    #[must_use]
    pub fn negative_repetitions(&self) -> usize {
        self.min_eigenvalues.iter().filter(|&&v| v < 0.0).count()
    }
}

/// Whether `matrix` equals its transpose within tolerance
#[must_use]
pub fn is_symmetric(matrix: &DMatrix<f64>) -> bool {
    matrix.is_square()
        && (0..matrix.nrows()).all(|i| {
            (i + 1..matrix.ncols())
                .all(|j| (matrix[(i, j)] - matrix[(j, i)]).abs() <= SYMMETRY_TOLERANCE)
        })
}

/// Eigenvalues of a square matrix in ascending order.
///
/// Symmetric matrices use the symmetric solver. Other matrices (directional
/// scores) use the real parts of the complex spectrum.
///
/// # Errors
///
/// Returns [`EvalError::InvalidInput`] for empty, non-square, or non-finite
/// matrices.
pub fn eigenvalues(matrix: &DMatrix<f64>) -> EvalResult<Vec<f64>> {
    if matrix.is_empty() || !matrix.is_square() {
        return Err(EvalError::InvalidInput(format!(
            "eigen-decomposition needs a non-empty square matrix, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(EvalError::InvalidInput(
            "score matrix contains non-finite values".into(),
        ));
    }

    let mut values: Vec<f64> = if is_symmetric(matrix) {
        SymmetricEigen::new(matrix.clone()).eigenvalues.iter().copied().collect()
    } else {
        matrix.complex_eigenvalues().iter().map(|c| c.re).collect()
    };
    values.sort_by(f64::total_cmp);
    Ok(values)
}

/// Smallest eigenvalue (real part) of a square matrix
///
/// # Errors
///
/// See [`eigenvalues`].
pub fn min_eigenvalue(matrix: &DMatrix<f64>) -> EvalResult<f64> {
    eigenvalues(matrix)?
        .first()
        .copied()
        .ok_or_else(|| EvalError::InvalidInput("empty spectrum".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones_zero_diagonal(n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, n, |i, j| if i == j { 0.0 } else { 1.0 })
    }

    #[test]
    fn test_ones_off_diagonal_spectrum() {
        let spectrum = eigenvalues(&ones_zero_diagonal(3)).expect("eig");
        let expected = [-1.0, -1.0, 2.0];
        assert_eq!(spectrum.len(), 3);
        for (got, want) in spectrum.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
        }
        assert!((min_eigenvalue(&ones_zero_diagonal(3)).expect("min") + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_asymmetric_triangular() {
        let m = DMatrix::from_row_slice(2, 2, &[0.0, 0.4, 0.0, 0.0]);
        assert!(!is_symmetric(&m));
        let spectrum = eigenvalues(&m).expect("eig");
        assert!(spectrum.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_asymmetric_real_spectrum() {
        // eigenvalues 3 and -1
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0 + 1e-3, 1.0]);
        let spectrum = eigenvalues(&m).expect("eig");
        assert!((spectrum[0] + 1.0).abs() < 1e-2);
        assert!((spectrum[1] - 3.0).abs() < 1e-2);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(eigenvalues(&DMatrix::<f64>::zeros(0, 0)).is_err());
        assert!(eigenvalues(&DMatrix::<f64>::zeros(2, 3)).is_err());
        let mut m = ones_zero_diagonal(2);
        m[(0, 1)] = f64::NAN;
        assert!(eigenvalues(&m).is_err());
    }

    #[test]
    fn test_report_counts() {
        let report = SpectralReport {
            sample_size: 3,
            min_eigenvalues: vec![-1.0, 0.5, -0.2],
            summary: DescriptiveStats::from_values(&[-1.0, 0.5, -0.2]).expect("stats"),
            last_spectrum: vec![-0.2, 0.1, 0.1],
        };
        assert_eq!(report.repetitions(), 3);
        assert_eq!(report.negative_repetitions(), 2);
    }
}
