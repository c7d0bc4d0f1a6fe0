//! Descriptive statistics and histograms over score sequences

use std::fmt::Write;

use serde::Serialize;

use crate::error::{EvalError, EvalResult};

/// Default histogram bin count
pub const DEFAULT_HISTOGRAM_BINS: usize = 30;

/// Mean, population standard deviation, median, max and min
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DescriptiveStats {
    /// Number of values
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// Median (mean of the two middle values for even counts)
    pub median: f64,
    /// Largest value
    pub max: f64,
    /// Smallest value
    pub min: f64,
}

impl DescriptiveStats {
    /// Summarize `values`. Input order does not matter.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidInput`] when `values` is empty or contains NaN.
    pub fn from_values(values: &[f64]) -> EvalResult<Self> {
        if values.is_empty() {
            return Err(EvalError::InvalidInput(
                "cannot summarize an empty score sequence".into(),
            ));
        }
        if values.iter().any(|v| v.is_nan()) {
            return Err(EvalError::InvalidInput("score sequence contains NaN".into()));
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Ok(Self {
            count: values.len(),
            mean,
            std: variance.sqrt(),
            median,
            max: sorted[sorted.len() - 1],
            min: sorted[0],
        })
    }

    /// Console summary, one statistic per line
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Avg: {}", self.mean);
        let _ = writeln!(out, "Std: {}", self.std);
        let _ = writeln!(out, "Median: {}", self.median);
        let _ = writeln!(out, "Max: {}", self.max);
        let _ = writeln!(out, "Min: {}", self.min);
        out
    }
}

/// Equal-width histogram normalized to a probability density
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `bins + 1` bin edges
    pub edges: Vec<f64>,
    /// Density per bin; `sum(density * width) == 1`
    pub density: Vec<f64>,
    /// Raw count per bin
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Build a density histogram of `values` with `bins` equal-width bins.
    ///
    /// When all values are equal the range is widened to `value ± 0.5`.
    /// The last bin is closed on the right.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidInput`] for zero bins, empty input, or
    /// non-finite values.
    pub fn new(values: &[f64], bins: usize) -> EvalResult<Self> {
        if bins == 0 {
            return Err(EvalError::InvalidInput("histogram needs at least one bin".into()));
        }
        if values.is_empty() {
            return Err(EvalError::InvalidInput("cannot histogram an empty sequence".into()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(EvalError::InvalidInput(
                "histogram input contains non-finite values".into(),
            ));
        }

        let (mut lo, mut hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if (hi - lo).abs() < f64::EPSILON {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

        let mut counts = vec![0usize; bins];
        for &v in values {
            let bin = (((v - lo) / width) as usize).min(bins - 1);
            counts[bin] += 1;
        }

        let total = values.len() as f64;
        let density = counts
            .iter()
            .map(|&c| c as f64 / (total * width))
            .collect();

        Ok(Self {
            edges,
            density,
            counts,
        })
    }

    /// Number of bins
    #[must_use]
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// CSV rendering: `bin_start,bin_end,count,density`
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::from("bin_start,bin_end,count,density\n");
        for (i, (&count, &density)) in self.counts.iter().zip(self.density.iter()).enumerate() {
            let _ = writeln!(
                out,
                "{:.6},{:.6},{},{:.6}",
                self.edges[i],
                self.edges[i + 1],
                count,
                density
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_sequence() {
        let stats = DescriptiveStats::from_values(&[0.7, 0.7, 0.7, 0.7]).expect("stats");
        assert!((stats.mean - 0.7).abs() < 1e-12);
        assert!(stats.std.abs() < 1e-12);
        assert!((stats.median - 0.7).abs() < 1e-12);
        assert!((stats.max - 0.7).abs() < 1e-12);
        assert!((stats.min - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_known_values() {
        let stats = DescriptiveStats::from_values(&[4.0, 1.0, 3.0, 2.0]).expect("stats");
        assert_eq!(stats.count, 4);
        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!((stats.std - 1.25f64.sqrt()).abs() < 1e-12);
        assert!((stats.median - 2.5).abs() < 1e-12);
        assert!((stats.max - 4.0).abs() < 1e-12);
        assert!((stats.min - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_odd_median() {
        let stats = DescriptiveStats::from_values(&[5.0, 1.0, 3.0]).expect("stats");
        assert!((stats.median - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(DescriptiveStats::from_values(&[]).is_err());
        assert!(DescriptiveStats::from_values(&[1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_summary_lines() {
        let stats = DescriptiveStats::from_values(&[1.0]).expect("stats");
        let text = stats.summary();
        assert!(text.starts_with("Avg: 1\n"));
        assert!(text.contains("Min: 1\n"));
    }

    #[test]
    fn test_histogram_density_integrates_to_one() {
        let values: Vec<f64> = (0..100).map(|i| f64::from(i) / 10.0).collect();
        let hist = Histogram::new(&values, 30).expect("hist");
        assert_eq!(hist.bins(), 30);
        assert_eq!(hist.counts.iter().sum::<usize>(), 100);
        let width = hist.edges[1] - hist.edges[0];
        let area: f64 = hist.density.iter().map(|d| d * width).sum();
        assert!((area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_constant_input() {
        let hist = Histogram::new(&[2.0, 2.0], 4).expect("hist");
        assert!((hist.edges[0] - 1.5).abs() < 1e-12);
        assert!((hist.edges[4] - 2.5).abs() < 1e-12);
        assert_eq!(hist.counts.iter().sum::<usize>(), 2);
    }

    #[test]
    fn test_histogram_max_in_last_bin() {
        let hist = Histogram::new(&[0.0, 1.0], 2).expect("hist");
        assert_eq!(hist.counts, vec![1, 1]);
    }

    #[test]
    fn test_histogram_csv() {
        let hist = Histogram::new(&[0.0, 1.0], 2).expect("hist");
        let csv = hist.to_csv();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.starts_with("bin_start,bin_end,count,density\n"));
    }
}
