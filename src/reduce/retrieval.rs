//! Recall@K retrieval check
//!
//! Every item is used as a query once; the remaining items are ranked by
//! descending similarity and a query scores a hit at K when an item with its
//! label appears in the first K.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use serde::Serialize;

use crate::error::{EvalError, EvalResult};

/// Recall@K over all queries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalReport {
    /// Number of queries
    pub queries: usize,
    /// Hit count per K
    pub hits: BTreeMap<usize, usize>,
    /// Hit count divided by queries, per K
    pub recall: BTreeMap<usize, f64>,
}

impl RetrievalReport {
    /// Recall at `k`, if it was requested
    #[must_use]
    pub fn recall_at(&self, k: usize) -> Option<f64> {
        self.recall.get(&k).copied()
    }
}

/// Compute recall@K from a similarity matrix (higher = more similar).
///
/// Ties are broken by item position. K values larger than the number of
/// candidates behave like "all candidates".
///
/// # Errors
///
/// Returns [`EvalError::InvalidInput`] for an empty or zero K list, a
/// non-square matrix, a label count that does not match, or fewer than two
/// items.
pub fn recall_at_k<L: PartialEq>(
    similarity: &DMatrix<f64>,
    labels: &[L],
    ks: &[usize],
) -> EvalResult<RetrievalReport> {
    if ks.is_empty() {
        return Err(EvalError::InvalidInput("no K values requested".into()));
    }
    if ks.contains(&0) {
        return Err(EvalError::InvalidInput("K must be at least 1".into()));
    }
    let n = similarity.nrows();
    if !similarity.is_square() || n != labels.len() {
        return Err(EvalError::InvalidInput(format!(
            "similarity matrix {}x{} does not match {} labels",
            similarity.nrows(),
            similarity.ncols(),
            labels.len()
        )));
    }
    if n < 2 {
        return Err(EvalError::InvalidInput(
            "retrieval needs at least two items".into(),
        ));
    }

    let mut ks = ks.to_vec();
    ks.sort_unstable();
    ks.dedup();

    let mut hits: BTreeMap<usize, usize> = ks.iter().map(|&k| (k, 0)).collect();

    for query in 0..n {
        let mut candidates: Vec<usize> = (0..n).filter(|&c| c != query).collect();
        // stable sort keeps position order among equal scores
        candidates.sort_by(|&a, &b| similarity[(query, b)].total_cmp(&similarity[(query, a)]));

        let first_match = candidates
            .iter()
            .position(|&c| labels[c] == labels[query]);

        if let Some(rank) = first_match {
            for &k in &ks {
                if rank < k {
                    if let Some(count) = hits.get_mut(&k) {
                        *count += 1;
                    }
                }
            }
        }
    }

    let recall = hits
        .iter()
        .map(|(&k, &h)| (k, h as f64 / n as f64))
        .collect();

    Ok(RetrievalReport {
        queries: n,
        hits,
        recall,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_neighbor_same_label_hits_r1() {
        // item 0 is closest to item 1 (same label), item 2 is another label
        let sim = DMatrix::from_row_slice(
            3,
            3,
            &[0.0, 0.9, 0.1, 0.9, 0.0, 0.2, 0.1, 0.2, 0.0],
        );
        let labels = ["a", "a", "b"];
        let report = recall_at_k(&sim, &labels, &[1, 2]).expect("recall");
        assert_eq!(report.queries, 3);
        // queries 0 and 1 hit at 1; query 2 has no same-label item
        assert_eq!(report.hits[&1], 2);
        assert_eq!(report.hits[&2], 2);
        assert!((report.recall_at(1).expect("k=1") - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_match_at_rank_two() {
        let sim = DMatrix::from_row_slice(
            3,
            3,
            &[0.0, 0.3, 0.8, 0.3, 0.0, 0.1, 0.8, 0.1, 0.0],
        );
        let labels = [1, 1, 2];
        let report = recall_at_k(&sim, &labels, &[1, 2]).expect("recall");
        // query 0: ranked [2, 1] -> same label at rank 2
        // query 1: ranked [0, 2] -> hit at rank 1
        assert_eq!(report.hits[&1], 1);
        assert_eq!(report.hits[&2], 2);
    }

    #[test]
    fn test_large_k_and_dedup() {
        let sim = DMatrix::from_element(2, 2, 0.5);
        let report = recall_at_k(&sim, &["x", "x"], &[8, 8, 1]).expect("recall");
        assert_eq!(report.hits.len(), 2);
        assert!((report.recall_at(8).expect("k=8") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_inputs() {
        let sim = DMatrix::from_element(2, 2, 0.5);
        assert!(recall_at_k(&sim, &["x", "x"], &[]).is_err());
        assert!(recall_at_k(&sim, &["x", "x"], &[0]).is_err());
        assert!(recall_at_k(&sim, &["x"], &[1]).is_err());
        assert!(recall_at_k(&DMatrix::from_element(1, 1, 0.0), &["x"], &[1]).is_err());
    }
}
