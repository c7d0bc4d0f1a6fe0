//! K-means clustering of embeddings and normalized mutual information
//!
//! The clustering check embeds the whole labeled population, partitions it
//! with k-means and compares the partition to the labels with NMI
//! (arithmetic-mean normalization).

use std::collections::HashMap;
use std::hash::Hash;

use rand::Rng;
use serde::Serialize;

use crate::embedding::Embedding;
use crate::error::{EvalError, EvalResult};

/// Result of the clustering check
#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    /// Items clustered
    pub items: usize,
    /// Number of clusters requested
    pub clusters: usize,
    /// Number of distinct labels
    pub label_classes: usize,
    /// NMI between the k-means partition and the labels
    pub nmi: f64,
    /// Sum of squared distances to assigned centroids
    pub inertia: f64,
    /// Iterations until convergence (or the iteration cap)
    pub iterations: usize,
}

/// K-means configuration
#[derive(Debug, Clone)]
pub struct KMeans {
    /// Number of clusters
    pub k: usize,
    /// Iteration cap
    pub max_iterations: usize,
}

/// Fitted partition
#[derive(Debug, Clone)]
pub struct KMeansFit {
    /// Cluster index per point
    pub labels: Vec<usize>,
    /// Final centroids
    pub centroids: Vec<Embedding>,
    /// Sum of squared distances to assigned centroids
    pub inertia: f64,
    /// Iterations run
    pub iterations: usize,
}

impl KMeans {
    /// Create k-means with the default iteration cap
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: 300,
        }
    }

    /// Partition `points`; initial centroids are `k` distinct points drawn
    /// from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidInput`] when `k` is zero or exceeds the
    /// number of points, or when points differ in dimension.
    pub fn fit<R: Rng + ?Sized>(
        &self,
        points: &[&Embedding],
        rng: &mut R,
    ) -> EvalResult<KMeansFit> {
        let n = points.len();
        if self.k == 0 || self.k > n {
            return Err(EvalError::InvalidInput(format!(
                "invalid number of clusters {} for {n} points",
                self.k
            )));
        }
        let dim = points[0].dim();
        if points.iter().any(|p| p.dim() != dim) {
            return Err(EvalError::InvalidInput(
                "embeddings have inconsistent dimensions".into(),
            ));
        }

        let mut centroids: Vec<Embedding> = rand::seq::index::sample(rng, n, self.k)
            .iter()
            .map(|i| points[i].clone())
            .collect();
        let mut labels = vec![usize::MAX; n];
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            let mut changed = false;

            // Assign points to nearest centroid
            for (i, point) in points.iter().enumerate() {
                let best = nearest(point, &centroids).0;
                if labels[i] != best {
                    labels[i] = best;
                    changed = true;
                }
            }

            if !changed {
                break;
            }

            // Update centroids; an empty cluster keeps its previous centroid
            for (j, centroid) in centroids.iter_mut().enumerate() {
                let members: Vec<&Embedding> = labels
                    .iter()
                    .zip(points.iter())
                    .filter(|(&l, _)| l == j)
                    .map(|(_, &p)| p)
                    .collect();
                if let Some(mean) = Embedding::mean(&members) {
                    *centroid = mean;
                }
            }
        }

        let inertia = points
            .iter()
            .map(|p| f64::from(nearest(p, &centroids).1))
            .sum();

        Ok(KMeansFit {
            labels,
            centroids,
            inertia,
            iterations,
        })
    }
}

fn nearest(point: &Embedding, centroids: &[Embedding]) -> (usize, f32) {
    let mut best = (0, f32::MAX);
    for (j, centroid) in centroids.iter().enumerate() {
        let dist = point.squared_distance(centroid);
        if dist < best.1 {
            best = (j, dist);
        }
    }
    best
}

/// Map arbitrary labels to dense indices in first-seen order
#[must_use]
pub fn encode_labels<L: Eq + Hash + Clone>(labels: &[L]) -> (Vec<usize>, usize) {
    let mut ids: HashMap<L, usize> = HashMap::new();
    let encoded = labels
        .iter()
        .map(|l| {
            let next = ids.len();
            *ids.entry(l.clone()).or_insert(next)
        })
        .collect();
    (encoded, ids.len())
}

fn entropy(counts: &HashMap<usize, usize>, n: f64) -> f64 {
    counts
        .values()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum()
}

/// Normalized mutual information with arithmetic-mean normalization.
///
/// Two single-cluster labelings are a perfect match (NMI = 1).
///
/// # Errors
///
/// Returns [`EvalError::InvalidInput`] for empty or unequal-length inputs.
pub fn normalized_mutual_info(a: &[usize], b: &[usize]) -> EvalResult<f64> {
    if a.is_empty() || a.len() != b.len() {
        return Err(EvalError::InvalidInput(format!(
            "labelings must be non-empty and equal length ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    let n = a.len() as f64;

    let mut count_a: HashMap<usize, usize> = HashMap::new();
    let mut count_b: HashMap<usize, usize> = HashMap::new();
    let mut joint: HashMap<(usize, usize), usize> = HashMap::new();
    for (&x, &y) in a.iter().zip(b) {
        *count_a.entry(x).or_default() += 1;
        *count_b.entry(y).or_default() += 1;
        *joint.entry((x, y)).or_default() += 1;
    }

    if count_a.len() == 1 && count_b.len() == 1 {
        return Ok(1.0);
    }

    let mutual_info: f64 = joint
        .iter()
        .map(|(&(x, y), &c)| {
            let c = c as f64;
            let ca = count_a[&x] as f64;
            let cb = count_b[&y] as f64;
            (c / n) * (n * c / (ca * cb)).ln()
        })
        .sum();

    let normalizer = ((entropy(&count_a, n) + entropy(&count_b, n)) / 2.0).max(f64::EPSILON);
    Ok((mutual_info / normalizer).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_nmi_identical() {
        let labels = [0, 0, 1, 1, 2, 2];
        let nmi = normalized_mutual_info(&labels, &labels).expect("nmi");
        assert!((nmi - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nmi_permuted_labels() {
        let a = [0, 0, 1, 1];
        let b = [5, 5, 3, 3];
        assert!((normalized_mutual_info(&a, &b).expect("nmi") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nmi_independent() {
        let a = [0, 0, 1, 1];
        let b = [0, 1, 0, 1];
        assert!(normalized_mutual_info(&a, &b).expect("nmi").abs() < 1e-12);
    }

    #[test]
    fn test_nmi_single_clusters() {
        assert!((normalized_mutual_info(&[0, 0], &[3, 3]).expect("nmi") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nmi_invalid() {
        assert!(normalized_mutual_info(&[], &[]).is_err());
        assert!(normalized_mutual_info(&[0], &[0, 1]).is_err());
    }

    #[test]
    fn test_encode_labels() {
        let (encoded, classes) = encode_labels(&["spk2", "spk1", "spk2"]);
        assert_eq!(encoded, vec![0, 1, 0]);
        assert_eq!(classes, 2);
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let points: Vec<Embedding> = [
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
        ]
        .iter()
        .map(|p| Embedding::new(p.to_vec()))
        .collect();
        let refs: Vec<&Embedding> = points.iter().collect();

        let fit = KMeans::new(2)
            .fit(&refs, &mut StdRng::seed_from_u64(3))
            .expect("fit");
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[0], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_ne!(fit.labels[0], fit.labels[3]);
        assert!(fit.inertia < 0.1);

        let truth = [0, 0, 0, 1, 1, 1];
        let nmi = normalized_mutual_info(&fit.labels, &truth).expect("nmi");
        assert!((nmi - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_kmeans_invalid_k() {
        let p = Embedding::new(vec![1.0]);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(KMeans::new(0).fit(&[&p], &mut rng).is_err());
        assert!(KMeans::new(2).fit(&[&p], &mut rng).is_err());
    }
}
