//! Reductions of pairwise scores into summary results
//!
//! Each reducer is a pure function of already-computed scores (or embeddings
//! for clustering). The evaluator drives sampling, caching and scoring, then
//! hands the results to one of these.

pub mod clustering;
pub mod distribution;
pub mod retrieval;
pub mod spectral;
pub mod triangle;

pub use clustering::{encode_labels, normalized_mutual_info, ClusterReport, KMeans, KMeansFit};
pub use distribution::{pair_scores, summarize, ScoreDistributionReport};
pub use retrieval::{recall_at_k, RetrievalReport};
pub use spectral::{eigenvalues, min_eigenvalue, SpectralReport};
pub use triangle::{num_triples, violation, violations, TriangleReport};
