//! Progress tracking and callbacks
//!
//! The O(n²) pair pass and O(n³) triple pass report progress after every
//! scored pair or triple. Callbacks only observe; they cannot change results.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pairscore::progress::Progress;
//!
//! let callback = |progress: &Progress| {
//!     eprint!("\r{} {:.1}%", progress.phase, progress.percent());
//! };
//!
//! evaluator.set_progress(Box::new(callback));
//! ```

use serde::Serialize;

/// Stage of an evaluation repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Embedding items
    Embedding,
    /// Scoring pairs
    Pairs,
    /// Scanning triples
    Triples,
}

impl Phase {
    /// Human-readable phase name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Embedding => "Embedding items",
            Self::Pairs => "Scoring pairs",
            Self::Triples => "Checking triples",
        }
    }
}

/// Progress information for a long-running pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    /// Steps completed
    pub current: usize,
    /// Total number of steps
    pub total: usize,
    /// Current phase
    pub phase: Phase,
    /// Zero-based repetition index
    pub repetition: usize,
}

impl Progress {
    /// Create a new progress instance
    #[must_use]
    pub fn new(phase: Phase, repetition: usize, current: usize, total: usize) -> Self {
        Self {
            current,
            total,
            phase,
            repetition,
        }
    }

    /// Get progress percentage (0.0 to 100.0)
    #[must_use]
    pub fn percent(&self) -> f32 {
        self.fraction() * 100.0
    }

    /// Get normalized progress (0.0 to 1.0)
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f32 / self.total as f32
        }
    }

    /// Check if the pass is complete
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }

    /// One-line status, e.g. `[rep 0] Scoring pairs: 12/90 (13.3%)`
    #[must_use]
    pub fn display_message(&self) -> String {
        format!(
            "[rep {}] {}: {}/{} ({:.1}%)",
            self.repetition,
            self.phase.name(),
            self.current,
            self.total,
            self.percent()
        )
    }
}

/// Boxed progress callback for owned callbacks
pub type BoxedProgressCallback = Box<dyn FnMut(&Progress) + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        let p = Progress::new(Phase::Pairs, 0, 25, 100);
        assert!((p.percent() - 25.0).abs() < 0.01);
        assert!((p.fraction() - 0.25).abs() < 0.001);
        assert!(!p.is_complete());
    }

    #[test]
    fn test_progress_zero_total() {
        let p = Progress::new(Phase::Triples, 0, 0, 0);
        assert!(p.percent().abs() < f32::EPSILON);
        assert!(p.is_complete());
    }

    #[test]
    fn test_display_message() {
        let p = Progress::new(Phase::Pairs, 2, 1, 4);
        assert_eq!(p.display_message(), "[rep 2] Scoring pairs: 1/4 (25.0%)");
    }

    #[test]
    fn test_boxed_callback_invocation() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut cb: BoxedProgressCallback = Box::new(move |p: &Progress| {
            let _ = tx.send(p.current);
        });
        for i in 1..=3 {
            cb(&Progress::new(Phase::Pairs, 0, i, 3));
        }
        drop(cb);
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
