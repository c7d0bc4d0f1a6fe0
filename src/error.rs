//! Error types for pairscore

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors that can occur while loading a model or evaluating pairwise scores
#[derive(Debug, Error)]
pub enum EvalError {
    /// No checkpoint path was supplied
    #[error("no checkpoint/model path given; use --cp-path to indicate the path")]
    MissingCheckpoint,

    /// Checkpoint keys or shapes do not match the requested architecture
    #[error("model load mismatch: {0}")]
    ModelLoadMismatch(String),

    /// The model failed to embed one item
    #[error("embedding failed for item '{item_id}': {reason}")]
    EmbeddingCompute {
        /// Item that failed
        item_id: String,
        /// Failure detail reported by the model
        reason: String,
    },

    /// Failure inside one evaluation repetition
    #[error("repetition {repetition} aborted: {source}")]
    Repetition {
        /// Zero-based repetition index
        repetition: usize,
        /// Underlying failure
        #[source]
        source: Box<EvalError>,
    },

    /// Item id is not present in the dataset
    #[error("unknown item: {0}")]
    UnknownItem(String),

    /// A self-pair was requested from the scorer
    #[error("self-pair requested at sample position {0}")]
    SelfPair(usize),

    /// The reducer needs labels but the dataset has none
    #[error("dataset has no labels; {0} requires a spk2utt/label mapping")]
    MissingLabels(&'static str),

    /// Invalid argument or degenerate input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Malformed data file
    #[error("parse error in {path}:{line}: {reason}")]
    Parse {
        /// File being parsed
        path: PathBuf,
        /// One-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// Requested device is not available to the model backend
    #[error("unsupported device: {0}")]
    UnsupportedDevice(String),

    /// Repetition ran past its wall-clock budget
    #[error("wall-clock budget of {budget:?} exceeded after {elapsed:?}")]
    BudgetExceeded {
        /// Configured budget
        budget: Duration,
        /// Time spent when the check fired
        elapsed: Duration,
    },

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EvalError {
    /// Attach a repetition index to an error raised inside a repetition.
    ///
    /// Errors that already carry a repetition index are returned unchanged.
    #[must_use]
    pub fn in_repetition(self, repetition: usize) -> Self {
        match self {
            Self::Repetition { .. } => self,
            other => Self::Repetition {
                repetition,
                source: Box::new(other),
            },
        }
    }

    /// Item id associated with this error, if any
    #[must_use]
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::EmbeddingCompute { item_id, .. } => Some(item_id),
            Self::UnknownItem(id) => Some(id),
            Self::Repetition { source, .. } => source.item_id(),
            _ => None,
        }
    }

    /// Repetition index associated with this error, if any
    #[must_use]
    pub fn repetition(&self) -> Option<usize> {
        match self {
            Self::Repetition { repetition, .. } => Some(*repetition),
            _ => None,
        }
    }

    /// Whether this error is fatal for the whole run (as opposed to a single item)
    #[must_use]
    pub fn is_load_error(&self) -> bool {
        match self {
            Self::MissingCheckpoint | Self::ModelLoadMismatch(_) | Self::UnsupportedDevice(_) => {
                true
            }
            Self::Repetition { source, .. } => source.is_load_error(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EvalError::ModelLoadMismatch("missing key 'projection'".into());
        assert_eq!(
            err.to_string(),
            "model load mismatch: missing key 'projection'"
        );
    }

    #[test]
    fn test_missing_checkpoint_display() {
        let err = EvalError::MissingCheckpoint;
        assert!(err.to_string().contains("--cp-path"));
        assert!(err.is_load_error());
    }

    #[test]
    fn test_load_error_seen_through_repetition() {
        let err = EvalError::ModelLoadMismatch("no discriminator heads".into()).in_repetition(3);
        assert_eq!(err.repetition(), Some(3));
        assert!(err.is_load_error());

        let err = EvalError::UnsupportedDevice("cuda:0".into()).in_repetition(0);
        assert!(err.is_load_error());
    }

    #[test]
    fn test_in_repetition_wraps_once() {
        let err = EvalError::EmbeddingCompute {
            item_id: "spk1-utt3".into(),
            reason: "nan in output".into(),
        }
        .in_repetition(2)
        .in_repetition(5);

        assert_eq!(err.repetition(), Some(2));
        assert_eq!(err.item_id(), Some("spk1-utt3"));
        assert!(!err.is_load_error());
        assert_eq!(
            err.to_string(),
            "repetition 2 aborted: embedding failed for item 'spk1-utt3': nan in output"
        );
    }

    #[test]
    fn test_parse_error_display() {
        let err = EvalError::Parse {
            path: PathBuf::from("feats.ark"),
            line: 7,
            reason: "expected '['".into(),
        };
        assert_eq!(err.to_string(), "parse error in feats.ark:7: expected '['");
    }

    #[test]
    fn test_io_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EvalError = io.into();
        assert!(matches!(err, EvalError::Io(_)));
    }
}
