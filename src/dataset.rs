//! Evaluation datasets and on-disk loaders
//!
//! Features are read from Kaldi text archives (`*.ark`):
//!
//! ```text
//! spk1-utt1  [
//!   0.12 -0.40 1.30
//!   0.10 -0.38 1.25 ]
//! spk1-utt2  [ 0.5 0.1 0.2 ]
//! ```
//!
//! Labels and utterance lists come from `spk2utt` (`spk utt1 utt2 ...`) or
//! trials files (`enroll test target|nontarget`).

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{EvalError, EvalResult};
use crate::features::FeatureMatrix;

/// Items with their features and, optionally, class labels
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    ids: Vec<String>,
    features: Vec<FeatureMatrix>,
    labels: Option<Vec<String>>,
    index: HashMap<String, usize>,
}

impl Dataset {
    /// Build an unlabeled dataset. Later duplicates of an id replace earlier ones.
    #[must_use]
    pub fn from_entries(entries: Vec<(String, FeatureMatrix)>) -> Self {
        let mut dataset = Self::default();
        for (id, features) in entries {
            if let Some(&pos) = dataset.index.get(&id) {
                dataset.features[pos] = features;
            } else {
                dataset.index.insert(id.clone(), dataset.ids.len());
                dataset.ids.push(id);
                dataset.features.push(features);
            }
        }
        dataset
    }

    /// Build a labeled dataset
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidInput`] when label and entry counts differ.
    pub fn labeled(entries: Vec<(String, FeatureMatrix)>, labels: Vec<String>) -> EvalResult<Self> {
        if entries.len() != labels.len() {
            return Err(EvalError::InvalidInput(format!(
                "{} entries but {} labels",
                entries.len(),
                labels.len()
            )));
        }
        let mut dataset = Self::from_entries(entries);
        if dataset.len() != labels.len() {
            return Err(EvalError::InvalidInput(
                "labeled entries must have unique ids".into(),
            ));
        }
        dataset.labels = Some(labels);
        Ok(dataset)
    }

    /// Number of items
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the dataset is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Item ids in order
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Id at a position
    #[must_use]
    pub fn id(&self, position: usize) -> Option<&str> {
        self.ids.get(position).map(String::as_str)
    }

    /// Features at a position
    #[must_use]
    pub fn features(&self, position: usize) -> Option<&FeatureMatrix> {
        self.features.get(position)
    }

    /// Position of an item id
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Labels, if the dataset is labeled
    #[must_use]
    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    /// Restrict to `ids`, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnknownItem`] for an id without features.
    pub fn select(&self, ids: &[String]) -> EvalResult<Self> {
        let mut entries = Vec::with_capacity(ids.len());
        let mut labels = self.labels.as_ref().map(|_| Vec::with_capacity(ids.len()));
        for id in ids {
            let pos = self
                .position(id)
                .ok_or_else(|| EvalError::UnknownItem(id.clone()))?;
            entries.push((id.clone(), self.features[pos].clone()));
            if let (Some(out), Some(src)) = (labels.as_mut(), self.labels.as_ref()) {
                out.push(src[pos].clone());
            }
        }
        match labels {
            Some(labels) => Self::labeled(entries, labels),
            None => Ok(Self::from_entries(entries)),
        }
    }

    /// Restrict to the utterances of `spk2utt`, labeled by speaker.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnknownItem`] for an utterance without features.
    pub fn with_speakers(&self, spk2utt: &[(String, Vec<String>)]) -> EvalResult<Self> {
        let mut entries = Vec::new();
        let mut labels = Vec::new();
        for (speaker, utterances) in spk2utt {
            for utt in utterances {
                let pos = self
                    .position(utt)
                    .ok_or_else(|| EvalError::UnknownItem(utt.clone()))?;
                entries.push((utt.clone(), self.features[pos].clone()));
                labels.push(speaker.clone());
            }
        }
        Self::labeled(entries, labels)
    }
}

fn parse_error(path: &Path, line: usize, reason: impl Into<String>) -> EvalError {
    EvalError::Parse {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

fn parse_row(path: &Path, line: usize, tokens: &[&str]) -> EvalResult<Vec<f32>> {
    tokens
        .iter()
        .map(|t| {
            t.parse::<f32>()
                .map_err(|_| parse_error(path, line, format!("invalid number '{t}'")))
        })
        .collect()
}

/// Parse a Kaldi text archive
///
/// # Errors
///
/// [`EvalError::Parse`] on malformed content, [`EvalError::Io`] on read failure.
pub fn read_text_ark(path: &Path) -> EvalResult<Vec<(String, FeatureMatrix)>> {
    let text = fs::read_to_string(path)?;
    parse_text_ark(path, &text)
}

fn parse_text_ark(path: &Path, text: &str) -> EvalResult<Vec<(String, FeatureMatrix)>> {
    let mut entries = Vec::new();
    let mut current: Option<(String, Vec<Vec<f32>>, usize)> = None;

    for (line_idx, line) in text.lines().enumerate() {
        let line_no = line_idx + 1;
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        if current.is_none() {
            if tokens.len() < 2 || tokens[1] != "[" {
                return Err(parse_error(path, line_no, "expected '<utt-id> ['"));
            }
            current = Some((tokens[0].to_string(), Vec::new(), line_no));
            tokens.drain(..2);
        }

        let closes = tokens.last() == Some(&"]");
        if closes {
            tokens.pop();
        }
        if tokens.contains(&"[") || tokens.contains(&"]") {
            return Err(parse_error(path, line_no, "unexpected bracket"));
        }

        if let Some((_, rows, _)) = current.as_mut() {
            if !tokens.is_empty() {
                rows.push(parse_row(path, line_no, &tokens)?);
            }
        }

        if closes {
            if let Some((id, rows, start)) = current.take() {
                let matrix = FeatureMatrix::from_rows(&rows)
                    .map_err(|e| parse_error(path, start, format!("{id}: {e}")))?;
                entries.push((id, matrix));
            }
        }
    }

    if let Some((id, _, start)) = current {
        return Err(parse_error(path, start, format!("matrix '{id}' is not closed")));
    }

    Ok(entries)
}

/// Load every `*.ark` file in `dir` (sorted by name); later ids override earlier ones
///
/// # Errors
///
/// I/O and parse errors from any archive; [`EvalError::InvalidInput`] when the
/// directory holds no archive.
pub fn load_feature_dir(dir: &Path) -> EvalResult<Dataset> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "ark"))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(EvalError::InvalidInput(format!(
            "no .ark feature archives in {}",
            dir.display()
        )));
    }

    let mut entries = Vec::new();
    for file in &files {
        let loaded = read_text_ark(file)?;
        debug!(file = %file.display(), items = loaded.len(), "read feature archive");
        entries.extend(loaded);
    }

    let dataset = Dataset::from_entries(entries);
    info!(archives = files.len(), items = dataset.len(), "features loaded");
    Ok(dataset)
}

/// Parse a `spk2utt` file into `(speaker, utterances)` in file order
///
/// # Errors
///
/// [`EvalError::Parse`] for a speaker without utterances.
pub fn read_spk2utt(path: &Path) -> EvalResult<Vec<(String, Vec<String>)>> {
    let text = fs::read_to_string(path)?;
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        let Some(speaker) = tokens.next() else {
            continue;
        };
        let utterances: Vec<String> = tokens.map(str::to_string).collect();
        if utterances.is_empty() {
            return Err(parse_error(
                path,
                idx + 1,
                format!("speaker '{speaker}' has no utterances"),
            ));
        }
        out.push((speaker.to_string(), utterances));
    }
    Ok(out)
}

/// Unique, sorted test-side utterances of a trials file
///
/// # Errors
///
/// [`EvalError::Parse`] for lines without three fields.
pub fn read_trials(path: &Path) -> EvalResult<Vec<String>> {
    let text = fs::read_to_string(path)?;
    let mut utterances = BTreeSet::new();
    for (idx, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != 3 {
            return Err(parse_error(
                path,
                idx + 1,
                format!("expected 'enroll test label', got {} fields", fields.len()),
            ));
        }
        if !matches!(fields[2], "target" | "nontarget" | "0" | "1") {
            warn!(line = idx + 1, label = fields[2], "unrecognized trial label");
        }
        utterances.insert(fields[1].to_string());
    }
    Ok(utterances.into_iter().collect())
}
