//! Label vocabulary mapping model output indices to sign names.
//!
//! The on-disk format is line oriented: first whitespace-delimited token is
//! the class index, the remainder is the label. Lines with fewer than two
//! tokens are skipped. Indices are contiguous from 0 and never renumbered
//! after load, so an output index maps to the same label for the lifetime
//! of the process.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use crate::error::InferError;

#[derive(Debug)]
pub struct LabelVocab {
    labels: Vec<String>,
    lower_to_idx: HashMap<String, usize>,
}

impl LabelVocab {
    /// Load a vocabulary file, optionally dropping indices at or beyond
    /// `limit`.
    pub fn load(path: &Path, limit: Option<usize>) -> Result<Self, InferError> {
        let text = fs::read_to_string(path)
            .map_err(|_| InferError::ModelArtifactMissing(path.to_path_buf()))?;
        Ok(Self::parse(&text, limit))
    }

    /// Parse the line-oriented index/label format.
    pub fn parse(text: &str, limit: Option<usize>) -> Self {
        let mut by_index: BTreeMap<usize, String> = BTreeMap::new();
        for line in text.lines() {
            let mut tokens = line.split_whitespace();
            let Some(idx_token) = tokens.next() else {
                continue;
            };
            let Ok(idx) = idx_token.parse::<usize>() else {
                continue;
            };
            if let Some(limit) = limit {
                if idx >= limit {
                    continue;
                }
            }
            let label = tokens.collect::<Vec<_>>().join(" ");
            if label.is_empty() {
                continue;
            }
            by_index.entry(idx).or_insert(label);
        }

        let count = by_index.keys().next_back().map(|i| i + 1).unwrap_or(0);
        let labels: Vec<String> = (0..count)
            .map(|i| {
                by_index
                    .remove(&i)
                    .unwrap_or_else(|| format!("class_{i}"))
            })
            .collect();

        let mut lower_to_idx = HashMap::new();
        for (idx, label) in labels.iter().enumerate() {
            lower_to_idx.entry(label.to_lowercase()).or_insert(idx);
        }

        Self {
            labels,
            lower_to_idx,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a model output index; unknown indices get a placeholder
    /// name instead of failing the prediction.
    pub fn label(&self, idx: usize) -> String {
        self.labels
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("class_{idx}"))
    }

    /// Case-insensitive label lookup, for allowlists.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.lower_to_idx.get(&label.trim().to_lowercase()).copied()
    }

    /// Resolve an allowlist to sorted, deduplicated class indices.
    ///
    /// Unrecognized entries are dropped; `None` means nothing resolved and
    /// the caller should fall back to full-vocabulary scoring.
    pub fn resolve_allowlist(&self, allow: &[String]) -> Option<Vec<usize>> {
        let mut indices: Vec<usize> = allow
            .iter()
            .filter(|label| !label.trim().is_empty())
            .filter_map(|label| self.index_of(label))
            .collect();
        indices.sort_unstable();
        indices.dedup();
        if indices.is_empty() {
            None
        } else {
            Some(indices)
        }
    }
}

/// Make sure a truncated label file with `num_classes` entries exists,
/// deriving it from the full list when missing.
pub fn ensure_labels(
    path: &Path,
    fallback: &Path,
    num_classes: usize,
) -> Result<PathBuf, InferError> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    let full = LabelVocab::load(fallback, None)?;
    if full.len() < num_classes {
        return Err(InferError::ModelArtifactMissing(fallback.to_path_buf()));
    }
    let derived: String = (0..num_classes)
        .map(|i| format!("{i} {}\n", full.label(i)))
        .collect();
    fs::write(path, derived).map_err(|_| InferError::ModelArtifactMissing(path.to_path_buf()))?;
    log::info!(
        "Derived {} class labels into {}",
        num_classes,
        path.display()
    );
    Ok(path.to_path_buf())
}
