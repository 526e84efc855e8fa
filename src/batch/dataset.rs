//! Labeled dataset and ground-truth pairs.
//!
//! The dataset is a CSV file whose first row is a header. Each following row
//! carries a label at `label_column`, the base firmware in the next column and
//! one or more target firmwares after it. Every (base, target) pair is
//! expected to be similar.

use crate::error::{BatchErrorKind, FirmsimError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Unordered firmware pair; `first <= second`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FirmwarePair {
    first: String,
    second: String,
}

impl FirmwarePair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    #[must_use]
    pub fn first(&self) -> &str {
        &self.first
    }

    #[must_use]
    pub fn second(&self) -> &str {
        &self.second
    }
}

impl std::fmt::Display for FirmwarePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <-> {}", self.first, self.second)
    }
}

/// One dataset row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetEntry {
    pub label: String,
    pub base_firmware: String,
    pub target_firmwares: Vec<String>,
}

/// Parsed labeled dataset.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    entries: Vec<DatasetEntry>,
    bases: BTreeSet<String>,
    similar_pairs: HashSet<FirmwarePair>,
}

impl Dataset {
    /// Read and parse a dataset file.
    pub fn load(path: &Path, label_column: usize) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| FirmsimError::io(path, e))?;
        let dataset = Self::parse(&String::from_utf8_lossy(&bytes), label_column);
        if dataset.bases.is_empty() {
            return Err(FirmsimError::batch(
                format!("loading {}", path.display()),
                BatchErrorKind::Dataset("no rows with a base firmware".to_string()),
            ));
        }
        tracing::info!(
            "Loaded dataset {}: {} labeled group(s), {} base firmware(s), {} ground-truth pair(s)",
            path.display(),
            dataset.entries.len(),
            dataset.bases.len(),
            dataset.similar_pairs.len()
        );
        Ok(dataset)
    }

    /// Parse dataset text. Rows too short to hold a base firmware are skipped.
    #[must_use]
    pub fn parse(content: &str, label_column: usize) -> Self {
        let mut dataset = Self::default();
        for line in content.lines().skip(1) {
            let cells = split_row(line);
            if cells.len() < label_column + 2 {
                continue;
            }
            let label = cells[label_column].trim().to_string();
            let base = cells[label_column + 1].trim().to_string();
            if base.is_empty() {
                continue;
            }
            let targets: Vec<String> = cells[label_column + 2..]
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();

            dataset.bases.insert(base.clone());
            if targets.is_empty() {
                continue;
            }
            for target in &targets {
                dataset.similar_pairs.insert(FirmwarePair::new(base.clone(), target.clone()));
            }
            dataset.entries.push(DatasetEntry {
                label,
                base_firmware: base,
                target_firmwares: targets,
            });
        }
        dataset
    }

    #[must_use]
    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    /// Every base firmware, sorted.
    pub fn base_firmwares(&self) -> impl Iterator<Item = &str> {
        self.bases.iter().map(String::as_str)
    }

    /// Label of the first row whose base is `base`.
    #[must_use]
    pub fn label_for_base(&self, base: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.base_firmware == base)
            .map(|e| e.label.as_str())
    }

    /// Whether the pair is a ground-truth similar pair.
    #[must_use]
    pub fn is_expected_similar(&self, pair: &FirmwarePair) -> bool {
        self.similar_pairs.contains(pair)
    }

    #[must_use]
    pub fn ground_truth_len(&self) -> usize {
        self.similar_pairs.len()
    }
}

/// Split one CSV row, honouring double-quoted cells.
fn split_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells
}
