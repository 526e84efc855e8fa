//! Persisted comparison records.

use crate::error::{ErrorContext, FirmsimError, Result};
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the per-comparison summary.
pub const SUMMARY_FILE_NAME: &str = "comparison_summary.json";

/// One module's contribution to a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleResult {
    pub similarity: f64,
    pub weight: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_file: Option<PathBuf>,
}

impl ModuleResult {
    /// A module that produced a score.
    #[must_use]
    pub fn succeeded(similarity: f64, weight: f64) -> Self {
        Self {
            similarity,
            weight,
            success: true,
            error: None,
            details_file: None,
        }
    }

    /// A module that failed; it scores 0 and keeps its weight.
    #[must_use]
    pub fn failed(weight: f64, error: impl Into<String>) -> Self {
        Self {
            similarity: 0.0,
            weight,
            success: false,
            error: Some(error.into()),
            details_file: None,
        }
    }
}

/// Summary of one firmware-pair comparison, as written to
/// `comparison_summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub firmware1: String,
    pub firmware2: String,
    pub firmware1_path: PathBuf,
    pub firmware2_path: PathBuf,
    pub firmware1_dir: String,
    pub firmware2_dir: String,
    pub timestamp: DateTime<Local>,
    pub modules: Vec<String>,
    pub results: IndexMap<String, ModuleResult>,
    pub total_similarity: f64,
}

/// Weighted mean of module similarities; 0 when no weight is present.
#[must_use]
pub fn weighted_total<I>(results: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (sum, weight) = results
        .into_iter()
        .fold((0.0, 0.0), |(s, w), (sim, weight)| (s + sim * weight, w + weight));
    if weight > 0.0 {
        sum / weight
    } else {
        0.0
    }
}

impl ComparisonSummary {
    /// Read a summary file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| FirmsimError::io(path, e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| FirmsimError::malformed_artifact(path, e.to_string()))
    }

    /// Write the summary into `dir`, returning the file path.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(SUMMARY_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)
            .map_err(|e| FirmsimError::io(&path, e))
            .context("writing comparison summary")?;
        Ok(path)
    }

    /// Recompute the total with replacement weights.
    ///
    /// Modules missing from `weights` keep their recorded weight.
    #[must_use]
    pub fn reweighted(&self, weights: &IndexMap<String, f64>) -> f64 {
        weighted_total(self.results.iter().map(|(name, result)| {
            let weight = weights.get(name).copied().unwrap_or(result.weight);
            (result.similarity, weight)
        }))
    }
}
