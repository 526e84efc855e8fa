//! Previously persisted comparison results.

use super::dataset::FirmwarePair;
use crate::orchestrator::{ComparisonSummary, SUMMARY_FILE_NAME};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A summary found under the result directory.
#[derive(Debug, Clone)]
pub struct PriorComparison {
    pub path: PathBuf,
    pub summary: ComparisonSummary,
}

/// Latest persisted comparison per firmware pair.
#[derive(Debug, Default)]
pub struct PriorResults {
    by_pair: HashMap<FirmwarePair, PriorComparison>,
}

impl PriorResults {
    /// Scan `<result_dir>/*/comparison_summary.json`.
    ///
    /// Unreadable summaries are logged and ignored; when a pair was compared
    /// more than once the newest summary wins.
    #[must_use]
    pub fn scan(result_dir: &Path) -> Self {
        let mut results = Self::default();
        if !result_dir.is_dir() {
            return results;
        }

        let summaries = WalkDir::new(result_dir)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file() && e.file_name() == SUMMARY_FILE_NAME);

        for entry in summaries {
            match ComparisonSummary::load(entry.path()) {
                Ok(summary) => results.insert(PriorComparison {
                    path: entry.into_path(),
                    summary,
                }),
                Err(e) => tracing::warn!("Skipping unreadable summary: {}", e.detailed_message()),
            }
        }
        tracing::info!(
            "Found {} previously compared pair(s) in {}",
            results.len(),
            result_dir.display()
        );
        results
    }

    fn insert(&mut self, prior: PriorComparison) {
        let pair = FirmwarePair::new(
            prior.summary.firmware1.clone(),
            prior.summary.firmware2.clone(),
        );
        match self.by_pair.get(&pair) {
            Some(existing) if existing.summary.timestamp >= prior.summary.timestamp => {}
            _ => {
                self.by_pair.insert(pair, prior);
            }
        }
    }

    #[must_use]
    pub fn get(&self, pair: &FirmwarePair) -> Option<&PriorComparison> {
        self.by_pair.get(pair)
    }

    /// Stored overall similarity of a pair.
    #[must_use]
    pub fn similarity(&self, pair: &FirmwarePair) -> Option<f64> {
        self.get(pair).map(|p| p.summary.total_similarity)
    }

    /// Every pair with its comparison, sorted by pair.
    #[must_use]
    pub fn iter_sorted(&self) -> Vec<(&FirmwarePair, &PriorComparison)> {
        let mut pairs: Vec<_> = self.by_pair.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }
}
