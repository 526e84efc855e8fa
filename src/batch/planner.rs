//! Builds the set of comparison tasks for a batch run.

use super::dataset::{Dataset, FirmwarePair};
use super::history::PriorResults;
use crate::error::{FirmsimError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// Label used when no dataset row names the base firmware.
pub const UNKNOWN_LABEL: &str = "unknown";

/// One pair queued for comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonTask {
    pub task_id: Uuid,
    pub base_firmware: String,
    pub target_firmware: String,
    pub label: String,
    pub expected_similar: bool,
}

impl ComparisonTask {
    #[must_use]
    pub fn pair(&self) -> FirmwarePair {
        FirmwarePair::new(self.base_firmware.clone(), self.target_firmware.clone())
    }
}

/// A pair answered from an earlier run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReusedResult {
    pub pair: FirmwarePair,
    pub similarity: f64,
    pub expected_similar: bool,
}

/// Outcome of planning.
#[derive(Debug, Default)]
pub struct BatchPlan {
    pub tasks: Vec<ComparisonTask>,
    pub reused: Vec<ReusedResult>,
    /// Pairs considered
    pub total_comparisons: usize,
    /// Pairs not enqueued, for any reason
    pub skipped: usize,
    /// Pairs not enqueued because a firmware directory is gone
    pub skipped_due_to_missing: usize,
    /// Dataset bases absent from the corpus, sorted
    pub missing_bases: Vec<String>,
}

/// Sorted names of the sub-directories of `data_dir`.
pub fn scan_corpus(data_dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(data_dir).map_err(|e| FirmsimError::io(data_dir, e))?;
    let mut names: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    tracing::info!("Found {} firmware(s) in {}", names.len(), data_dir.display());
    Ok(names)
}

/// Plan every base-versus-corpus comparison exactly once per unordered pair.
#[must_use]
pub fn plan(dataset: &Dataset, corpus: &[String], data_dir: &Path, prior: &PriorResults) -> BatchPlan {
    let corpus_set: HashSet<&str> = corpus.iter().map(String::as_str).collect();
    let mut plan = BatchPlan::default();
    let mut planned: HashSet<FirmwarePair> = HashSet::new();

    for base in dataset.base_firmwares() {
        if !corpus_set.contains(base) {
            tracing::warn!("Base firmware {base} is not in the corpus");
            plan.missing_bases.push(base.to_string());
            continue;
        }
        let label = dataset.label_for_base(base).unwrap_or(UNKNOWN_LABEL);

        for target in corpus {
            if target == base {
                continue;
            }
            let pair = FirmwarePair::new(base, target.as_str());
            if !planned.insert(pair.clone()) {
                continue;
            }
            plan.total_comparisons += 1;
            let expected_similar = dataset.is_expected_similar(&pair);

            if !data_dir.join(base).is_dir() || !data_dir.join(target).is_dir() {
                tracing::warn!("Skipping {pair}: firmware directory missing");
                plan.skipped += 1;
                plan.skipped_due_to_missing += 1;
                continue;
            }

            if let Some(similarity) = prior.similarity(&pair) {
                tracing::debug!("Reusing earlier result for {pair}: {similarity:.4}");
                plan.skipped += 1;
                plan.reused.push(ReusedResult {
                    pair,
                    similarity,
                    expected_similar,
                });
                continue;
            }

            plan.tasks.push(ComparisonTask {
                task_id: Uuid::new_v4(),
                base_firmware: base.to_string(),
                target_firmware: target.clone(),
                label: label.to_string(),
                expected_similar,
            });
        }
    }

    tracing::info!(
        "Planned {} comparison(s): {} enqueued, {} skipped ({} missing)",
        plan.total_comparisons,
        plan.tasks.len(),
        plan.skipped,
        plan.skipped_due_to_missing
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::history::tests::write_summary;
    use tempfile::TempDir;

    fn corpus(dir: &Path, names: &[&str]) -> Vec<String> {
        for name in names {
            std::fs::create_dir_all(dir.join(name)).unwrap();
        }
        scan_corpus(dir).unwrap()
    }

    #[test]
    fn test_each_pair_planned_once() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        let names = corpus(&data, &["a", "b", "c"]);
        let dataset = Dataset::parse("h,l,base,t\n0,L1,a,b\n1,L2,b,c\n2,L3,zz,a\n", 1);

        let plan = plan(&dataset, &names, &data, &PriorResults::default());
        // a: (a,b) (a,c); b: (b,c)
        assert_eq!(plan.total_comparisons, 3);
        assert_eq!(plan.tasks.len(), 3);
        assert_eq!(plan.missing_bases, vec!["zz"]);

        let ab = plan.tasks.iter().find(|t| t.pair() == FirmwarePair::new("a", "b")).unwrap();
        assert!(ab.expected_similar);
        assert_eq!(ab.label, "L1");
        let ac = plan.tasks.iter().find(|t| t.pair() == FirmwarePair::new("a", "c")).unwrap();
        assert!(!ac.expected_similar);
        let bc = plan.tasks.iter().find(|t| t.pair() == FirmwarePair::new("b", "c")).unwrap();
        assert_eq!(bc.label, "L2");
        assert!(bc.expected_similar);
    }

    #[test]
    fn test_prior_results_are_reused() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        let results = tmp.path().join("results");
        let names = corpus(&data, &["a", "b", "c"]);
        write_summary(&results, "b_a_x", "b", "a", 0.7, 0);
        let dataset = Dataset::parse("h,l,base,t\n0,L1,a,b\n", 1);

        let plan = plan(&dataset, &names, &data, &PriorResults::scan(&results));
        assert_eq!(plan.total_comparisons, 2);
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.skipped, 1);
        assert_eq!(plan.reused.len(), 1);
        assert!(plan.reused[0].expected_similar);
        assert_eq!(plan.reused[0].similarity, 0.7);
    }

    #[test]
    fn test_unknown_label() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        let names = corpus(&data, &["a", "b"]);
        let dataset = Dataset::parse("h,l,base\n0,L1,a\n", 1);

        let plan = plan(&dataset, &names, &data, &PriorResults::default());
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].label, UNKNOWN_LABEL);
    }
}
