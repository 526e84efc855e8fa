//! Batch evaluation against a labeled dataset.
//!
//! Plans every base-versus-corpus pair once, reuses earlier results,
//! dispatches the rest to a [`WorkerPool`] and scores predictions against
//! the dataset's ground truth.

mod dataset;
mod evaluate;
mod executor;
mod history;
mod metrics;
mod planner;
mod pool;

pub use dataset::{Dataset, DatasetEntry, FirmwarePair};
pub use evaluate::{evaluate_prior, EvaluationReport, PairEvaluation};
pub use executor::{ChildSlot, ComparisonExecutor, InProcessExecutor, SubprocessExecutor};
pub use history::{PriorComparison, PriorResults};
pub use metrics::{ClassificationMetrics, ConfusionMatrix};
pub use planner::{plan, scan_corpus, BatchPlan, ComparisonTask, ReusedResult, UNKNOWN_LABEL};
pub use pool::{ComparisonResult, PoolOutcome, PoolSettings, WorkerPool};

use crate::config::{AppConfig, ExecutorKind};
use crate::error::{ErrorContext, FirmsimError, Result};
use crate::orchestrator::ComparisonOrchestrator;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Task counts of a batch run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BatchCounts {
    pub total_comparisons: usize,
    pub enqueued: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub skipped_due_to_missing: usize,
}

/// Record written to `batch_comparison_results_<timestamp>.json`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub timestamp: DateTime<Local>,
    pub similarity_threshold: f64,
    pub summary: BatchCounts,
    pub elapsed_secs: f64,
    pub interrupted: bool,
    pub confusion: ConfusionMatrix,
    pub metrics: ClassificationMetrics,
    pub missing_firmwares: Vec<String>,
    pub reused: Vec<ReusedResult>,
    pub results: Vec<ComparisonResult>,
}

impl BatchSummary {
    /// Write into `logs_dir`, returning the file path.
    pub fn write(&self, logs_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(logs_dir).map_err(|e| FirmsimError::io(logs_dir, e))?;
        let path = logs_dir.join(format!(
            "batch_comparison_results_{}.json",
            self.timestamp.format("%Y%m%d_%H%M%S")
        ));
        std::fs::write(&path, serde_json::to_string_pretty(self)?)
            .map_err(|e| FirmsimError::io(&path, e))
            .context("writing batch summary")?;
        Ok(path)
    }
}

/// Executor for `config.batch.executor`.
///
/// `config_file` and `modules` are forwarded to child processes.
pub fn executor_from_config(
    config: &AppConfig,
    data_dir: &Path,
    config_file: Option<PathBuf>,
    modules: Option<&[String]>,
) -> Result<Arc<dyn ComparisonExecutor>> {
    match config.batch.executor {
        ExecutorKind::Subprocess => {
            let executor = SubprocessExecutor::current_exe(data_dir, &config.output.result_dir)?
                .with_logs_dir(&config.output.logs_dir)
                .with_config_file(config_file)
                .with_modules(modules.map(<[String]>::to_vec).unwrap_or_default());
            Ok(Arc::new(executor))
        }
        ExecutorKind::InProcess => {
            let orchestrator = ComparisonOrchestrator::from_config(config, modules)?;
            Ok(Arc::new(InProcessExecutor::new(orchestrator, data_dir)))
        }
    }
}

/// Drives a complete batch run.
pub struct BatchEvaluator {
    config: AppConfig,
    dataset: Dataset,
    data_dir: PathBuf,
    executor: Arc<dyn ComparisonExecutor>,
    stop: Arc<AtomicBool>,
}

impl BatchEvaluator {
    pub fn new(
        config: AppConfig,
        dataset: Dataset,
        data_dir: impl Into<PathBuf>,
        executor: Arc<dyn ComparisonExecutor>,
    ) -> Self {
        Self {
            config,
            dataset,
            data_dir: data_dir.into(),
            executor,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a stop flag, e.g. one raised by a Ctrl-C handler.
    #[must_use]
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Plan, execute and score the batch.
    pub fn run(&self) -> Result<BatchSummary> {
        let started = Instant::now();
        let timestamp = Local::now();
        let threshold = self.config.similarity_threshold;

        let corpus = scan_corpus(&self.data_dir).context("scanning firmware corpus")?;
        let prior = PriorResults::scan(&self.config.output.result_dir);
        let plan = plan(&self.dataset, &corpus, &self.data_dir, &prior);
        if !plan.missing_bases.is_empty() {
            tracing::warn!(
                "{} base firmware(s) missing from {}",
                plan.missing_bases.len(),
                self.data_dir.display()
            );
        }

        let batch = &self.config.batch;
        let pool = WorkerPool::new(
            Arc::clone(&self.executor),
            PoolSettings {
                workers: batch.workers,
                poll_interval: Duration::from_millis(batch.poll_interval_ms),
                stall_polls: batch.stall_polls,
                grace_period: Duration::from_secs(batch.grace_period_secs),
                threshold,
            },
            Arc::clone(&self.stop),
        );
        let enqueued = plan.tasks.len();
        let outcome = pool.run(plan.tasks)?;

        let completed = outcome.results.iter().filter(|r| r.success).count();
        let counts = BatchCounts {
            total_comparisons: plan.total_comparisons,
            enqueued,
            completed,
            failed: outcome.results.len() - completed,
            skipped: plan.skipped,
            skipped_due_to_missing: plan.skipped_due_to_missing,
        };
        let confusion = score(&plan.reused, &outcome.results, threshold);
        let metrics = confusion.metrics();
        let elapsed_secs = started.elapsed().as_secs_f64();

        tracing::info!(
            "Batch finished in {elapsed_secs:.2}s: {} completed, {} failed, {} skipped",
            counts.completed,
            counts.failed,
            counts.skipped
        );
        tracing::info!(
            "TP {} FP {} TN {} FN {}; {metrics}",
            confusion.true_positives,
            confusion.false_positives,
            confusion.true_negatives,
            confusion.false_negatives
        );

        Ok(BatchSummary {
            timestamp,
            similarity_threshold: threshold,
            summary: counts,
            elapsed_secs,
            interrupted: outcome.interrupted,
            confusion,
            metrics,
            missing_firmwares: plan.missing_bases,
            reused: plan.reused,
            results: outcome.results,
        })
    }
}

/// Confusion matrix over reused and fresh results, one entry per pair.
/// Failed tasks are excluded.
fn score(reused: &[ReusedResult], results: &[ComparisonResult], threshold: f64) -> ConfusionMatrix {
    let mut matrix = ConfusionMatrix::default();
    let mut seen: HashSet<FirmwarePair> = HashSet::new();
    for result in results.iter().filter(|r| r.success) {
        let pair = FirmwarePair::new(result.base_firmware.clone(), result.target_firmware.clone());
        if seen.insert(pair) {
            matrix.record(result.expected_similar, result.similarity >= threshold);
        }
    }
    for prior in reused {
        if seen.insert(prior.pair.clone()) {
            matrix.record(prior.expected_similar, prior.similarity >= threshold);
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn result(target: &str, similarity: f64, expected: bool, success: bool) -> ComparisonResult {
        ComparisonResult {
            task_id: Uuid::new_v4(),
            base_firmware: "base".to_string(),
            target_firmware: target.to_string(),
            label: "L".to_string(),
            success,
            similarity,
            predicted_similar: success && similarity >= 0.5,
            expected_similar: expected,
            worker_id: 1,
            error: None,
        }
    }

    #[test]
    fn test_ground_truth_pair_at_two_thresholds() {
        let results = vec![result("t", 0.6, true, true)];
        assert_eq!(score(&[], &results, 0.5).true_positives, 1);
        assert_eq!(score(&[], &results, 0.7).false_negatives, 1);
    }

    #[test]
    fn test_failed_and_duplicate_results_excluded() {
        let results = vec![
            result("t", 0.9, false, true),
            result("u", 0.0, true, false),
        ];
        let reused = vec![ReusedResult {
            pair: FirmwarePair::new("t", "base"),
            similarity: 0.1,
            expected_similar: false,
        }];
        let matrix = score(&reused, &results, 0.5);
        assert_eq!(matrix.total(), 1);
        assert_eq!(matrix.false_positives, 1);
    }
}
