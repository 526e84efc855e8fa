//! Batch command handler.
//!
//! Implements the `batch` subcommand: every dataset base against the corpus.

use crate::batch::{executor_from_config, BatchEvaluator, Dataset};
use crate::config::AppConfig;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Batch command configuration
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Config file forwarded to child comparisons
    pub config_file: Option<PathBuf>,
    /// Run exactly these modules
    pub modules: Option<Vec<String>>,
}

/// Run the batch command, returning the desired exit code.
///
/// Exits with 130 when interrupted before every result arrived.
pub fn run_batch(config: AppConfig, options: BatchOptions) -> Result<i32> {
    let data_dir = config
        .batch
        .data_dir
        .clone()
        .context("no firmware corpus given (--data-dir or batch.data_dir)")?;
    let dataset_path = config
        .batch
        .dataset
        .clone()
        .context("no dataset given (--dataset or batch.dataset)")?;

    let dataset = Dataset::load(&dataset_path, config.batch.label_column)?;
    let executor = executor_from_config(
        &config,
        &data_dir,
        options.config_file,
        options.modules.as_deref(),
    )?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop_flag = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            stop_flag.store(true, Ordering::Relaxed);
        })
        .ok();
    }

    let logs_dir = config.output.logs_dir.clone();
    let evaluator = BatchEvaluator::new(config, dataset, &data_dir, executor).with_stop_flag(stop);
    let summary = evaluator.run()?;
    let path = summary.write(&logs_dir)?;

    let counts = &summary.summary;
    eprintln!(
        "Comparisons: {} total, {} enqueued, {} completed, {} failed, {} skipped ({} missing)",
        counts.total_comparisons,
        counts.enqueued,
        counts.completed,
        counts.failed,
        counts.skipped,
        counts.skipped_due_to_missing
    );
    eprintln!("Metrics: {}", summary.metrics);
    eprintln!("Batch summary written to {}", path.display());

    Ok(if summary.interrupted { 130 } else { 0 })
}
