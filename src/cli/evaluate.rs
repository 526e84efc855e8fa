//! Evaluate command handler.
//!
//! Scores stored comparison summaries against the dataset without running
//! any comparison.

use crate::batch::{evaluate_prior, Dataset, EvaluationReport, PriorResults};
use crate::config::AppConfig;
use crate::modules::ModuleRegistry;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::path::PathBuf;

/// Evaluate command configuration
#[derive(Debug, Clone, Default)]
pub struct EvaluateOptions {
    /// Recompute totals with the configured module weights
    pub reweight: bool,
    /// Print the report as JSON
    pub json: bool,
    /// List every evaluated pair
    pub show_pairs: bool,
    /// Write the JSON report here
    pub output_file: Option<PathBuf>,
}

/// Run the evaluate command.
pub fn run_evaluate(config: &AppConfig, options: &EvaluateOptions) -> Result<()> {
    let dataset_path = config
        .batch
        .dataset
        .as_deref()
        .context("no dataset given (--dataset or batch.dataset)")?;
    let dataset = Dataset::load(dataset_path, config.batch.label_column)?;
    let prior = PriorResults::scan(&config.output.result_dir);

    let weights = options.reweight.then(|| configured_weights(config));
    let report = evaluate_prior(&prior, &dataset, config.similarity_threshold, weights.as_ref());

    if let Some(ref path) = options.output_file {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("Report written to {}", path.display());
    }
    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, options.show_pairs);
    }
    Ok(())
}

/// Module weights of the enabled modules.
fn configured_weights(config: &AppConfig) -> IndexMap<String, f64> {
    ModuleRegistry::from_config(&config.modules)
        .iter()
        .map(|m| (m.module.name().to_string(), m.weight))
        .collect()
}

fn print_report(report: &EvaluationReport, show_pairs: bool) {
    println!("Threshold: {}", report.threshold);
    if let Some(ref weights) = report.weights {
        let listed: Vec<String> = weights.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!("Weights: {}", listed.join(", "));
    }
    println!(
        "Pairs: {} ({} at or above threshold, {} below)",
        report.pairs_evaluated, report.above_threshold, report.below_threshold
    );
    let c = &report.confusion;
    println!(
        "TP {}  TN {}  FP {}  FN {}",
        c.true_positives, c.true_negatives, c.false_positives, c.false_negatives
    );
    let m = &report.metrics;
    println!("Precision:           {:.4}", m.precision);
    println!("Recall:              {:.4}", m.recall);
    println!("False positive rate: {:.4}", m.false_positive_rate);
    println!("False negative rate: {:.4}", m.false_negative_rate);
    println!("Accuracy:            {:.4}", m.accuracy);

    if show_pairs {
        println!();
        for p in &report.pairs {
            println!(
                "  {:<50} {:.4} expected={} predicted={}",
                p.pair.to_string(),
                p.similarity,
                p.expected_similar,
                p.predicted_similar
            );
        }
    }
}
