//! Compare command handler.
//!
//! Implements the `compare` subcommand for scoring one firmware pair.

use crate::config::AppConfig;
use crate::features::FeatureLocation;
use crate::orchestrator::{ComparisonOrchestrator, ComparisonOutcome};
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

/// Compare command configuration
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    pub firmware1: PathBuf,
    pub firmware2: PathBuf,
    pub firmware1_dir: Option<String>,
    pub firmware2_dir: Option<String>,
    /// Run exactly these modules
    pub modules: Option<Vec<String>>,
    /// Print one machine-readable JSON line instead of the text report
    pub json: bool,
}

/// Machine-readable compare output, one line on stdout.
#[derive(Debug, Serialize)]
pub struct CompareReport<'a> {
    pub firmware1: &'a str,
    pub firmware2: &'a str,
    pub total_similarity: f64,
    pub predicted_similar: bool,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<&'a PathBuf>,
    pub modules: IndexMap<&'a str, Option<f64>>,
}

impl<'a> CompareReport<'a> {
    #[must_use]
    pub fn new(outcome: &'a ComparisonOutcome, threshold: f64) -> Self {
        let summary = &outcome.summary;
        Self {
            firmware1: &summary.firmware1,
            firmware2: &summary.firmware2,
            total_similarity: summary.total_similarity,
            predicted_similar: summary.total_similarity >= threshold,
            threshold,
            output_dir: outcome.output_dir.as_ref(),
            modules: summary
                .results
                .iter()
                .map(|(name, r)| (name.as_str(), r.success.then_some(r.similarity)))
                .collect(),
        }
    }
}

/// Run the compare command.
pub fn run_compare(config: &AppConfig, options: CompareOptions) -> Result<()> {
    for root in [&options.firmware1, &options.firmware2] {
        if !root.is_dir() {
            bail!("firmware feature directory not found: {}", root.display());
        }
    }

    let orchestrator = ComparisonOrchestrator::from_config(config, options.modules.as_deref())
        .context("failed to set up comparison modules")?;
    let fw1 = FeatureLocation::resolve(&options.firmware1, options.firmware1_dir.as_deref());
    let fw2 = FeatureLocation::resolve(&options.firmware2, options.firmware2_dir.as_deref());

    let outcome = orchestrator.compare(&fw1, &fw2)?;
    let report = CompareReport::new(&outcome, config.similarity_threshold);

    if options.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_report(&report, &outcome);
    }
    Ok(())
}

fn print_report(report: &CompareReport<'_>, outcome: &ComparisonOutcome) {
    println!("{} vs {}", report.firmware1, report.firmware2);
    for (name, result) in &outcome.summary.results {
        match result.error {
            Some(ref error) => println!("  {name:<20} failed (weight {:.2}): {error}", result.weight),
            None => println!(
                "  {name:<20} {:.4} (weight {:.2})",
                result.similarity, result.weight
            ),
        }
    }
    println!();
    println!(
        "Overall similarity: {:.4} ({} at threshold {})",
        report.total_similarity,
        if report.predicted_similar { "similar" } else { "dissimilar" },
        report.threshold
    );
    if let Some(dir) = report.output_dir {
        println!("Results saved to: {}", dir.display());
    }
}
