//! Runs the registered modules over one firmware pair.
//!
//! Module failures are recorded, not propagated: a failed module scores 0
//! and keeps its weight. With persistence on, every module's details are
//! written as soon as it finishes and the summary last.

mod summary;

pub use summary::{weighted_total, ComparisonSummary, ModuleResult, SUMMARY_FILE_NAME};

use crate::config::{AppConfig, OutputConfig};
use crate::error::{ErrorContext, FirmsimError, Result};
use crate::features::FeatureLocation;
use crate::modules::ModuleRegistry;
use chrono::Local;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Result of comparing one firmware pair.
#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub summary: ComparisonSummary,
    /// Module details, keyed by module name
    pub details: IndexMap<String, serde_json::Value>,
    /// Where artifacts were written, when persisted
    pub output_dir: Option<PathBuf>,
}

impl ComparisonOutcome {
    /// Weighted overall similarity.
    #[must_use]
    pub fn total_similarity(&self) -> f64 {
        self.summary.total_similarity
    }
}

/// Drives a [`ModuleRegistry`] over firmware pairs.
#[derive(Debug)]
pub struct ComparisonOrchestrator {
    registry: ModuleRegistry,
    result_dir: PathBuf,
    persist: bool,
}

impl ComparisonOrchestrator {
    pub fn new(registry: ModuleRegistry, output: &OutputConfig) -> Self {
        Self {
            registry,
            result_dir: output.result_dir.clone(),
            persist: output.persist,
        }
    }

    /// Orchestrator over the enabled modules, or exactly `module_filter` when given.
    pub fn from_config(config: &AppConfig, module_filter: Option<&[String]>) -> Result<Self> {
        let registry = match module_filter {
            Some(names) if !names.is_empty() => {
                ModuleRegistry::from_config_filtered(&config.modules, names)?
            }
            _ => ModuleRegistry::from_config(&config.modules),
        };
        if registry.is_empty() {
            return Err(FirmsimError::config("no comparison modules selected"));
        }
        Ok(Self::new(registry, &config.output))
    }

    /// Enable or disable writing artifacts.
    #[must_use]
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    #[must_use]
    pub fn result_dir(&self) -> &Path {
        &self.result_dir
    }

    /// Compare two firmwares with every registered module.
    ///
    /// Fails only when the output directory or files cannot be written.
    pub fn compare(&self, fw1: &FeatureLocation, fw2: &FeatureLocation) -> Result<ComparisonOutcome> {
        let timestamp = Local::now();
        let output_dir = if self.persist {
            let dir = self.create_output_dir(fw1, fw2, &timestamp.format("%Y%m%d_%H%M%S").to_string())?;
            Some(dir)
        } else {
            None
        };

        tracing::info!(
            "Comparing {} and {} with {} module(s)",
            fw1.firmware_name(),
            fw2.firmware_name(),
            self.registry.len()
        );

        let mut results = IndexMap::new();
        let mut details = IndexMap::new();
        for registered in self.registry.iter() {
            let name = registered.module.name().to_string();
            let started = Instant::now();
            let (mut result, module_details) =
                match registered.module.calculate_similarity(fw1, fw2) {
                    Ok(outcome) => {
                        tracing::info!(
                            "{name}: similarity {:.4} ({:.2?})",
                            outcome.similarity,
                            started.elapsed()
                        );
                        (
                            ModuleResult::succeeded(outcome.similarity, registered.weight),
                            outcome.details,
                        )
                    }
                    Err(e) => {
                        let message = e.detailed_message();
                        tracing::warn!("{name} failed: {message}");
                        (
                            ModuleResult::failed(registered.weight, message.clone()),
                            serde_json::json!({ "error": message }),
                        )
                    }
                };

            if let Some(ref dir) = output_dir {
                result.details_file = Some(write_details(dir, &name, &module_details)?);
            }
            results.insert(name.clone(), result);
            details.insert(name, module_details);
        }

        let total_similarity =
            weighted_total(results.values().map(|r: &ModuleResult| (r.similarity, r.weight)));
        tracing::info!(
            "{} vs {}: total similarity {total_similarity:.4}",
            fw1.firmware_name(),
            fw2.firmware_name()
        );

        let summary = ComparisonSummary {
            firmware1: fw1.firmware_name().to_string(),
            firmware2: fw2.firmware_name().to_string(),
            firmware1_path: fw1.root().to_path_buf(),
            firmware2_path: fw2.root().to_path_buf(),
            firmware1_dir: fw1.firmware_dir().to_string(),
            firmware2_dir: fw2.firmware_dir().to_string(),
            timestamp,
            modules: self.registry.names(),
            results,
            total_similarity,
        };
        if let Some(ref dir) = output_dir {
            let path = summary.write(dir)?;
            tracing::debug!("Summary written to {}", path.display());
        }

        Ok(ComparisonOutcome {
            summary,
            details,
            output_dir,
        })
    }

    /// `<result_dir>/<fw1>_<fw2>_<stamp>`, suffixed when that already exists.
    fn create_output_dir(&self, fw1: &FeatureLocation, fw2: &FeatureLocation, stamp: &str) -> Result<PathBuf> {
        let base = format!("{}_{}_{stamp}", fw1.firmware_name(), fw2.firmware_name());
        let mut dir = self.result_dir.join(&base);
        let mut attempt = 1;
        while dir.exists() {
            dir = self.result_dir.join(format!("{base}_{attempt}"));
            attempt += 1;
        }
        std::fs::create_dir_all(&dir)
            .map_err(|e| FirmsimError::io(&dir, e))
            .context("creating comparison output directory")?;
        Ok(dir)
    }
}

fn write_details(dir: &Path, module: &str, details: &serde_json::Value) -> Result<PathBuf> {
    let module_dir = dir.join(module);
    std::fs::create_dir_all(&module_dir).map_err(|e| FirmsimError::io(&module_dir, e))?;
    let path = module_dir.join(format!("{module}_details.json"));
    std::fs::write(&path, serde_json::to_string_pretty(details)?)
        .map_err(|e| FirmsimError::io(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{ComparisonModule, ModuleOutcome};
    use tempfile::TempDir;

    struct Fixed(&'static str, Option<f64>);

    impl ComparisonModule for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn calculate_similarity(&self, _: &FeatureLocation, _: &FeatureLocation) -> Result<ModuleOutcome> {
            match self.1 {
                Some(score) => Ok(ModuleOutcome::new(score, &serde_json::json!({ "score": score }))),
                None => Err(FirmsimError::module_execution(self.0, "boom")),
            }
        }
    }

    fn orchestrator(result_dir: &Path, persist: bool) -> ComparisonOrchestrator {
        let mut registry = ModuleRegistry::new();
        registry.register(Box::new(Fixed("a", Some(0.8))), 0.5);
        registry.register(Box::new(Fixed("b", None)), 0.3);
        registry.register(Box::new(Fixed("c", Some(0.4))), 0.2);
        let output = OutputConfig {
            result_dir: result_dir.to_path_buf(),
            persist,
            ..OutputConfig::default()
        };
        ComparisonOrchestrator::new(registry, &output)
    }

    #[test]
    fn test_failed_module_keeps_weight() {
        let tmp = TempDir::new().unwrap();
        let fw1 = FeatureLocation::resolve(tmp.path().join("fw1"), None);
        let fw2 = FeatureLocation::resolve(tmp.path().join("fw2"), None);

        let outcome = orchestrator(tmp.path(), false).compare(&fw1, &fw2).unwrap();
        // (0.8*0.5 + 0*0.3 + 0.4*0.2) / 1.0
        assert!((outcome.total_similarity() - 0.48).abs() < 1e-12);
        let failed = &outcome.summary.results["b"];
        assert!(!failed.success);
        assert!(failed.error.as_deref().unwrap().contains("boom"));
        assert!(outcome.output_dir.is_none());
    }

    #[test]
    fn test_persisted_layout() {
        let tmp = TempDir::new().unwrap();
        let results = tmp.path().join("results");
        let fw1 = FeatureLocation::resolve(tmp.path().join("fw1"), None);
        let fw2 = FeatureLocation::resolve(tmp.path().join("fw2"), None);

        let outcome = orchestrator(&results, true).compare(&fw1, &fw2).unwrap();
        let dir = outcome.output_dir.unwrap();
        let name = dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("fw1_fw2_"), "{name}");
        assert!(dir.join("a/a_details.json").is_file());
        assert!(dir.join("b/b_details.json").is_file());

        let summary = ComparisonSummary::load(&dir.join(SUMMARY_FILE_NAME)).unwrap();
        assert_eq!(summary.modules, vec!["a", "b", "c"]);
        assert!((summary.total_similarity - 0.48).abs() < 1e-12);
    }

    #[test]
    fn test_same_second_runs_get_distinct_dirs() {
        let tmp = TempDir::new().unwrap();
        let fw = FeatureLocation::resolve(tmp.path().join("fw"), None);
        let orch = orchestrator(tmp.path(), true);
        let first = orch.create_output_dir(&fw, &fw, "20240101_000000").unwrap();
        let second = orch.create_output_dir(&fw, &fw, "20240101_000000").unwrap();
        assert_ne!(first, second);
    }
}
