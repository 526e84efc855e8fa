//! **Firmware-pair similarity scoring.**
//!
//! `firmsim` compares two directories of pre-extracted firmware features
//! (binwalk signatures, exposed interfaces, parameter call chains, symbol
//! inventories and filesystem profiles) and produces a similarity score in
//! `[0, 1]`. A batch evaluator runs the comparison over a whole corpus and
//! scores the predictions against a labeled dataset.
//!
//! ## Core Concepts & Modules
//!
//! - **[`features`]**: [`FeatureLocation`] names one firmware's feature
//!   directory and expands artifact path templates against it.
//! - **[`modules`]**: the [`ComparisonModule`] trait, the five built-in
//!   modules and the [`ModuleRegistry`] that instantiates them from
//!   configuration.
//! - **[`orchestrator`]**: [`ComparisonOrchestrator`] runs every registered
//!   module on a pair and aggregates a weighted overall score.
//! - **[`batch`]**: dataset parsing, task planning, a worker pool and
//!   confusion-matrix metrics.
//! - **[`similarity`]**: the shared similarity primitives.
//!
//! ## Comparing Two Firmwares
//!
//! ```no_run
//! use firmsim::{AppConfig, ComparisonOrchestrator, FeatureLocation};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::builder().persist(false).build();
//!     let orchestrator = ComparisonOrchestrator::from_config(&config, None)?;
//!
//!     let fw1 = FeatureLocation::resolve("data/fw_a", None);
//!     let fw2 = FeatureLocation::resolve("data/fw_b", None);
//!     let outcome = orchestrator.compare(&fw1, &fw2)?;
//!
//!     println!("Overall similarity: {:.4}", outcome.total_similarity());
//!     Ok(())
//! }
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    // Counts become f64 ratios throughout the similarity code
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::similar_names
)]

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod modules;
pub mod orchestrator;
pub mod similarity;

// Re-export main types for convenience
pub use batch::{BatchEvaluator, BatchSummary, ClassificationMetrics, ConfusionMatrix, Dataset, FirmwarePair};
pub use config::{AppConfig, AppConfigBuilder, ConfigError, ModulesConfig, OutputConfig, Validatable};
pub use error::{ErrorContext, FirmsimError, OptionContext, Result};
pub use features::FeatureLocation;
pub use modules::{ComparisonModule, ModuleKind, ModuleOutcome, ModuleRegistry};
pub use orchestrator::{ComparisonOrchestrator, ComparisonOutcome, ComparisonSummary, ModuleResult};
