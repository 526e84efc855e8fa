//! Configuration module for firmsim.
//!
//! This module provides a unified configuration system with:
//! - Type-safe configuration structures
//! - Validation for all configuration values
//! - YAML config file loading and discovery
//! - CLI argument merging
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use firmsim::config::AppConfig;
//!
//! let config = AppConfig::builder()
//!     .similarity_threshold(0.6)
//!     .workers(8)
//!     .build();
//!
//! use firmsim::config::file::load_or_default;
//! let (config, loaded_from) = load_or_default(None);
//! ```
//!
//! # Configuration File
//!
//! Place a `.firmsim.yaml` file in the working directory or `~/.config/firmsim/`:
//!
//! ```yaml
//! similarity_threshold: 0.6
//! modules:
//!   param_chain:
//!     weight: 0.4
//!     config:
//!       max_links_per_length: 8
//! ```

pub mod defaults;
pub mod file;
mod types;
mod validation;

pub use defaults::DEFAULT_SIMILARITY_THRESHOLD;
pub use types::{
    AppConfig, AppConfigBuilder, BatchConfig, BinwalkConfig, ExecutorKind,
    FilesystemProfileConfig, HashAlgorithm, InterfaceExposureConfig, ModuleEntry, ModulesConfig,
    OutputConfig, ParamChainConfig, SymbolInventoryConfig,
};
pub use validation::{ConfigError, Validatable};

pub use file::{
    discover_config_file, generate_example_config, generate_full_example_config, load_config_file,
    load_or_default, user_config_dir, ConfigFileError, ConfigOverrides, CONFIG_FILE_NAMES,
};

/// Generate a JSON Schema for the `AppConfig` configuration format.
///
/// Documents every option accepted in `.firmsim.yaml` files for editor
/// validation and autocompletion.
#[must_use]
pub fn generate_json_schema() -> String {
    let schema = schemars::schema_for!(AppConfig);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
