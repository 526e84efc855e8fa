//! Configuration types for firmsim operations.
//!
//! Provides structured configuration for comparisons, the comparison modules
//! and batch evaluation.

use super::defaults::{self, templates};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Unified Application Configuration
// ============================================================================

/// Unified application configuration that can be loaded from CLI args or config files.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppConfig {
    /// Overall score at or above which a pair is predicted similar
    #[schemars(range(min = 0.0, max = 1.0))]
    pub similarity_threshold: f64,
    /// Comparison modules, their weights and parameters
    pub modules: ModulesConfig,
    /// Where comparison artifacts and logs are written
    pub output: OutputConfig,
    /// Batch evaluation settings
    pub batch: BatchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: defaults::DEFAULT_SIMILARITY_THRESHOLD,
            modules: ModulesConfig::default(),
            output: OutputConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl AppConfig {
    /// Create a new `AppConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an `AppConfig` builder.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

// ============================================================================
// Builder for AppConfig
// ============================================================================

/// Builder for constructing `AppConfig` with fluent API.
#[derive(Debug, Default)]
#[must_use]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the prediction threshold.
    pub const fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the comparison result directory.
    pub fn result_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output.result_dir = dir.into();
        self
    }

    /// Set the log directory.
    pub fn logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output.logs_dir = dir.into();
        self
    }

    /// Enable or disable writing comparison artifacts.
    pub const fn persist(mut self, persist: bool) -> Self {
        self.config.output.persist = persist;
        self
    }

    /// Set the number of batch workers.
    pub const fn workers(mut self, workers: usize) -> Self {
        self.config.batch.workers = workers;
        self
    }

    /// Set the batch executor kind.
    pub const fn executor(mut self, executor: ExecutorKind) -> Self {
        self.config.batch.executor = executor;
        self
    }

    /// Replace the module configuration.
    pub fn modules(mut self, modules: ModulesConfig) -> Self {
        self.config.modules = modules;
        self
    }

    /// Build the `AppConfig`.
    #[must_use]
    pub fn build(self) -> AppConfig {
        self.config
    }
}

// ============================================================================
// Module Configuration
// ============================================================================

/// One comparison module's switch, weight and parameters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(
    default,
    bound(
        serialize = "C: Serialize + Default + JsonSchema",
        deserialize = "C: Deserialize<'de> + Default"
    )
)]
#[schemars(bound = "C: JsonSchema + Default")]
pub struct ModuleEntry<C> {
    /// Whether the module participates in comparisons
    pub enabled: bool,
    /// Weight in the overall score (module default when omitted)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Module-specific parameters
    pub config: C,
}

impl<C: Default> Default for ModuleEntry<C> {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: None,
            config: C::default(),
        }
    }
}

impl<C> ModuleEntry<C> {
    /// Effective weight, falling back to `default_weight`.
    #[must_use]
    pub fn weight_or(&self, default_weight: f64) -> f64 {
        self.weight.unwrap_or(default_weight)
    }
}

/// The five comparison modules.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ModulesConfig {
    /// Binwalk signature n-gram comparison
    pub binwalk: ModuleEntry<BinwalkConfig>,
    /// Exposed interface paths and parameter names
    #[serde(alias = "interface_exposure_profile")]
    pub interface_exposure: ModuleEntry<InterfaceExposureConfig>,
    /// Parameter call-chain edit distance
    #[serde(alias = "param")]
    pub param_chain: ModuleEntry<ParamChainConfig>,
    /// Exported, imported, symbol and function name inventories
    #[serde(alias = "ghidra")]
    pub symbol_inventory: ModuleEntry<SymbolInventoryConfig>,
    /// Filesystem layout, sensitive resources and binary signatures
    pub filesystem_profile: ModuleEntry<FilesystemProfileConfig>,
}

/// Binwalk module parameters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BinwalkConfig {
    /// Binwalk log template for the first firmware
    pub binwalk_file1: String,
    /// Binwalk log template for the second firmware
    pub binwalk_file2: String,
    /// N-gram sizes; n-grams of every size are pooled
    pub ngram_sizes: Vec<usize>,
}

impl Default for BinwalkConfig {
    fn default() -> Self {
        Self {
            binwalk_file1: defaults::DEFAULT_BINWALK_TEMPLATE.to_string(),
            binwalk_file2: defaults::DEFAULT_BINWALK_TEMPLATE.to_string(),
            ngram_sizes: vec![defaults::DEFAULT_NGRAM_SIZE],
        }
    }
}

/// Interface-exposure module parameters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct InterfaceExposureConfig {
    /// Interface-path file templates, first existing wins
    pub interface_candidates: Vec<String>,
    /// Parameter-name file templates, first existing wins
    pub param_candidates: Vec<String>,
    /// Used when no interface-path candidate exists for a side
    pub fallback_interface_file: String,
    /// Weight of the interface-path term
    pub api_weight: f64,
    /// Weight of the parameter-name term
    pub param_weight: f64,
    /// Weight of the structural summary term
    pub structural_summary_weight: f64,
}

impl Default for InterfaceExposureConfig {
    fn default() -> Self {
        Self {
            interface_candidates: templates(defaults::DEFAULT_INTERFACE_CANDIDATES),
            param_candidates: templates(defaults::DEFAULT_PARAM_NAME_CANDIDATES),
            fallback_interface_file: defaults::DEFAULT_FUNC_NAME_TEMPLATE.to_string(),
            api_weight: 1.0 / 3.0,
            param_weight: 1.0 / 3.0,
            structural_summary_weight: 1.0 / 3.0,
        }
    }
}

/// Parameter call-chain module parameters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ParamChainConfig {
    /// `param_link.json` template for the first firmware
    pub param_file1: String,
    /// `param_link.json` template for the second firmware
    pub param_file2: String,
    /// Chains sampled per side for each chain length
    pub max_links_per_length: usize,
}

impl Default for ParamChainConfig {
    fn default() -> Self {
        Self {
            param_file1: defaults::DEFAULT_PARAM_LINK_TEMPLATE.to_string(),
            param_file2: defaults::DEFAULT_PARAM_LINK_TEMPLATE.to_string(),
            max_links_per_length: defaults::DEFAULT_MAX_LINKS_PER_LENGTH,
        }
    }
}

/// Symbol-inventory module parameters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SymbolInventoryConfig {
    /// Folder template holding the first firmware's inventories
    pub folder1: String,
    /// Folder template holding the second firmware's inventories
    pub folder2: String,
    pub exports_weight: f64,
    pub imports_weight: f64,
    pub symbols_weight: f64,
    pub funcs_weight: f64,
}

impl Default for SymbolInventoryConfig {
    fn default() -> Self {
        Self {
            folder1: defaults::DEFAULT_SYMBOL_FOLDER_TEMPLATE.to_string(),
            folder2: defaults::DEFAULT_SYMBOL_FOLDER_TEMPLATE.to_string(),
            exports_weight: 1.0,
            imports_weight: 1.0,
            symbols_weight: 1.0,
            funcs_weight: 1.0,
        }
    }
}

/// Content hash used to find exact binary matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

/// Filesystem-profile module parameters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FilesystemProfileConfig {
    /// `output.json` template for the first firmware
    pub output_file1: String,
    /// `output.json` template for the second firmware
    pub output_file2: String,
    /// String inventory template for the first firmware
    pub string_file1: String,
    /// String inventory template for the second firmware
    pub string_file2: String,
    /// Folder template holding per-binary `*_strings.txt` files
    pub all_strings_dir: String,
    pub structure_weight: f64,
    pub sensitive_weight: f64,
    pub binary_weight: f64,
    /// Content hash for exact binary matching
    pub hash_algorithm: HashAlgorithm,
    /// Fuzzy-hash score (0-100) a candidate must exceed
    #[schemars(range(max = 100))]
    pub similarity_threshold: u32,
    /// Weight of the exact-match ratio in the hash term
    pub match_weight: f64,
    /// Weight of the fuzzy-similarity ratio in the hash term
    pub sim_weight: f64,
    /// MinHash permutations for the string inventory
    pub num_perm: usize,
    /// Shorter string lines are ignored in string-group comparison
    pub min_string_length: usize,
    /// Per string-group weights; unlisted groups weigh 1.0
    pub group_weights: IndexMap<String, f64>,
}

impl Default for FilesystemProfileConfig {
    fn default() -> Self {
        Self {
            output_file1: defaults::DEFAULT_OUTPUT_JSON_TEMPLATE.to_string(),
            output_file2: defaults::DEFAULT_OUTPUT_JSON_TEMPLATE.to_string(),
            string_file1: defaults::DEFAULT_STRING_FILE_TEMPLATE.to_string(),
            string_file2: defaults::DEFAULT_STRING_FILE_TEMPLATE.to_string(),
            all_strings_dir: defaults::DEFAULT_ALL_STRINGS_TEMPLATE.to_string(),
            structure_weight: 0.3,
            sensitive_weight: 0.3,
            binary_weight: 0.4,
            hash_algorithm: HashAlgorithm::default(),
            similarity_threshold: defaults::DEFAULT_FUZZY_THRESHOLD,
            match_weight: 0.5,
            sim_weight: 0.5,
            num_perm: crate::similarity::DEFAULT_NUM_PERM,
            min_string_length: defaults::DEFAULT_MIN_STRING_LENGTH,
            group_weights: IndexMap::new(),
        }
    }
}

impl FilesystemProfileConfig {
    /// Weight for a string group.
    #[must_use]
    pub fn group_weight(&self, group: &str) -> f64 {
        self.group_weights.get(group).copied().unwrap_or(1.0)
    }
}

// ============================================================================
// Output Configuration
// ============================================================================

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Root for per-comparison result directories
    pub result_dir: PathBuf,
    /// Directory for batch logs and batch summaries
    pub logs_dir: PathBuf,
    /// Write per-module details and comparison summaries
    pub persist: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            result_dir: PathBuf::from(defaults::DEFAULT_RESULT_DIR),
            logs_dir: PathBuf::from(defaults::DEFAULT_LOGS_DIR),
            persist: true,
        }
    }
}

// ============================================================================
// Batch Configuration
// ============================================================================

/// How batch workers run a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorKind {
    /// Spawn `firmsim compare` as a child process per task
    #[default]
    Subprocess,
    /// Run the orchestrator on the worker thread
    InProcess,
}

/// Batch evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Directory whose sub-directories form the firmware corpus
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Labeled dataset CSV
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<PathBuf>,
    /// Column index of the label; the base firmware follows it
    pub label_column: usize,
    /// Coordinator poll interval in milliseconds
    pub poll_interval_ms: u64,
    /// Empty polls before worker liveness is checked
    pub stall_polls: u32,
    /// Seconds to wait for workers after cancellation
    pub grace_period_secs: u64,
    /// How each comparison is executed
    pub executor: ExecutorKind,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: defaults::DEFAULT_WORKERS,
            data_dir: None,
            dataset: None,
            label_column: defaults::DEFAULT_LABEL_COLUMN,
            poll_interval_ms: defaults::DEFAULT_POLL_INTERVAL_MS,
            stall_polls: defaults::DEFAULT_STALL_POLLS,
            grace_period_secs: defaults::DEFAULT_GRACE_PERIOD_SECS,
            executor: ExecutorKind::default(),
        }
    }
}
