//! Configuration file loading and discovery.
//!
//! Supports loading configuration from YAML files with automatic discovery.

use super::types::{AppConfig, ExecutorKind};
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration File Discovery
// ============================================================================

/// Standard config file names to search for.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".firmsim.yaml",
    ".firmsim.yml",
    "firmsim.yaml",
    "firmsim.yml",
    ".firmsimrc",
];

/// Discover a config file by searching standard locations.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Current directory
/// 3. Git repository root (if in a repo)
/// 4. User config directory (~/.config/firmsim/)
/// 5. Home directory
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    if let Some(path) = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_config_in_dir(&cwd))
    {
        return Some(path);
    }

    if let Some(path) = find_git_root().and_then(|root| find_config_in_dir(&root)) {
        return Some(path);
    }

    if let Some(path) = user_config_dir().and_then(|dir| find_config_in_dir(&dir)) {
        return Some(path);
    }

    dirs::home_dir().and_then(|home| find_config_in_dir(&home))
}

/// `~/.config/firmsim` or the platform equivalent.
#[must_use]
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("firmsim"))
}

/// Find a config file in a specific directory.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Find the git repository root by walking up the directory tree.
fn find_git_root() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let mut current = cwd.as_path();

    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

// ============================================================================
// Configuration File Loading
// ============================================================================

/// Error type for config file operations.
#[derive(Debug)]
pub enum ConfigFileError {
    /// File not found
    NotFound(PathBuf),
    /// IO error reading file
    Io(std::io::Error),
    /// YAML parsing error
    Parse(serde_yaml_ng::Error),
}

impl std::fmt::Display for ConfigFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => {
                write!(f, "Config file not found: {}", path.display())
            }
            Self::Io(e) => write!(f, "Failed to read config file: {e}"),
            Self::Parse(e) => write!(f, "Failed to parse config file: {e}"),
        }
    }
}

impl std::error::Error for ConfigFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigFileError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_yaml_ng::Error> for ConfigFileError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        Self::Parse(err)
    }
}

/// Load an `AppConfig` from a YAML file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml_ng::from_str(&content)?;
    Ok(config)
}

/// Load config from discovered file, or return default.
#[must_use]
pub fn load_or_default(explicit_path: Option<&Path>) -> (AppConfig, Option<PathBuf>) {
    discover_config_file(explicit_path).map_or_else(
        || (AppConfig::default(), None),
        |path| match load_config_file(&path) {
            Ok(config) => (config, Some(path)),
            Err(e) => {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                (AppConfig::default(), None)
            }
        },
    )
}

// ============================================================================
// Configuration Merging
// ============================================================================

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub similarity_threshold: Option<f64>,
    pub result_dir: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
    pub no_persist: bool,
    pub workers: Option<usize>,
    pub data_dir: Option<PathBuf>,
    pub dataset: Option<PathBuf>,
    pub executor: Option<ExecutorKind>,
}

impl AppConfig {
    /// Apply command-line overrides on top of this config.
    pub fn merge(&mut self, overrides: &ConfigOverrides) {
        if let Some(threshold) = overrides.similarity_threshold {
            self.similarity_threshold = threshold;
        }
        if let Some(ref dir) = overrides.result_dir {
            self.output.result_dir.clone_from(dir);
        }
        if let Some(ref dir) = overrides.logs_dir {
            self.output.logs_dir.clone_from(dir);
        }
        if overrides.no_persist {
            self.output.persist = false;
        }
        if let Some(workers) = overrides.workers {
            self.batch.workers = workers;
        }
        if overrides.data_dir.is_some() {
            self.batch.data_dir.clone_from(&overrides.data_dir);
        }
        if overrides.dataset.is_some() {
            self.batch.dataset.clone_from(&overrides.dataset);
        }
        if let Some(executor) = overrides.executor {
            self.batch.executor = executor;
        }
    }

    /// Load from file and merge with CLI overrides.
    #[must_use]
    pub fn from_file_with_overrides(
        config_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> (Self, Option<PathBuf>) {
        let (mut config, loaded_from) = load_or_default(config_path);
        config.merge(overrides);
        (config, loaded_from)
    }
}

// ============================================================================
// Example Config Generation
// ============================================================================

/// Generate an example config file content from the defaults.
#[must_use]
pub fn generate_example_config() -> String {
    let example = AppConfig::default();
    format!(
        r"# firmsim configuration
# Place this file at .firmsim.yaml in your working directory or ~/.config/firmsim/

{}
",
        serde_yaml_ng::to_string(&example).unwrap_or_default()
    )
}

/// Generate a commented example config with all options.
#[must_use]
pub fn generate_full_example_config() -> String {
    r#"# firmsim configuration file
# ==========================
#
# Place it at:
#   - .firmsim.yaml in the working directory
#   - ~/.config/firmsim/firmsim.yaml for global config
#
# CLI arguments always override file settings. Path templates are relative
# to the firmware root; {firmware_name} is the root's basename and
# {firmware_dir} the first directory under output_json/.

# Overall score at or above which a pair is predicted similar
similarity_threshold: 0.5

modules:
  binwalk:
    enabled: true
    weight: 0.1
    config:
      binwalk_file1: "binwalk_docker_result/binwalk_log/{firmware_dir}.json"
      binwalk_file2: "binwalk_docker_result/binwalk_log/{firmware_dir}.json"
      ngram_sizes: [3]

  interface_exposure:
    enabled: true
    weight: 0.3
    config:
      api_weight: 0.3333333333333333
      param_weight: 0.3333333333333333
      structural_summary_weight: 0.3333333333333333
      fallback_interface_file: "output_json/{firmware_dir}/func_name.txt"

  param_chain:
    enabled: true
    weight: 0.3
    config:
      param_file1: "output_json/{firmware_name}/param_link.json"
      param_file2: "output_json/{firmware_name}/param_link.json"
      max_links_per_length: 5

  symbol_inventory:
    enabled: true
    weight: 0.1
    config:
      folder1: "output_json/{firmware_dir}"
      folder2: "output_json/{firmware_dir}"
      exports_weight: 1.0
      imports_weight: 1.0
      symbols_weight: 1.0
      funcs_weight: 1.0

  filesystem_profile:
    enabled: true
    weight: 0.2
    config:
      structure_weight: 0.3
      sensitive_weight: 0.3
      binary_weight: 0.4
      # sha256 or sha512
      hash_algorithm: sha256
      # Fuzzy-hash score (0-100) a candidate must exceed
      similarity_threshold: 50
      match_weight: 0.5
      sim_weight: 0.5
      num_perm: 128
      min_string_length: 4
      # group_weights:
      #   web: 2.0
      #   bin: 1.5

output:
  result_dir: comparison_results
  logs_dir: logs
  persist: true

batch:
  workers: 4
  # data_dir: ./firmware
  # dataset: ./dataset.csv
  label_column: 1
  poll_interval_ms: 1000
  stall_polls: 30
  grace_period_secs: 5
  # subprocess or in-process
  executor: subprocess
"#
    .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_dir() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(".firmsim.yaml");
        std::fs::write(&config_path, "similarity_threshold: 0.6\n").unwrap();

        let found = find_config_in_dir(tmp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_dir_not_found() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_config_in_dir(tmp.path()), None);
    }

    #[test]
    fn test_load_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.yaml");

        let yaml = r#"
similarity_threshold: 0.65
modules:
  binwalk:
    weight: 0.25
    config:
      ngram_sizes: [2, 3]
batch:
  workers: 2
"#;
        std::fs::write(&config_path, yaml).unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.similarity_threshold, 0.65);
        assert_eq!(config.modules.binwalk.weight, Some(0.25));
        assert_eq!(config.modules.binwalk.config.ngram_sizes, vec![2, 3]);
        assert_eq!(
            config.modules.binwalk.config.binwalk_file1,
            "binwalk_docker_result/binwalk_log/{firmware_dir}.json"
        );
        assert_eq!(config.batch.workers, 2);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigFileError::NotFound(_))));
    }

    #[test]
    fn test_config_merge() {
        let mut base = AppConfig::default();
        let overrides = ConfigOverrides {
            similarity_threshold: Some(0.8),
            workers: Some(16),
            no_persist: true,
            ..ConfigOverrides::default()
        };

        base.merge(&overrides);

        assert_eq!(base.similarity_threshold, 0.8);
        assert_eq!(base.batch.workers, 16);
        assert!(!base.output.persist);
        assert_eq!(base.output.result_dir, PathBuf::from("comparison_results"));
    }

    #[test]
    fn test_full_example_config_parses() {
        let config: AppConfig = serde_yaml_ng::from_str(&generate_full_example_config()).unwrap();
        assert_eq!(config.modules.interface_exposure.weight, Some(0.3));
        assert_eq!(config.batch.executor, ExecutorKind::Subprocess);
    }

    #[test]
    fn test_generate_example_config() {
        let example = generate_example_config();
        assert!(example.contains("modules:"));
        assert!(example.contains("similarity_threshold"));
    }

    #[test]
    fn test_discover_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("custom-config.yaml");
        std::fs::write(&config_path, "batch:\n  workers: 1\n").unwrap();

        let discovered = discover_config_file(Some(&config_path));
        assert_eq!(discovered, Some(config_path));
    }
}
