//! Configuration validation for firmsim.
//!
//! Provides validation traits and implementations for all configuration types.

use super::types::{
    AppConfig, BatchConfig, BinwalkConfig, FilesystemProfileConfig, InterfaceExposureConfig,
    ModulesConfig, ParamChainConfig, SymbolInventoryConfig,
};

// ============================================================================
// Configuration Error
// ============================================================================

/// Error type for configuration validation.
#[derive(Debug, Clone)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the validation error
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

/// Trait for validatable configuration types.
pub trait Validatable {
    /// Validate the configuration, returning any errors found.
    fn validate(&self) -> Vec<ConfigError>;

    /// Check if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

fn check_weight(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.push(ConfigError::new(
            field,
            format!("Weight must be a non-negative number, got {value}"),
        ));
    }
}

fn check_template(errors: &mut Vec<ConfigError>, field: &str, template: &str) {
    if template.trim().is_empty() {
        errors.push(ConfigError::new(field, "Path template must not be empty"));
    }
}

// ============================================================================
// Validation Implementations
// ============================================================================

impl Validatable for AppConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            errors.push(ConfigError::new(
                "similarity_threshold",
                format!(
                    "Threshold must be between 0.0 and 1.0, got {}",
                    self.similarity_threshold
                ),
            ));
        }
        errors.extend(self.modules.validate());
        errors.extend(self.batch.validate());
        errors
    }
}

impl Validatable for ModulesConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let entries = [
            ("binwalk", self.binwalk.enabled, self.binwalk.weight),
            (
                "interface_exposure",
                self.interface_exposure.enabled,
                self.interface_exposure.weight,
            ),
            ("param_chain", self.param_chain.enabled, self.param_chain.weight),
            (
                "symbol_inventory",
                self.symbol_inventory.enabled,
                self.symbol_inventory.weight,
            ),
            (
                "filesystem_profile",
                self.filesystem_profile.enabled,
                self.filesystem_profile.weight,
            ),
        ];
        for (name, _, weight) in &entries {
            if let Some(weight) = weight {
                check_weight(&mut errors, &format!("modules.{name}.weight"), *weight);
            }
        }
        if !entries.iter().any(|(_, enabled, _)| *enabled) {
            errors.push(ConfigError::new("modules", "At least one module must be enabled"));
        }

        errors.extend(self.binwalk.config.validate());
        errors.extend(self.interface_exposure.config.validate());
        errors.extend(self.param_chain.config.validate());
        errors.extend(self.symbol_inventory.config.validate());
        errors.extend(self.filesystem_profile.config.validate());
        errors
    }
}

impl Validatable for BinwalkConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        check_template(&mut errors, "modules.binwalk.config.binwalk_file1", &self.binwalk_file1);
        check_template(&mut errors, "modules.binwalk.config.binwalk_file2", &self.binwalk_file2);
        if self.ngram_sizes.is_empty() || self.ngram_sizes.contains(&0) {
            errors.push(ConfigError::new(
                "modules.binwalk.config.ngram_sizes",
                "N-gram sizes must be a non-empty list of positive integers",
            ));
        }
        errors
    }
}

impl Validatable for InterfaceExposureConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let prefix = "modules.interface_exposure.config";
        if self.interface_candidates.is_empty() {
            errors.push(ConfigError::new(
                format!("{prefix}.interface_candidates"),
                "At least one candidate template is required",
            ));
        }
        if self.param_candidates.is_empty() {
            errors.push(ConfigError::new(
                format!("{prefix}.param_candidates"),
                "At least one candidate template is required",
            ));
        }
        check_weight(&mut errors, &format!("{prefix}.api_weight"), self.api_weight);
        check_weight(&mut errors, &format!("{prefix}.param_weight"), self.param_weight);
        check_weight(
            &mut errors,
            &format!("{prefix}.structural_summary_weight"),
            self.structural_summary_weight,
        );
        errors
    }
}

impl Validatable for ParamChainConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        check_template(&mut errors, "modules.param_chain.config.param_file1", &self.param_file1);
        check_template(&mut errors, "modules.param_chain.config.param_file2", &self.param_file2);
        if self.max_links_per_length == 0 {
            errors.push(ConfigError::new(
                "modules.param_chain.config.max_links_per_length",
                "Must be at least 1",
            ));
        }
        errors
    }
}

impl Validatable for SymbolInventoryConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let prefix = "modules.symbol_inventory.config";
        check_template(&mut errors, &format!("{prefix}.folder1"), &self.folder1);
        check_template(&mut errors, &format!("{prefix}.folder2"), &self.folder2);
        for (name, weight) in [
            ("exports_weight", self.exports_weight),
            ("imports_weight", self.imports_weight),
            ("symbols_weight", self.symbols_weight),
            ("funcs_weight", self.funcs_weight),
        ] {
            check_weight(&mut errors, &format!("{prefix}.{name}"), weight);
        }
        errors
    }
}

impl Validatable for FilesystemProfileConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let prefix = "modules.filesystem_profile.config";
        for (name, weight) in [
            ("structure_weight", self.structure_weight),
            ("sensitive_weight", self.sensitive_weight),
            ("binary_weight", self.binary_weight),
            ("match_weight", self.match_weight),
            ("sim_weight", self.sim_weight),
        ] {
            check_weight(&mut errors, &format!("{prefix}.{name}"), weight);
        }
        for (group, weight) in &self.group_weights {
            check_weight(&mut errors, &format!("{prefix}.group_weights.{group}"), *weight);
        }
        if self.similarity_threshold > 100 {
            errors.push(ConfigError::new(
                format!("{prefix}.similarity_threshold"),
                format!(
                    "Fuzzy-hash threshold must be between 0 and 100, got {}",
                    self.similarity_threshold
                ),
            ));
        }
        if self.num_perm == 0 {
            errors.push(ConfigError::new(format!("{prefix}.num_perm"), "Must be at least 1"));
        }
        errors
    }
}

impl Validatable for BatchConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.workers == 0 {
            errors.push(ConfigError::new("batch.workers", "At least one worker is required"));
        }
        if self.poll_interval_ms == 0 {
            errors.push(ConfigError::new("batch.poll_interval_ms", "Must be at least 1"));
        }
        if self.stall_polls == 0 {
            errors.push(ConfigError::new("batch.stall_polls", "Must be at least 1"));
        }
        if let Some(ref dir) = self.data_dir {
            if !dir.is_dir() {
                errors.push(ConfigError::new(
                    "batch.data_dir",
                    format!("Not a directory: {}", dir.display()),
                ));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let errors = AppConfig::default().validate();
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_threshold_out_of_range() {
        let config = AppConfig::builder().similarity_threshold(1.5).build();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "similarity_threshold"));
    }

    #[test]
    fn test_negative_module_weight() {
        let mut config = AppConfig::default();
        config.modules.binwalk.weight = Some(-0.1);
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "modules.binwalk.weight"));
    }

    #[test]
    fn test_all_modules_disabled() {
        let mut modules = ModulesConfig::default();
        modules.binwalk.enabled = false;
        modules.interface_exposure.enabled = false;
        modules.param_chain.enabled = false;
        modules.symbol_inventory.enabled = false;
        modules.filesystem_profile.enabled = false;
        assert!(!modules.is_valid());
    }

    #[test]
    fn test_zero_ngram_size_rejected() {
        let config = BinwalkConfig {
            ngram_sizes: vec![2, 0],
            ..BinwalkConfig::default()
        };
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = BatchConfig {
            workers: 0,
            ..BatchConfig::default()
        };
        assert!(config.validate().iter().any(|e| e.field == "batch.workers"));
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::new("batch.workers", "bad");
        assert_eq!(err.to_string(), "batch.workers: bad");
    }
}
