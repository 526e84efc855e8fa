//! CLI command handlers.
//!
//! This module provides testable command handlers that are invoked by main.rs.
//! Each handler implements the business logic for a specific CLI subcommand.

mod batch;
mod compare;
mod evaluate;

pub use batch::{run_batch, BatchOptions};
pub use compare::{run_compare, CompareOptions, CompareReport};
pub use evaluate::{run_evaluate, EvaluateOptions};

use crate::config::{AppConfig, Validatable};

/// Fail with every validation problem listed.
pub fn ensure_valid(config: &AppConfig) -> anyhow::Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }
    let listed: Vec<String> = errors.iter().map(ToString::to_string).collect();
    anyhow::bail!("invalid configuration:\n  {}", listed.join("\n  "))
}

/// Split a `--modules a,b` value.
#[must_use]
pub fn parse_module_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_module_list() {
        assert_eq!(
            parse_module_list(" binwalk, ,param_chain "),
            vec!["binwalk", "param_chain"]
        );
        assert!(parse_module_list("").is_empty());
    }

    #[test]
    fn test_invalid_config_lists_fields() {
        let config = AppConfig::builder().similarity_threshold(2.0).build();
        let err = ensure_valid(&config).unwrap_err().to_string();
        assert!(err.contains("similarity_threshold"), "{err}");
    }
}
