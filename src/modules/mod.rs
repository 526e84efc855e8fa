//! Pluggable firmware comparison modules.
//!
//! Each module reads its own artifacts for two [`FeatureLocation`]s and
//! produces a score in `[0, 1]` with a structured details record. The set of
//! built-in modules is closed ([`ModuleKind`]); which of them run and how
//! much they weigh is configuration.

mod binwalk;
mod filesystem;
mod interface_exposure;
mod param_chain;
mod registry;
mod symbol_inventory;

pub use binwalk::BinwalkModule;
pub use filesystem::FilesystemProfileModule;
pub use interface_exposure::InterfaceExposureModule;
pub use param_chain::{normalize_chain, ParamChainModule};
pub use registry::{ModuleRegistry, RegisteredModule};
pub use symbol_inventory::SymbolInventoryModule;

use crate::config::defaults;
use crate::error::Result;
use crate::features::FeatureLocation;
use serde::{Deserialize, Serialize};

/// Score and explanation produced by one module for one firmware pair.
#[derive(Debug, Clone)]
#[must_use]
pub struct ModuleOutcome {
    /// Similarity in `[0, 1]`
    pub similarity: f64,
    /// Module-specific details, persisted verbatim
    pub details: serde_json::Value,
}

impl ModuleOutcome {
    /// Build an outcome from any serializable details record.
    pub fn new<D: Serialize>(similarity: f64, details: &D) -> Self {
        Self {
            similarity: similarity.clamp(0.0, 1.0),
            details: serde_json::to_value(details).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// A comparison strategy over two firmware feature directories.
pub trait ComparisonModule: Send + Sync {
    /// Stable module name used in configuration and output paths.
    fn name(&self) -> &str;

    /// Compare two firmwares.
    ///
    /// Errors abort only this module; the orchestrator records them and
    /// keeps the module's weight.
    fn calculate_similarity(
        &self,
        fw1: &FeatureLocation,
        fw2: &FeatureLocation,
    ) -> Result<ModuleOutcome>;
}

/// The built-in modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Binwalk,
    InterfaceExposure,
    ParamChain,
    SymbolInventory,
    FilesystemProfile,
}

impl ModuleKind {
    /// Every module in execution order.
    pub const ALL: [Self; 5] = [
        Self::Binwalk,
        Self::InterfaceExposure,
        Self::ParamChain,
        Self::SymbolInventory,
        Self::FilesystemProfile,
    ];

    /// Canonical name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Binwalk => "binwalk",
            Self::InterfaceExposure => "interface_exposure",
            Self::ParamChain => "param_chain",
            Self::SymbolInventory => "symbol_inventory",
            Self::FilesystemProfile => "filesystem_profile",
        }
    }

    /// Look up a module by canonical or legacy name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "binwalk" => Some(Self::Binwalk),
            "interface_exposure" | "interface_exposure_profile" => Some(Self::InterfaceExposure),
            "param_chain" | "param" => Some(Self::ParamChain),
            "symbol_inventory" | "ghidra" => Some(Self::SymbolInventory),
            "filesystem_profile" => Some(Self::FilesystemProfile),
            _ => None,
        }
    }

    /// Weight used when the configuration gives none.
    #[must_use]
    pub const fn default_weight(&self) -> f64 {
        match self {
            Self::Binwalk => defaults::DEFAULT_BINWALK_WEIGHT,
            Self::InterfaceExposure => defaults::DEFAULT_INTERFACE_EXPOSURE_WEIGHT,
            Self::ParamChain => defaults::DEFAULT_PARAM_CHAIN_WEIGHT,
            Self::SymbolInventory => defaults::DEFAULT_SYMBOL_INVENTORY_WEIGHT,
            Self::FilesystemProfile => defaults::DEFAULT_FILESYSTEM_PROFILE_WEIGHT,
        }
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Cap a sample list for details output.
pub(crate) fn sample<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    items.iter().take(limit).cloned().collect()
}

/// Sorted sample of a set's members.
pub(crate) fn sorted_sample<'a, I>(items: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut all: Vec<String> = items.into_iter().cloned().collect();
    all.sort();
    all.truncate(limit);
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_names_round_trip() {
        for kind in ModuleKind::ALL {
            assert_eq!(ModuleKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_legacy_names() {
        assert_eq!(ModuleKind::from_name("param"), Some(ModuleKind::ParamChain));
        assert_eq!(ModuleKind::from_name("ghidra"), Some(ModuleKind::SymbolInventory));
        assert_eq!(
            ModuleKind::from_name("interface_exposure_profile"),
            Some(ModuleKind::InterfaceExposure)
        );
        assert_eq!(ModuleKind::from_name("hash"), None);
    }

    #[test]
    fn test_outcome_clamps() {
        let outcome = ModuleOutcome::new(1.0000001, &serde_json::json!({}));
        assert_eq!(outcome.similarity, 1.0);
    }
}
