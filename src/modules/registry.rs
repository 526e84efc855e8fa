//! Instantiates the enabled comparison modules from configuration.

use super::{
    BinwalkModule, ComparisonModule, FilesystemProfileModule, InterfaceExposureModule,
    ModuleKind, ParamChainModule, SymbolInventoryModule,
};
use crate::config::ModulesConfig;
use crate::error::{FirmsimError, ModuleErrorKind, Result};

/// A module together with its weight in the overall score.
pub struct RegisteredModule {
    pub module: Box<dyn ComparisonModule>,
    pub weight: f64,
}

impl std::fmt::Debug for RegisteredModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredModule")
            .field("name", &self.module.name())
            .field("weight", &self.weight)
            .finish()
    }
}

/// Ordered set of modules to run for each comparison.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<RegisteredModule>,
}

impl ModuleRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every enabled module, in [`ModuleKind::ALL`] order.
    #[must_use]
    pub fn from_config(config: &ModulesConfig) -> Self {
        let mut registry = Self::new();
        for kind in ModuleKind::ALL {
            if is_enabled(config, kind) {
                registry.push_kind(config, kind);
            }
        }
        registry
    }

    /// Exactly the named modules, regardless of their `enabled` flag.
    pub fn from_config_filtered<S: AsRef<str>>(config: &ModulesConfig, names: &[S]) -> Result<Self> {
        let mut kinds = Vec::with_capacity(names.len());
        for name in names {
            let kind = ModuleKind::from_name(name.as_ref()).ok_or_else(|| {
                FirmsimError::module(
                    "module selection",
                    ModuleErrorKind::UnknownModule(name.as_ref().to_string()),
                )
            })?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }

        let mut registry = Self::new();
        for kind in ModuleKind::ALL {
            if kinds.contains(&kind) {
                registry.push_kind(config, kind);
            }
        }
        Ok(registry)
    }

    /// Register a module with an explicit weight.
    pub fn register(&mut self, module: Box<dyn ComparisonModule>, weight: f64) {
        tracing::debug!("registered module {} (weight {weight})", module.name());
        self.modules.push(RegisteredModule { module, weight });
    }

    fn push_kind(&mut self, config: &ModulesConfig, kind: ModuleKind) {
        let (module, weight): (Box<dyn ComparisonModule>, f64) = match kind {
            ModuleKind::Binwalk => (
                Box::new(BinwalkModule::new(config.binwalk.config.clone())),
                config.binwalk.weight_or(kind.default_weight()),
            ),
            ModuleKind::InterfaceExposure => (
                Box::new(InterfaceExposureModule::new(
                    config.interface_exposure.config.clone(),
                )),
                config.interface_exposure.weight_or(kind.default_weight()),
            ),
            ModuleKind::ParamChain => (
                Box::new(ParamChainModule::new(config.param_chain.config.clone())),
                config.param_chain.weight_or(kind.default_weight()),
            ),
            ModuleKind::SymbolInventory => (
                Box::new(SymbolInventoryModule::new(
                    config.symbol_inventory.config.clone(),
                )),
                config.symbol_inventory.weight_or(kind.default_weight()),
            ),
            ModuleKind::FilesystemProfile => (
                Box::new(FilesystemProfileModule::new(
                    config.filesystem_profile.config.clone(),
                )),
                config.filesystem_profile.weight_or(kind.default_weight()),
            ),
        };
        self.register(module, weight);
    }

    /// Modules in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredModule> {
        self.modules.iter()
    }

    /// Names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.module.name().to_string()).collect()
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Sum of all registered weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.modules.iter().map(|m| m.weight).sum()
    }
}

const fn is_enabled(config: &ModulesConfig, kind: ModuleKind) -> bool {
    match kind {
        ModuleKind::Binwalk => config.binwalk.enabled,
        ModuleKind::InterfaceExposure => config.interface_exposure.enabled,
        ModuleKind::ParamChain => config.param_chain.enabled,
        ModuleKind::SymbolInventory => config.symbol_inventory.enabled,
        ModuleKind::FilesystemProfile => config.filesystem_profile.enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_all_modules() {
        let registry = ModuleRegistry::from_config(&ModulesConfig::default());
        assert_eq!(
            registry.names(),
            vec![
                "binwalk",
                "interface_exposure",
                "param_chain",
                "symbol_inventory",
                "filesystem_profile"
            ]
        );
        assert!((registry.total_weight() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_disabled_modules_are_skipped() {
        let mut config = ModulesConfig::default();
        config.binwalk.enabled = false;
        config.filesystem_profile.weight = Some(0.5);
        let registry = ModuleRegistry::from_config(&config);
        assert_eq!(registry.len(), 4);
        assert!(!registry.names().contains(&"binwalk".to_string()));
        let fs = registry
            .iter()
            .find(|m| m.module.name() == "filesystem_profile")
            .unwrap();
        assert_eq!(fs.weight, 0.5);
    }

    #[test]
    fn test_filter_overrides_enabled_and_keeps_order() {
        let mut config = ModulesConfig::default();
        config.binwalk.enabled = false;
        let registry =
            ModuleRegistry::from_config_filtered(&config, &["ghidra", "binwalk"]).unwrap();
        assert_eq!(registry.names(), vec!["binwalk", "symbol_inventory"]);
    }

    #[test]
    fn test_filter_rejects_unknown() {
        let err = ModuleRegistry::from_config_filtered(&ModulesConfig::default(), &["nope"])
            .unwrap_err();
        assert!(err.to_string().contains("module selection"));
    }
}
