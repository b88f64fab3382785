//! Tool Registry: a flat descriptor table with a singleton external-binary
//! probe and sandbox injection.
//!
//! Grounded on `skilllite-agent::extensions::registry::{ExtensionRegistry,
//! ExtensionRegistryBuilder}`, generalized from its skill/memory-aware
//! dispatch into the flatter descriptor-table shape this substrate needs.

use crate::types::ToolDescriptor;
use skilllite_core::Sandbox;
use std::collections::HashMap;
use std::process::Command;
use std::sync::{Arc, OnceLock};

fn external_search_binary_present() -> bool {
    static PRESENT: OnceLock<bool> = OnceLock::new();
    *PRESENT.get_or_init(|| {
        Command::new("rg")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    })
}

pub struct ToolRegistry {
    descriptors: HashMap<String, ToolDescriptor>,
    has_external_search_binary: bool,
    sandbox: Option<Arc<Sandbox>>,
}

impl ToolRegistry {
    /// Build a registry with every built-in tool registered, probing for an
    /// external fast-search binary exactly once for the process.
    pub fn new(sandbox: Option<Arc<Sandbox>>) -> Self {
        let mut registry = Self {
            descriptors: HashMap::new(),
            has_external_search_binary: external_search_binary_present(),
            sandbox,
        };
        crate::tools::register_all(&mut registry);
        registry
    }

    pub fn has_external_search_binary(&self) -> bool {
        self.has_external_search_binary
    }

    pub fn sandbox(&self) -> Option<&Arc<Sandbox>> {
        self.sandbox.as_ref()
    }

    /// Register a descriptor, overwriting any existing entry of the same name.
    pub fn register(&mut self, descriptor: ToolDescriptor) {
        self.descriptors.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.get(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.descriptors.values()
    }

    pub fn read_only(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.descriptors.values().filter(|d| d.read_only)
    }

    /// Remove a tool named `Name(specifier)` — everything from the first `(`
    /// is discarded before lookup.
    pub fn remove(&mut self, spec: &str) -> Option<ToolDescriptor> {
        let key = spec.split('(').next().unwrap_or(spec);
        self.descriptors.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_strips_specifier_suffix() {
        let mut registry = ToolRegistry::new(None);
        assert!(registry.get("read").is_some());
        registry.remove("read(unused)");
        assert!(registry.get("read").is_none());
    }

    #[test]
    fn read_only_excludes_mutating_tools() {
        let registry = ToolRegistry::new(None);
        let ro: Vec<_> = registry.read_only().map(|d| d.name.as_str()).collect();
        assert!(ro.contains(&"read"));
        assert!(!ro.contains(&"write"));
    }
}
