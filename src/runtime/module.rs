/*!
 * Loaded Modules
 */

use super::resolution::{ModuleOrigin, ModuleSpec};
use crate::security::types::ImportError;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::SystemTime;

/// A module that has been resolved and loaded
#[derive(Debug)]
pub struct Module {
    spec: ModuleSpec,
    source: Option<String>,
    loaded_at: SystemTime,
}

impl Module {
    /// Load the module described by `spec`
    ///
    /// Builtins carry no source; source modules are read from disk.
    pub fn load(spec: ModuleSpec) -> Result<Self, ImportError> {
        let source = match &spec.origin {
            ModuleOrigin::Builtin => None,
            ModuleOrigin::Source(path) => {
                Some(std::fs::read_to_string(path).map_err(|e| ImportError::LoadFailed {
                    name: spec.name.clone(),
                    reason: e.to_string(),
                })?)
            }
        };

        Ok(Self {
            spec,
            source,
            loaded_at: SystemTime::now(),
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn loaded_at(&self) -> SystemTime {
        self.loaded_at
    }
}

/// Loaded modules keyed by full name
pub struct ModuleCache {
    modules: DashMap<String, Arc<Module>, RandomState>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self {
            modules: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Return the cached module for `spec.name`, loading it on first use
    pub fn get_or_load(&self, spec: ModuleSpec) -> Result<Arc<Module>, ImportError> {
        if let Some(module) = self.get(&spec.name) {
            return Ok(module);
        }

        // Load outside the map lock; a concurrent loader may win the insert
        let name = spec.name.clone();
        let module = Arc::new(Module::load(spec)?);
        Ok(self.modules.entry(name).or_insert(module).value().clone())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Module>> {
        self.modules.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ModuleCache {
    fn default() -> Self {
        Self::new()
    }
}
