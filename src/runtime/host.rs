/*!
 * Host Runtime
 *
 * The process-level runtime guest code executes against: a resolution
 * chain for imports, a global namespace for named operations and a cache
 * of loaded modules.
 */

use super::module::{Module, ModuleCache};
use super::namespace::GlobalNamespace;
use super::resolution::{ModuleFinder, ResolutionChain, ResolutionRequest};
use crate::monitoring::span_resolution;
use crate::security::types::{CallResult, ImportError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Host runtime shared by the host and guest code
pub struct Runtime {
    chain: Arc<ResolutionChain>,
    namespace: Arc<GlobalNamespace>,
    modules: ModuleCache,
    script_path: PathBuf,
}

impl Runtime {
    /// Runtime with an empty chain and the default global bindings
    pub fn new() -> Self {
        Self::with_parts(
            Arc::new(ResolutionChain::new()),
            Arc::new(GlobalNamespace::with_default_bindings()),
        )
    }

    pub fn with_parts(chain: Arc<ResolutionChain>, namespace: Arc<GlobalNamespace>) -> Self {
        Self {
            chain,
            namespace,
            modules: ModuleCache::new(),
            script_path: default_script_path(),
        }
    }

    /// Runtime whose chain consults `finders` in order
    pub fn with_finders(finders: impl IntoIterator<Item = Arc<dyn ModuleFinder>>) -> Self {
        Self::with_parts(
            Arc::new(ResolutionChain::with_finders(finders)),
            Arc::new(GlobalNamespace::with_default_bindings()),
        )
    }

    /// Path reported as the requester of imports issued through `import`
    pub fn with_script_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_path = path.into();
        self
    }

    pub fn chain(&self) -> &Arc<ResolutionChain> {
        &self.chain
    }

    pub fn namespace(&self) -> &Arc<GlobalNamespace> {
        &self.namespace
    }

    pub fn modules(&self) -> &ModuleCache {
        &self.modules
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Import `fullname` on behalf of the running script
    pub fn import(&self, fullname: &str) -> Result<Arc<Module>, ImportError> {
        self.import_from(fullname, &self.script_path)
    }

    /// Import `fullname` on behalf of `requesting_path`
    ///
    /// The chain is consulted on every import, cached or not, so policy
    /// applies to modules loaded before a finder was added.
    pub fn import_from(
        &self,
        fullname: &str,
        requesting_path: &Path,
    ) -> Result<Arc<Module>, ImportError> {
        let span = span_resolution(fullname);
        let _entered = span.enter();

        let request = ResolutionRequest::new(fullname, requesting_path);
        match self.chain.find_spec(&request) {
            Some(spec) => {
                span.record_found(&spec.finder);
                self.modules.get_or_load(spec)
            }
            None => {
                span.record_not_found();
                Err(ImportError::ModuleNotFound {
                    name: fullname.to_string(),
                })
            }
        }
    }

    /// Call the global binding `name`
    pub fn call(&self, name: &str, args: &[&str]) -> CallResult {
        self.namespace.call(name, args)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute path of the program being run, from `argv[0]`
fn default_script_path() -> PathBuf {
    let argv0 = std::env::args_os()
        .next()
        .map(PathBuf::from)
        .unwrap_or_default();

    if argv0.is_absolute() {
        return argv0;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&argv0))
        .unwrap_or(argv0)
}
