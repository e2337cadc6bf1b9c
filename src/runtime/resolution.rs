/*!
 * Resolution Chain
 *
 * The ordered list of finders the host consults for every module request.
 * A request walks the chain front to back until a finder either returns a
 * spec or declares the module not found. Finders receive the chain itself,
 * so a finder can re-walk it to resolve a name through everything
 * registered after it.
 */

use crate::security::types::{SandboxError, SandboxResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Where a resolved module comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum ModuleOrigin {
    /// Compiled into the host
    Builtin,
    /// Loaded from a source file
    Source(PathBuf),
}

/// Result of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    pub origin: ModuleOrigin,
    /// Name of the finder that produced this spec
    pub finder: String,
    pub is_package: bool,
}

/// One resolution attempt
#[derive(Debug, Clone)]
pub struct ResolutionRequest<'a> {
    pub fullname: &'a str,
    /// File on whose behalf the module is requested
    pub requesting_path: &'a Path,
    pub timestamp: SystemTime,
}

impl<'a> ResolutionRequest<'a> {
    pub fn new(fullname: &'a str, requesting_path: &'a Path) -> Self {
        Self {
            fullname,
            requesting_path,
            timestamp: SystemTime::now(),
        }
    }
}

/// Answer of a single finder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindOutcome {
    /// The module was resolved; the walk stops
    Found(ModuleSpec),
    /// This finder does not know the module; the next finder is consulted
    Pass,
    /// The module does not exist as far as the chain is concerned; the walk
    /// stops without consulting later finders
    NotFound,
}

impl From<Option<ModuleSpec>> for FindOutcome {
    fn from(spec: Option<ModuleSpec>) -> Self {
        match spec {
            Some(spec) => Self::Found(spec),
            None => Self::Pass,
        }
    }
}

/// A link in the resolution chain
pub trait ModuleFinder: Send + Sync {
    /// Stable identifier, used for removal and diagnostics
    fn name(&self) -> &str;

    /// Answer a request; `chain` is the chain this finder is registered in
    fn find_spec(&self, request: &ResolutionRequest<'_>, chain: &ResolutionChain) -> FindOutcome;
}

struct ChainEntries {
    finders: Vec<Arc<dyn ModuleFinder>>,
    /// The first finder is pinned and cannot be displaced or removed
    head_pinned: bool,
}

/// Ordered, shared list of module finders
pub struct ResolutionChain {
    entries: RwLock<ChainEntries>,
}

impl ResolutionChain {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(ChainEntries {
                finders: Vec::new(),
                head_pinned: false,
            }),
        }
    }

    /// Chain consulting `finders` in the given order
    pub fn with_finders(finders: impl IntoIterator<Item = Arc<dyn ModuleFinder>>) -> Self {
        let chain = Self::new();
        chain.entries.write().finders.extend(finders);
        chain
    }

    /// Append a finder, consulted after all existing ones
    pub fn push(&self, finder: Arc<dyn ModuleFinder>) {
        debug!(finder = finder.name(), "finder appended to resolution chain");
        self.entries.write().finders.push(finder);
    }

    /// Insert a finder at the front of the chain
    ///
    /// When the head is pinned the finder lands directly behind it.
    pub fn insert_head(&self, finder: Arc<dyn ModuleFinder>) {
        let mut entries = self.entries.write();
        let index = usize::from(entries.head_pinned);
        debug!(finder = finder.name(), index, "finder inserted into resolution chain");
        entries.finders.insert(index, finder);
    }

    /// Insert `finder` at the front and pin it there
    pub(crate) fn pin_head(&self, finder: Arc<dyn ModuleFinder>) -> SandboxResult<()> {
        let mut entries = self.entries.write();
        if entries.head_pinned {
            return Err(SandboxError::GuardAlreadyInstalled);
        }
        entries.finders.insert(0, finder);
        entries.head_pinned = true;
        Ok(())
    }

    /// Remove the first finder called `name`
    ///
    /// Returns `Ok(None)` when no such finder is registered and
    /// `Err(GuardPinned)` when it is the pinned head.
    pub fn remove(&self, name: &str) -> SandboxResult<Option<Arc<dyn ModuleFinder>>> {
        let mut entries = self.entries.write();
        let Some(index) = entries.finders.iter().position(|f| f.name() == name) else {
            return Ok(None);
        };
        if index == 0 && entries.head_pinned {
            return Err(SandboxError::GuardPinned(name.to_string()));
        }
        Ok(Some(entries.finders.remove(index)))
    }

    /// Names of the registered finders, in consultation order
    pub fn finder_names(&self) -> Vec<String> {
        self.entries
            .read()
            .finders
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    pub fn head_name(&self) -> Option<String> {
        self.entries.read().finders.first().map(|f| f.name().to_string())
    }

    pub fn is_head_pinned(&self) -> bool {
        self.entries.read().head_pinned
    }

    pub fn len(&self) -> usize {
        self.entries.read().finders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Walk the chain for `request`
    ///
    /// The finder list is snapshotted first, so finders run without the
    /// chain lock held and may re-enter the chain.
    pub fn find_spec(&self, request: &ResolutionRequest<'_>) -> Option<ModuleSpec> {
        let finders = self.entries.read().finders.clone();
        for finder in &finders {
            match finder.find_spec(request, self) {
                FindOutcome::Found(spec) => return Some(spec),
                FindOutcome::NotFound => return None,
                FindOutcome::Pass => {}
            }
        }
        None
    }

    /// Convenience wrapper building the request
    pub fn resolve(&self, fullname: &str, requesting_path: &Path) -> Option<ModuleSpec> {
        self.find_spec(&ResolutionRequest::new(fullname, requesting_path))
    }
}

impl Default for ResolutionChain {
    fn default() -> Self {
        Self::new()
    }
}
