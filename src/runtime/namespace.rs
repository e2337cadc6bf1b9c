/*!
 * Global Namespace
 *
 * Named global operations the host exposes to guest code. Entries can be
 * sealed: a sealed name is bound to a disabled stub for the rest of the
 * namespace's life and can never be rebound.
 */

use crate::monitoring::{AuditSeverity, ViolationLogger};
use crate::security::types::{CallError, CallResult, SandboxError, SandboxResult};
use ahash::RandomState;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// A global operation callable by guest code
pub type Callable = Arc<dyn Fn(&[&str]) -> CallResult + Send + Sync>;

#[derive(Clone)]
enum Binding {
    Callable(Callable),
    Disabled {
        logger: Option<Arc<ViolationLogger>>,
    },
}

struct Bindings {
    table: HashMap<String, Binding, RandomState>,
    sealed: BTreeSet<String>,
    gated: bool,
}

/// Table of global bindings
pub struct GlobalNamespace {
    bindings: RwLock<Bindings>,
}

impl GlobalNamespace {
    /// Empty namespace
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(Bindings {
                table: HashMap::with_hasher(RandomState::new()),
                sealed: BTreeSet::new(),
                gated: false,
            }),
        }
    }

    /// Namespace with the host's standard bindings (`open`, `print`)
    pub fn with_default_bindings() -> Self {
        let namespace = Self::new();
        namespace.insert("open", Arc::new(builtin_open));
        namespace.insert("print", Arc::new(builtin_print));
        namespace
    }

    fn insert(&self, name: &str, callable: Callable) {
        self.bindings
            .write()
            .table
            .insert(name.to_string(), Binding::Callable(callable));
    }

    /// Bind `name` to `callable`, replacing any previous binding
    ///
    /// Fails with `CapabilityDisabled` when the name has been sealed.
    pub fn bind<F>(&self, name: &str, callable: F) -> Result<(), CallError>
    where
        F: Fn(&[&str]) -> CallResult + Send + Sync + 'static,
    {
        let mut bindings = self.bindings.write();
        if bindings.sealed.contains(name) {
            return Err(CallError::CapabilityDisabled {
                name: name.to_string(),
            });
        }
        bindings
            .table
            .insert(name.to_string(), Binding::Callable(Arc::new(callable)));
        debug!(name, "global bound");
        Ok(())
    }

    /// Invoke the binding called `name`
    pub fn call(&self, name: &str, args: &[&str]) -> CallResult {
        let binding = self.bindings.read().table.get(name).cloned();

        match binding {
            Some(Binding::Callable(callable)) => callable(args),
            Some(Binding::Disabled { logger }) => {
                if let Some(logger) = logger {
                    logger.record(
                        AuditSeverity::Warning,
                        format!("Attempted call of disabled capability: {name}"),
                    );
                }
                Err(CallError::CapabilityDisabled {
                    name: name.to_string(),
                })
            }
            None => Err(CallError::UnknownName(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.read().table.contains_key(name)
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.bindings.read().sealed.contains(name)
    }

    /// All bound names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.read().table.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn disabled_names(&self) -> Vec<String> {
        self.bindings.read().sealed.iter().cloned().collect()
    }

    /// Replace every name in `names` with a disabled stub and seal it
    ///
    /// Applies once per namespace. Names that were never bound are sealed
    /// too, so they cannot be introduced later.
    pub(crate) fn seal<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
        logger: Option<Arc<ViolationLogger>>,
    ) -> SandboxResult<BTreeSet<String>> {
        let mut bindings = self.bindings.write();
        if bindings.gated {
            return Err(SandboxError::GateAlreadyApplied);
        }
        bindings.gated = true;

        let mut sealed = BTreeSet::new();
        for name in names {
            let was_bound = bindings
                .table
                .insert(
                    name.to_string(),
                    Binding::Disabled {
                        logger: logger.clone(),
                    },
                )
                .is_some();
            bindings.sealed.insert(name.to_string());
            sealed.insert(name.to_string());
            info!(name, was_bound, "capability disabled");
        }
        Ok(sealed)
    }
}

impl Default for GlobalNamespace {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_open(args: &[&str]) -> CallResult {
    let path = args.first().ok_or_else(|| CallError::Failed {
        name: "open".into(),
        reason: "missing path argument".into(),
    })?;
    std::fs::read_to_string(path).map_err(|e| CallError::Failed {
        name: "open".into(),
        reason: e.to_string(),
    })
}

fn builtin_print(args: &[&str]) -> CallResult {
    let line = args.join(" ");
    println!("{line}");
    Ok(line)
}
