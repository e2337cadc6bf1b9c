/*!
 * Capability Gate
 *
 * Permanently disables named global capabilities. A disabled name stays
 * bound but refuses every call, and it can never be rebound or re-enabled
 * for the rest of the process.
 */

use crate::monitoring::ViolationLogger;
use crate::runtime::GlobalNamespace;
use crate::security::types::SandboxResult;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Record of capabilities disabled on a namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityGate {
    disabled: BTreeSet<String>,
}

impl CapabilityGate {
    /// Disable `names` on `namespace`
    ///
    /// Names need not be bound beforehand. Calls to a disabled name are
    /// recorded through `logger`. A namespace is gated at most once.
    pub fn disable<'a, I>(
        namespace: &GlobalNamespace,
        names: I,
        logger: Arc<ViolationLogger>,
    ) -> SandboxResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let disabled = namespace.seal(names, Some(logger))?;
        Ok(Self { disabled })
    }

    /// Disabled names, sorted
    pub fn disabled(&self) -> impl Iterator<Item = &str> {
        self.disabled.iter().map(String::as_str)
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.contains(name)
    }

    pub fn len(&self) -> usize {
        self.disabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disabled.is_empty()
    }
}
