/*!
 * Resolution Guard
 *
 * Sits pinned at the head of the host's resolution chain and decides every
 * module request before any other finder sees it.
 *
 * ## Delegation
 *
 * A permitted name is resolved by re-walking the whole chain, so the result
 * is exactly what the rest of the chain would have produced. That walk
 * reaches the guard again first. While a delegation for a name is in flight
 * on a thread, the guard steps aside for that same name and the walk moves
 * on to the next finder. The delegation state lives in an RAII guard and is
 * restored however the walk ends, including by panic.
 *
 * A different name requested during a delegation (a finder resolving a
 * dependency) is a new request and goes through the policy again.
 */

use super::policy::{DenyReason, PolicySet, PolicyVerdict};
use crate::core::guard::{DelegationStates, GuardState};
use crate::monitoring::{AuditSeverity, ViolationLogger};
use crate::runtime::resolution::{
    FindOutcome, ModuleFinder, ModuleSpec, ResolutionChain, ResolutionRequest,
};
use crate::security::types::SandboxResult;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Name under which the guard registers in the chain
pub const GUARD_FINDER_NAME: &str = "resolution_guard";

/// Counters kept by the guard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardStats {
    /// Requests the guard decided on
    pub intercepted: u64,
    /// Requests denied by policy
    pub denied: u64,
    /// Delegations to the rest of the chain
    pub delegated: u64,
    /// Re-entries the guard stepped aside for
    pub stepped_aside: u64,
}

/// Policy-enforcing finder for the head of the resolution chain
pub struct ResolutionGuard {
    policy: Arc<PolicySet>,
    logger: Arc<ViolationLogger>,
    states: DelegationStates,
    intercepted: AtomicU64,
    denied: AtomicU64,
    delegated: AtomicU64,
    stepped_aside: AtomicU64,
}

impl ResolutionGuard {
    pub fn new(policy: Arc<PolicySet>, logger: Arc<ViolationLogger>) -> Self {
        Self {
            policy,
            logger,
            states: DelegationStates::new(),
            intercepted: AtomicU64::new(0),
            denied: AtomicU64::new(0),
            delegated: AtomicU64::new(0),
            stepped_aside: AtomicU64::new(0),
        }
    }

    /// Register the guard at the head of `chain` and pin it there
    pub fn install(self: &Arc<Self>, chain: &ResolutionChain) -> SandboxResult<()> {
        chain.pin_head(Arc::clone(self) as Arc<dyn ModuleFinder>)?;
        info!(
            mode = ?self.policy.mode(),
            prefixes = self.policy.prefixes().len(),
            "resolution guard installed"
        );
        Ok(())
    }

    pub fn policy(&self) -> &PolicySet {
        &self.policy
    }

    /// Guard state of the calling thread
    pub fn state(&self) -> GuardState {
        self.states.current()
    }

    pub fn stats(&self) -> GuardStats {
        GuardStats {
            intercepted: self.intercepted.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            delegated: self.delegated.load(Ordering::Relaxed),
            stepped_aside: self.stepped_aside.load(Ordering::Relaxed),
        }
    }

    /// Decide a request and, when permitted, resolve it through `chain`
    ///
    /// `None` means the module is treated as not found.
    pub fn resolve(
        &self,
        fullname: &str,
        requesting_path: &Path,
        chain: &ResolutionChain,
    ) -> Option<ModuleSpec> {
        match self.find_spec(&ResolutionRequest::new(fullname, requesting_path), chain) {
            FindOutcome::Found(spec) => Some(spec),
            FindOutcome::Pass | FindOutcome::NotFound => None,
        }
    }

    fn deny(&self, request: &ResolutionRequest<'_>, reason: DenyReason) {
        self.denied.fetch_add(1, Ordering::Relaxed);

        match reason {
            DenyReason::Restricted { prefix } => {
                debug!(module = request.fullname, %prefix, "restricted module denied");
                self.logger.record(
                    AuditSeverity::Warning,
                    format!(
                        "Attempted import of restricted module: {} in file: {}",
                        request.fullname,
                        request.requesting_path.display()
                    ),
                );
            }
            // Allowlist misses are not audit events
            DenyReason::NotAllowed => {
                debug!(module = request.fullname, "module outside allowlist");
            }
        }
    }

    /// The delegated walk already consulted every other finder, so a miss
    /// there is final
    fn delegate(&self, request: &ResolutionRequest<'_>, chain: &ResolutionChain) -> FindOutcome {
        self.delegated.fetch_add(1, Ordering::Relaxed);
        let _delegation = self.states.enter(request.fullname);
        match chain.find_spec(request) {
            Some(spec) => FindOutcome::Found(spec),
            None => FindOutcome::NotFound,
        }
    }
}

impl ModuleFinder for ResolutionGuard {
    fn name(&self) -> &str {
        GUARD_FINDER_NAME
    }

    fn find_spec(&self, request: &ResolutionRequest<'_>, chain: &ResolutionChain) -> FindOutcome {
        if self.states.current().is_delegating_for(request.fullname) {
            self.stepped_aside.fetch_add(1, Ordering::Relaxed);
            return FindOutcome::Pass;
        }

        self.intercepted.fetch_add(1, Ordering::Relaxed);

        match self.policy.evaluate(request.fullname) {
            PolicyVerdict::Permit => self.delegate(request, chain),
            PolicyVerdict::Deny(reason) => {
                self.deny(request, reason);
                FindOutcome::NotFound
            }
        }
    }
}

impl std::fmt::Debug for ResolutionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionGuard")
            .field("mode", &self.policy.mode())
            .field("stats", &self.stats())
            .finish()
    }
}
