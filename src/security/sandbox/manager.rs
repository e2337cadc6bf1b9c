/*!
 * Sandbox Activation
 *
 * Applies the sandbox to a host runtime in a fixed order:
 * 1. Capabilities disabled on the global namespace
 * 2. Resolution guard pinned at the head of the resolution chain
 * 3. Deadline armed
 *
 * Activation is one-way: nothing here restores the runtime afterwards.
 */

use super::capability::CapabilityGate;
use super::config::SandboxConfig;
use crate::core::guard::GuardState;
use crate::monitoring::ViolationLogger;
use crate::runtime::Runtime;
use crate::security::deadline::DeadlineEnforcer;
use crate::security::policy::PolicySet;
use crate::security::resolution_guard::ResolutionGuard;
use crate::security::types::SandboxResult;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// An activated sandbox
///
/// Dropping the handle leaves the sandbox in force; it only exposes the
/// installed components for inspection.
pub struct Sandbox {
    logger: Arc<ViolationLogger>,
    gate: CapabilityGate,
    guard: Arc<ResolutionGuard>,
    deadline: DeadlineEnforcer,
}

impl Sandbox {
    /// Activate on `runtime` with a process-terminating deadline
    pub fn activate(runtime: &Runtime, config: SandboxConfig) -> SandboxResult<Self> {
        let logger = Arc::new(ViolationLogger::new(&config.log_path));
        let deadline = DeadlineEnforcer::new(Arc::clone(&logger));
        Self::activate_with(runtime, config, logger, deadline)
    }

    /// Activate with a caller-supplied logger and deadline enforcer
    pub fn activate_with(
        runtime: &Runtime,
        config: SandboxConfig,
        logger: Arc<ViolationLogger>,
        deadline: DeadlineEnforcer,
    ) -> SandboxResult<Self> {
        config.validate()?;
        let policy = Arc::new(config.policy.to_policy_set()?);

        let gate = CapabilityGate::disable(
            runtime.namespace(),
            config.disabled_capabilities.iter().map(String::as_str),
            Arc::clone(&logger),
        )?;

        let guard = Arc::new(ResolutionGuard::new(policy, Arc::clone(&logger)));
        guard.install(runtime.chain())?;

        deadline.arm(config.timeout_secs)?;

        info!(
            mode = ?guard.policy().mode(),
            capabilities = gate.len(),
            timeout_secs = config.timeout_secs,
            log = %config.log_path.display(),
            "sandbox active"
        );

        Ok(Self {
            logger,
            gate,
            guard,
            deadline,
        })
    }

    pub fn logger(&self) -> &Arc<ViolationLogger> {
        &self.logger
    }

    pub fn gate(&self) -> &CapabilityGate {
        &self.gate
    }

    pub fn guard(&self) -> &Arc<ResolutionGuard> {
        &self.guard
    }

    pub fn policy(&self) -> &PolicySet {
        self.guard.policy()
    }

    /// Guard state of the calling thread
    pub fn guard_state(&self) -> GuardState {
        self.guard.state()
    }

    pub fn deadline(&self) -> &DeadlineEnforcer {
        &self.deadline
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.remaining()
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("gate", &self.gate)
            .field("guard", &self.guard)
            .field("deadline", &self.deadline)
            .finish()
    }
}
