/*!
 * Core Module
 * Sandbox-wide constants and RAII state guards
 */

pub mod guard;
pub mod limits;

// Re-export for convenience
pub use guard::{DelegationGuard, DelegationStates, Guard, GuardError, GuardResult, GuardState};
