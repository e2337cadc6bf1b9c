/*!
 * Security Module
 * Module policy, resolution guard, capability gate and execution deadline
 */

pub mod deadline;
pub mod policy;
pub mod resolution_guard;
pub mod sandbox;
pub mod types;

// Re-export for convenience
pub use deadline::{Deadline, DeadlineEnforcer, ExpiryAction};
pub use policy::{name_matches, DenyReason, PolicyMode, PolicySet, PolicyVerdict};
pub use resolution_guard::{GuardStats, ResolutionGuard, GUARD_FINDER_NAME};
pub use sandbox::{parse_timeout, CapabilityGate, PolicyConfig, Sandbox, SandboxConfig};
pub use types::*;
