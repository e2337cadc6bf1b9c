/*!
 * AI-OS Sandbox Library
 * In-process execution sandbox for untrusted guest code
 */

pub mod core;
pub mod monitoring;
pub mod runtime;
pub mod security;

// Re-exports
pub use monitoring::{init_tracing, AuditRecord, AuditSeverity, ViolationLogger};
pub use runtime::{
    BuiltinFinder, FindOutcome, GlobalNamespace, Module, ModuleFinder, ModuleSpec,
    ResolutionChain, Runtime, SourceFinder,
};
pub use security::{
    CallError, CapabilityGate, DeadlineEnforcer, ImportError, PolicyConfig, PolicyMode,
    PolicySet, ResolutionGuard, Sandbox, SandboxConfig, SandboxError, SandboxResult,
};
