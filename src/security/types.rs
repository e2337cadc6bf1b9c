/*!
 * Security Types
 * Error types shared by the sandbox and the host runtime
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sandbox operation result
///
/// # Must Use
/// Sandbox setup can fail and must be handled before guest code runs
#[must_use = "sandbox operations can fail and must be handled"]
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Result of invoking a global binding
pub type CallResult = Result<String, CallError>;

/// Errors raised while configuring or activating the sandbox
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum SandboxError {
    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(sandbox::invalid_config),
        help("Check the policy file and the AI_OS_SANDBOX_* environment variables.")
    )]
    InvalidConfig(String),

    #[error("Invalid module prefix {prefix:?}: {reason}")]
    #[diagnostic(
        code(sandbox::invalid_prefix),
        help("Prefixes are dotted module names such as \"http\" or \"xml.etree\".")
    )]
    InvalidPrefix { prefix: String, reason: String },

    #[error("Capability gate already applied to this namespace")]
    #[diagnostic(
        code(sandbox::gate_already_applied),
        help("Capabilities are disabled once, before any guest code runs.")
    )]
    GateAlreadyApplied,

    #[error("Resolution guard already installed on this chain")]
    #[diagnostic(code(sandbox::guard_installed))]
    GuardAlreadyInstalled,

    #[error("Finder {0:?} is pinned at the head of the resolution chain")]
    #[diagnostic(
        code(sandbox::guard_pinned),
        help("The resolution guard cannot be removed once installed.")
    )]
    GuardPinned(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(sandbox::io))]
    Io(String),
}

impl From<std::io::Error> for SandboxError {
    fn from(err: std::io::Error) -> Self {
        SandboxError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SandboxError {
    fn from(err: serde_json::Error) -> Self {
        SandboxError::InvalidConfig(err.to_string())
    }
}

/// Errors raised when calling a global binding
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum CallError {
    /// The binding was permanently disabled by the capability gate
    #[error("'{name}' is disabled in this sandbox and is not callable")]
    CapabilityDisabled { name: String },

    #[error("name '{0}' is not defined")]
    UnknownName(String),

    #[error("{name}() failed: {reason}")]
    Failed { name: String, reason: String },
}

/// Errors raised by the host runtime's import operation
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum ImportError {
    /// No finder produced a spec. Policy denials surface the same way.
    #[error("No module named '{name}'")]
    ModuleNotFound { name: String },

    #[error("Failed to load module '{name}': {reason}")]
    LoadFailed { name: String, reason: String },
}

impl ImportError {
    pub fn module_name(&self) -> &str {
        match self {
            Self::ModuleNotFound { name } | Self::LoadFailed { name, .. } => name,
        }
    }
}
