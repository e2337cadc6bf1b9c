/*!
 * Sandbox Configuration
 *
 * Settings consumed by sandbox activation. Defaults reproduce the stock
 * sandbox: the built-in denylist, a 60 second deadline, `exec`/`eval`/`open`
 * disabled and audit records appended to `sandbox_blocked_imports.log`.
 *
 * Sources, later ones winning:
 * - Built-in defaults
 * - `AI_OS_SANDBOX_POLICY`: path to a JSON policy (`{"mode": ..., "prefixes": [...]}`)
 * - `AI_OS_SANDBOX_TIMEOUT`: deadline in whole seconds
 * - `AI_OS_SANDBOX_LOG`: audit sink path
 */

use crate::core::limits::{
    AUDIT_LOG_ENV_VAR, DEADLINE_ENV_VAR, DEFAULT_AUDIT_LOG, DEFAULT_DEADLINE_SECS,
    DEFAULT_DISABLED_CAPABILITIES, DEFAULT_RESTRICTED_MODULES, POLICY_ENV_VAR,
};
use crate::security::policy::{PolicyMode, PolicySet};
use crate::security::types::{SandboxError, SandboxResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Serializable form of a module policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub mode: PolicyMode,
    #[serde(default)]
    pub prefixes: Vec<String>,
}

impl PolicyConfig {
    pub fn denylist<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: PolicyMode::Denylist,
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allowlist<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: PolicyMode::Allowlist,
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Validate and build the policy
    pub fn to_policy_set(&self) -> SandboxResult<PolicySet> {
        PolicySet::new(self.mode, self.prefixes.iter().cloned())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::denylist(DEFAULT_RESTRICTED_MODULES.iter().copied())
    }
}

/// Everything sandbox activation needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub policy: PolicyConfig,
    /// Wall-clock budget in seconds; `0` disables the deadline
    pub timeout_secs: u64,
    pub log_path: PathBuf,
    pub disabled_capabilities: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            timeout_secs: DEFAULT_DEADLINE_SECS,
            log_path: PathBuf::from(DEFAULT_AUDIT_LOG),
            disabled_capabilities: DEFAULT_DISABLED_CAPABILITIES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

impl SandboxConfig {
    /// Defaults overlaid with the `AI_OS_SANDBOX_*` environment variables
    pub fn from_env() -> SandboxResult<Self> {
        let mut config = Self::default();

        if let Some(policy_path) = std::env::var_os(POLICY_ENV_VAR) {
            config.policy = load_policy(Path::new(&policy_path))?;
        }

        config.timeout_secs = parse_timeout(std::env::var(DEADLINE_ENV_VAR).ok().as_deref());

        if let Some(log_path) = std::env::var_os(AUDIT_LOG_ENV_VAR) {
            if !log_path.is_empty() {
                config.log_path = PathBuf::from(log_path);
            }
        }

        config.validate()?;
        debug!(?config, "sandbox configuration loaded from environment");
        Ok(config)
    }

    /// Parse a full configuration; absent fields keep their defaults
    pub fn from_json_str(json: &str) -> SandboxResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> SandboxResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    pub fn with_disabled_capabilities<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_capabilities = names.into_iter().map(Into::into).collect();
        self
    }

    /// Reject configurations activation would fail on
    pub fn validate(&self) -> SandboxResult<()> {
        self.policy.to_policy_set()?;

        if let Some(bad) = self
            .disabled_capabilities
            .iter()
            .find(|name| name.trim().is_empty())
        {
            return Err(SandboxError::InvalidConfig(format!(
                "capability name {bad:?} is empty"
            )));
        }

        if self.log_path.as_os_str().is_empty() {
            return Err(SandboxError::InvalidConfig(
                "audit log path is empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn load_policy(path: &Path) -> SandboxResult<PolicyConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        SandboxError::InvalidConfig(format!("cannot read policy {}: {e}", path.display()))
    })?;
    Ok(serde_json::from_str(&contents)?)
}

/// Deadline from a raw environment value
///
/// Absent, blank or non-numeric values fall back to the default.
pub fn parse_timeout(raw: Option<&str>) -> u64 {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return DEFAULT_DEADLINE_SECS;
    };

    match raw.parse::<u64>() {
        Ok(secs) => secs,
        Err(e) => {
            warn!(
                value = raw,
                error = %e,
                default = DEFAULT_DEADLINE_SECS,
                "invalid {DEADLINE_ENV_VAR}, using default"
            );
            DEFAULT_DEADLINE_SECS
        }
    }
}
