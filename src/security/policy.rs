/*!
 * Module Policy
 *
 * An immutable set of dotted module-name prefixes, used either as a
 * denylist or an allowlist. A name matches a prefix when it equals the
 * prefix or lies underneath it (`prefix.` followed by anything).
 */

use super::types::{SandboxError, SandboxResult};
use ahash::RandomState;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How the prefixes of a policy are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Everything except the listed prefixes may be resolved
    Denylist,
    /// Only the listed prefixes may be resolved
    Allowlist,
}

/// Why a policy refused a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The name falls under a denied prefix
    Restricted { prefix: String },
    /// The name falls under no allowed prefix
    NotAllowed,
}

/// Outcome of evaluating a name against a policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyVerdict {
    Permit,
    Deny(DenyReason),
}

impl PolicyVerdict {
    pub fn is_permitted(&self) -> bool {
        matches!(self, Self::Permit)
    }
}

/// Check whether `name` is `prefix` or one of its submodules
#[inline]
pub fn name_matches(name: &str, prefix: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// Immutable module policy
#[derive(Debug, Clone)]
pub struct PolicySet {
    mode: PolicyMode,
    prefixes: HashSet<String, RandomState>,
}

impl PolicySet {
    /// Build a policy, validating every prefix
    pub fn new<I, S>(mode: PolicyMode, prefixes: I) -> SandboxResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = HashSet::with_hasher(RandomState::new());
        for prefix in prefixes {
            let prefix = prefix.into();
            validate_prefix(&prefix)?;
            set.insert(prefix);
        }
        Ok(Self {
            mode,
            prefixes: set,
        })
    }

    pub fn denylist<I, S>(prefixes: I) -> SandboxResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(PolicyMode::Denylist, prefixes)
    }

    pub fn allowlist<I, S>(prefixes: I) -> SandboxResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(PolicyMode::Allowlist, prefixes)
    }

    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    /// Prefixes, sorted for stable output
    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self.prefixes.iter().map(String::as_str).collect();
        prefixes.sort_unstable();
        prefixes
    }

    /// Prefix covering `name`, if any
    ///
    /// Walks the dotted ancestors of `name` instead of scanning the set, so
    /// the cost depends on the name's depth, not the policy's size.
    pub fn matching_prefix(&self, name: &str) -> Option<&str> {
        let mut candidate = name;
        loop {
            if let Some(prefix) = self.prefixes.get(candidate) {
                return Some(prefix.as_str());
            }
            match candidate.rfind('.') {
                Some(dot) => candidate = &candidate[..dot],
                None => return None,
            }
        }
    }

    pub fn evaluate(&self, name: &str) -> PolicyVerdict {
        let matched = self.matching_prefix(name);
        match (self.mode, matched) {
            (PolicyMode::Denylist, Some(prefix)) => PolicyVerdict::Deny(DenyReason::Restricted {
                prefix: prefix.to_string(),
            }),
            (PolicyMode::Denylist, None) => PolicyVerdict::Permit,
            (PolicyMode::Allowlist, Some(_)) => PolicyVerdict::Permit,
            (PolicyMode::Allowlist, None) => PolicyVerdict::Deny(DenyReason::NotAllowed),
        }
    }

    pub fn permits(&self, name: &str) -> bool {
        self.evaluate(name).is_permitted()
    }
}

fn validate_prefix(prefix: &str) -> SandboxResult<()> {
    let reason = if prefix.is_empty() {
        Some("prefix is empty")
    } else if prefix.chars().any(char::is_whitespace) {
        Some("prefix contains whitespace")
    } else if prefix.split('.').any(str::is_empty) {
        Some("prefix has an empty dotted component")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SandboxError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
