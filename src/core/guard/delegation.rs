/*!
 * Delegation Guard
 *
 * Tracks, per thread, whether a resolution guard has stepped aside to let
 * the rest of the resolution chain answer a request. Entering delegation
 * returns a guard; dropping it puts the previous state back.
 */

use super::{Guard, GuardError, GuardMetadata, GuardResult};
use ahash::RandomState;
use dashmap::DashMap;
use std::thread::{self, ThreadId};
use tracing::trace;

/// Interception state of a resolution guard on one thread
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GuardState {
    /// The guard intercepts every request
    #[default]
    Active,
    /// The guard is re-walking the chain for `fullname` and must not
    /// intercept that name again until the walk returns
    Delegating { fullname: String },
}

impl GuardState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_delegating_for(&self, name: &str) -> bool {
        matches!(self, Self::Delegating { fullname } if fullname == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Delegating { .. } => "delegating",
        }
    }
}

/// Per-thread delegation states
///
/// Threads in the `Active` state have no entry, so the map only holds
/// threads that are currently inside a delegation.
pub struct DelegationStates {
    states: DashMap<ThreadId, GuardState, RandomState>,
}

impl DelegationStates {
    pub fn new() -> Self {
        Self {
            states: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// State of the calling thread
    pub fn current(&self) -> GuardState {
        self.states
            .get(&thread::current().id())
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Enter delegation for `fullname` on the calling thread
    ///
    /// The previous state, which may itself be a delegation for another
    /// name, is restored when the returned guard is released or dropped.
    pub fn enter(&self, fullname: &str) -> DelegationGuard<'_> {
        let thread = thread::current().id();
        let previous = self
            .states
            .insert(
                thread,
                GuardState::Delegating {
                    fullname: fullname.to_string(),
                },
            )
            .unwrap_or_default();

        trace!(fullname, previous = previous.name(), "entered delegation");

        DelegationGuard {
            states: self,
            thread,
            previous,
            metadata: GuardMetadata::new("delegation"),
            active: true,
        }
    }

    /// Number of threads currently delegating
    pub fn delegating_threads(&self) -> usize {
        self.states.len()
    }
}

impl Default for DelegationStates {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped delegation on one thread
pub struct DelegationGuard<'a> {
    states: &'a DelegationStates,
    thread: ThreadId,
    previous: GuardState,
    metadata: GuardMetadata,
    active: bool,
}

impl DelegationGuard<'_> {
    fn restore(&mut self) {
        match std::mem::take(&mut self.previous) {
            GuardState::Active => {
                self.states.states.remove(&self.thread);
            }
            previous => {
                self.states.states.insert(self.thread, previous);
            }
        }
        self.active = false;
        trace!(
            lifetime_us = self.metadata.lifetime_micros(),
            "left delegation"
        );
    }
}

impl Guard for DelegationGuard<'_> {
    fn resource_type(&self) -> &'static str {
        self.metadata.resource_type
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn release(&mut self) -> GuardResult<()> {
        if !self.active {
            return Err(GuardError::AlreadyReleased);
        }
        self.restore();
        Ok(())
    }
}

impl Drop for DelegationGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            self.restore();
        }
    }
}
