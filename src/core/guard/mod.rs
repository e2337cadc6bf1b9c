/*!
 * RAII State Guards
 *
 * Scoped state transitions that are undone on every exit path, including
 * early returns and unwinding panics.
 *
 * ## Guard Types
 *
 * - **DelegationGuard**: Marks the current thread as delegating a resolution
 *   request and restores the previous state on drop
 *
 * ## Example
 *
 * ```rust
 * use ai_os_sandbox::core::guard::{DelegationStates, GuardState};
 *
 * let states = DelegationStates::new();
 * {
 *     let _guard = states.enter("math");
 *     assert!(states.current().is_delegating_for("math"));
 * }
 * assert_eq!(states.current(), GuardState::Active);
 * ```
 */

mod delegation;
mod traits;

pub use delegation::{DelegationGuard, DelegationStates, GuardState};
pub use traits::Guard;

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum GuardError {
    #[error("Resource already released")]
    AlreadyReleased,
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: std::time::Instant,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: std::time::Instant::now(),
        }
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        self.creation_time.elapsed().as_micros() as u64
    }
}
