/*!
 * Deadline Enforcement
 *
 * A process-wide wall-clock budget for guest code. Arming starts (or
 * replaces) the countdown; when it runs out the watchdog appends one audit
 * record and ends the process with a failure status, wherever the guest
 * happens to be.
 *
 * The watchdog is a dedicated thread parked on a condvar. It never runs
 * guest code and never takes locks the guest can hold, so expiry does not
 * depend on the guest reaching a safe point.
 */

use crate::core::limits::{
    DEADLINE_EXCEEDED_MESSAGE, DEADLINE_EXIT_STATUS, DEADLINE_MAX_PARK, DEADLINE_THREAD_NAME,
};
use crate::monitoring::{AuditRecord, AuditSeverity, ViolationLogger};
use crate::security::types::SandboxResult;
use parking_lot::{Condvar, Mutex};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Runs once the deadline has passed and the audit record is written
pub type ExpiryAction = Arc<dyn Fn() + Send + Sync>;

/// An armed countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    pub armed_at: Instant,
    pub duration: Duration,
}

impl Deadline {
    pub fn new(duration: Duration) -> Self {
        Self {
            armed_at: Instant::now(),
            duration,
        }
    }

    /// Expiry instant, `None` when it lies beyond what `Instant` can hold
    pub fn expires_at(&self) -> Option<Instant> {
        self.armed_at.checked_add(self.duration)
    }

    /// Time left, zero once expired
    pub fn remaining(&self) -> Duration {
        match self.expires_at() {
            Some(expires_at) => expires_at.saturating_duration_since(Instant::now()),
            None => self.duration.saturating_sub(self.armed_at.elapsed()),
        }
    }

    /// A deadline too far out to represent never expires
    pub fn is_expired(&self) -> bool {
        self.expires_at()
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }
}

#[derive(Clone)]
struct Armed {
    deadline: Deadline,
    logger: Arc<ViolationLogger>,
}

struct Slot {
    armed: Option<Armed>,
    thread_started: bool,
}

struct Watchdog {
    slot: Mutex<Slot>,
    wakeup: Condvar,
    action: ExpiryAction,
}

impl Watchdog {
    fn new(action: ExpiryAction) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Slot {
                armed: None,
                thread_started: false,
            }),
            wakeup: Condvar::new(),
            action,
        })
    }

    fn arm(self: &Arc<Self>, deadline: Deadline, logger: Arc<ViolationLogger>) -> SandboxResult<()> {
        let mut slot = self.slot.lock();
        if !slot.thread_started {
            let watchdog = Arc::downgrade(self);
            thread::Builder::new()
                .name(DEADLINE_THREAD_NAME.to_string())
                .spawn(move || Self::run(watchdog))?;
            slot.thread_started = true;
        }
        slot.armed = Some(Armed { deadline, logger });
        self.wakeup.notify_one();
        Ok(())
    }

    fn disarm(&self) -> bool {
        let mut slot = self.slot.lock();
        let was_armed = slot.armed.take().is_some();
        self.wakeup.notify_one();
        was_armed
    }

    fn current(&self) -> Option<Deadline> {
        self.slot.lock().armed.as_ref().map(|armed| armed.deadline)
    }

    /// Watchdog loop; ends once every enforcer sharing the watchdog is gone
    fn run(watchdog: Weak<Self>) {
        while let Some(watchdog) = watchdog.upgrade() {
            watchdog.tick();
        }
        debug!("deadline watchdog stopped");
    }

    /// Park until the deadline, a rearm or the park cap, then fire if due
    fn tick(&self) {
        let mut slot = self.slot.lock();
        let Some(armed) = slot.armed.clone() else {
            self.wakeup.wait_for(&mut slot, DEADLINE_MAX_PARK);
            return;
        };

        let Some(expires_at) = armed.deadline.expires_at() else {
            self.wakeup.wait_for(&mut slot, DEADLINE_MAX_PARK);
            return;
        };

        let now = Instant::now();
        if now < expires_at {
            let park = (expires_at - now).min(DEADLINE_MAX_PARK);
            self.wakeup.wait_for(&mut slot, park);
            return;
        }

        slot.armed = None;
        drop(slot);

        // The guest thread is abandoned here; only the sink is touched
        armed
            .logger
            .append_quiet(&AuditRecord::new(AuditSeverity::Warning, DEADLINE_EXCEEDED_MESSAGE));
        (self.action)();
    }
}

static PROCESS_WATCHDOG: OnceLock<Arc<Watchdog>> = OnceLock::new();

fn terminate_process() {
    std::process::exit(DEADLINE_EXIT_STATUS);
}

/// Wall-clock deadline over guest execution
///
/// Enforcers created with [`DeadlineEnforcer::new`] share the single
/// process-wide watchdog, so arming any of them replaces the deadline of all.
pub struct DeadlineEnforcer {
    watchdog: Arc<Watchdog>,
    logger: Arc<ViolationLogger>,
}

impl DeadlineEnforcer {
    /// Enforcer that terminates the process with status 1 on expiry
    pub fn new(logger: Arc<ViolationLogger>) -> Self {
        let watchdog = PROCESS_WATCHDOG
            .get_or_init(|| Watchdog::new(Arc::new(terminate_process)))
            .clone();
        Self { watchdog, logger }
    }

    /// Enforcer with its own watchdog running `action` on expiry
    ///
    /// The audit record is still written before `action` runs.
    pub fn with_expiry_action<F>(logger: Arc<ViolationLogger>, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            watchdog: Watchdog::new(Arc::new(action)),
            logger,
        }
    }

    /// Start the countdown, replacing any armed deadline
    ///
    /// `0` disarms instead.
    pub fn arm(&self, secs: u64) -> SandboxResult<()> {
        if secs == 0 {
            self.disarm();
            return Ok(());
        }

        self.watchdog
            .arm(Deadline::new(Duration::from_secs(secs)), Arc::clone(&self.logger))?;
        info!(secs, "execution deadline armed");
        Ok(())
    }

    /// Cancel the armed deadline; returns whether one was armed
    pub fn disarm(&self) -> bool {
        let was_armed = self.watchdog.disarm();
        if was_armed {
            info!("execution deadline disarmed");
        }
        was_armed
    }

    /// Currently armed deadline, if any
    pub fn deadline(&self) -> Option<Deadline> {
        self.watchdog.current()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline().map(|deadline| deadline.remaining())
    }

    pub fn is_armed(&self) -> bool {
        self.deadline().is_some()
    }
}

impl std::fmt::Debug for DeadlineEnforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineEnforcer")
            .field("remaining", &self.remaining())
            .finish()
    }
}
