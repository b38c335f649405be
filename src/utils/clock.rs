//! Injectable monotonic time source
//!
//! Every timer in the player reads time through a `Clock` so that the
//! orchestrator runs on real time while tests step a `ManualClock`.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of monotonic time
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Clock shared between the session, interpreter and supervisor
pub type SharedClock = Arc<dyn Clock>;

/// Wall-clock backed implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    /// Create a shared system clock
    pub fn shared() -> SharedClock {
        Arc::new(SystemClock)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
///
/// Starts at the instant it was created and advances by explicit steps.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Create a manual clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Create a manual clock wrapped in an `Arc`
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Move time forward in milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}
