//! Monotonic time source for the orchestrator's cooperative timeout check.
//!
//! The orchestrator samples the clock once at request start and again at
//! each phase boundary.  [`ManualClock`] lets tests drive elapsed time
//! without sleeping.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Elapsed-time source.  `elapsed()` must never go backwards.
pub trait Clock: Send + Sync {
    /// Time since the clock's own origin.
    fn elapsed(&self) -> Duration;
}

/// Wall-clock monotonic time backed by `Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Test clock.  Time moves only through [`advance`](ManualClock::advance),
/// plus an optional fixed step added on every read.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
    step: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that advances by `step` each time it is read.
    pub fn ticking(step: Duration) -> Self {
        Self { now: Mutex::new(Duration::ZERO), step }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        match self.now.lock() {
            Ok(mut now) => {
                *now += self.step;
                *now
            }
            Err(_) => Duration::ZERO,
        }
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn elapsed(&self) -> Duration {
        (**self).elapsed()
    }
}
