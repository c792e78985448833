// core/debounce.rs

// Duplicate-press filter for pendant buttons. Desk tends to report a single
// physical press more than once, so events closer than the window to the last
// accepted one are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source, expressed as time elapsed since some fixed origin
pub trait Clock {
    /// Current time relative to the clock's origin
    fn now(&self) -> Duration;
}

/// Wall clock backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Starts counting from now
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Starts at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward, stopping at the largest representable time
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(by))
            });
    }

    /// Advances by a number of seconds
    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// Accepts an event only if the window has passed since the last accepted one
pub struct Debouncer {
    clock: Box<dyn Clock>,
    window: Duration,
    last_accepted: Duration,
}

impl Debouncer {
    /// The first window starts at construction time
    pub fn new(clock: Box<dyn Clock>, window: Duration) -> Self {
        let last_accepted = clock.now();
        Debouncer {
            clock,
            window,
            last_accepted,
        }
    }

    /// Returns true and restarts the window if the event should be handled
    pub fn accept(&mut self) -> bool {
        let now = self.clock.now();
        if now.saturating_sub(self.last_accepted) < self.window {
            return false;
        }
        self.last_accepted = now;
        true
    }
}
