//! Queue Clock
//!
//! Time source injected into the latency queue. Every timestamp the queue
//! stores comes from a [`Clock`]; the queue never reads system time itself.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Nanoseconds on the clock's timeline.
/// i64 gives us ~292 years of range.
pub type Nanos = i64;

/// Conversion constants
pub const NANOS_PER_MICRO: i64 = 1_000;
pub const NANOS_PER_MILLI: i64 = 1_000_000;
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Monotonically non-decreasing time source.
///
/// FIFO ordering inside the queue relies on successive `now()` calls never
/// going backward.
pub trait Clock {
    /// Current time in nanoseconds.
    fn now(&self) -> Nanos;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now(&self) -> Nanos {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now(&self) -> Nanos {
        (**self).now()
    }
}

/// Deterministic single-owner clock.
///
/// # Determinism Contract
/// - `now()` returns whatever the owner last set, never system time
/// - `advance_to()` only moves forward, panics (debug) on backward movement
#[derive(Debug, Clone)]
pub struct SimClock {
    current: Nanos,
}

impl SimClock {
    /// Create a new clock starting at the given time.
    #[inline]
    pub fn new(start_time: Nanos) -> Self {
        Self {
            current: start_time,
        }
    }

    /// Current time in nanoseconds.
    #[inline]
    pub fn now(&self) -> Nanos {
        self.current
    }

    /// Advance clock to a new time. Panics if time would go backward.
    #[inline]
    pub fn advance_to(&mut self, new_time: Nanos) {
        debug_assert!(
            new_time >= self.current,
            "SimClock: cannot go backward from {} to {}",
            self.current,
            new_time
        );
        self.current = new_time;
    }

    /// Advance clock by a delta. Panics if delta is negative.
    #[inline]
    pub fn advance_by(&mut self, delta: Nanos) {
        debug_assert!(delta >= 0, "SimClock: delta must be non-negative");
        self.current += delta;
    }
}

impl Clock for SimClock {
    #[inline]
    fn now(&self) -> Nanos {
        self.current
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_nanos(self.current, f)
    }
}

/// Clock that can be advanced through a shared reference.
///
/// Lets a driver thread move time forward while producer and consumer
/// threads hold `Arc<SharedClock>` as their time source.
#[derive(Debug, Default)]
pub struct SharedClock {
    current: AtomicI64,
}

impl SharedClock {
    pub fn new(start_time: Nanos) -> Self {
        Self {
            current: AtomicI64::new(start_time),
        }
    }

    /// Move the clock forward to `new_time`.
    ///
    /// A request earlier than the current time is ignored, so readers never
    /// observe time going backward.
    #[inline]
    pub fn advance_to(&self, new_time: Nanos) {
        self.current.fetch_max(new_time, Ordering::AcqRel);
    }

    /// Move the clock forward by `delta`, saturating at `Nanos::MAX`.
    /// Negative deltas are ignored.
    #[inline]
    pub fn advance_by(&self, delta: Nanos) {
        if delta > 0 {
            let _ = self
                .current
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                    Some(t.saturating_add(delta))
                });
        }
    }
}

impl Clock for SharedClock {
    #[inline]
    fn now(&self) -> Nanos {
        self.current.load(Ordering::Acquire)
    }
}

impl fmt::Display for SharedClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_nanos(self.now(), f)
    }
}

fn fmt_nanos(nanos: Nanos, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let secs = nanos / NANOS_PER_SEC;
    let rem = (nanos % NANOS_PER_SEC).abs();
    write!(f, "{}.{:09}s", secs, rem)
}
