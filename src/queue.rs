//! Latency Queue
//!
//! SPSC FIFO that holds each item back for a fixed latency before the
//! consumer can see it.
//!
//! # Item Lifecycle
//! - `write` stamps the item with `eligible_at = clock.now() + latency` and
//!   appends it to `pending`
//! - `promote(now)` moves every pending head with `eligible_at <= now` to
//!   `visible`, stopping at the first one still in the future
//! - `read` removes the head of `visible`
//!
//! # Ordering
//! Latency is constant and the clock never goes backward, so `pending` is
//! sorted by `eligible_at`. Promotion is a head scan with early stop and
//! costs O(k) in the number of items it moves.
//!
//! # Exclusion
//! Mutating operations take `&mut self`, so promotion can never overlap a
//! write or read. For the two-thread form see
//! [`SharedLatencyQueue`](crate::shared::SharedLatencyQueue).

use crossbeam::utils::CachePadded;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

use crate::clock::{Clock, Nanos};
use crate::config::{Capacity, ConfigError, QueueConfig};
use crate::stats::{Occupancy, QueueCounters, QueueStats};

/// An accepted item waiting out its latency.
#[derive(Debug)]
pub(crate) struct PendingEntry<T> {
    pub item: T,
    pub eligible_at: Nanos,
}

/// Move due entries from the head of `pending` to the tail of `visible`.
/// Returns how many moved.
pub(crate) fn promote_due<T>(
    pending: &mut VecDeque<PendingEntry<T>>,
    visible: &mut VecDeque<T>,
    now: Nanos,
) -> usize {
    let mut moved = 0;
    while pending.front().is_some_and(|e| e.eligible_at <= now) {
        if let Some(entry) = pending.pop_front() {
            visible.push_back(entry.item);
            moved += 1;
        }
    }
    moved
}

/// Single-owner latency queue.
///
/// # Example
/// ```
/// use latency_fifo::{Capacity, LatencyQueue, SimClock};
///
/// let mut queue = LatencyQueue::new(Capacity::Bounded(2), 5, SimClock::new(0));
/// assert!(queue.write("a"));
/// assert!(!queue.valid());
///
/// queue.promote(5);
/// assert_eq!(queue.read(), Ok("a"));
/// ```
pub struct LatencyQueue<T, C> {
    capacity: Capacity,
    latency: Nanos,
    clock: C,
    pending: VecDeque<PendingEntry<T>>,
    visible: VecDeque<T>,
    total_size: CachePadded<AtomicUsize>,
    counters: QueueCounters,
}

impl<T, C: Clock> LatencyQueue<T, C> {
    /// Create a queue.
    ///
    /// # Panics
    /// Panics if `latency` is negative or `capacity` is `Bounded(0)`.
    /// Use [`with_config`](Self::with_config) to get an error instead.
    pub fn new(capacity: Capacity, latency: Nanos, clock: C) -> Self {
        match Self::with_config(QueueConfig::new(capacity, latency), clock) {
            Ok(queue) => queue,
            Err(e) => panic!("invalid latency queue config: {}", e),
        }
    }

    /// Create a queue from a validated configuration.
    pub fn with_config(config: QueueConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let reserve = config.capacity.initial_reserve();
        Ok(Self {
            capacity: config.capacity,
            latency: config.latency_ns,
            clock,
            pending: VecDeque::with_capacity(reserve),
            visible: VecDeque::with_capacity(reserve),
            total_size: CachePadded::new(AtomicUsize::new(0)),
            counters: QueueCounters::default(),
        })
    }

    /// Enqueue an item. Returns `false`, with no state change, when full.
    #[inline]
    pub fn write(&mut self, item: T) -> bool {
        self.try_write(item).is_ok()
    }

    /// Enqueue an item, handing it back inside [`Full`] when full.
    pub fn try_write(&mut self, item: T) -> Result<(), Full<T>> {
        let size = self.total_size.load(Ordering::Acquire);
        if !self.capacity.admits(size) {
            self.counters.record_reject();
            trace!(size, capacity = %self.capacity, "latency queue full, write rejected");
            return Err(Full(item));
        }

        let eligible_at = self.clock.now().saturating_add(self.latency);
        self.pending.push_back(PendingEntry { item, eligible_at });
        let depth = self.total_size.fetch_add(1, Ordering::AcqRel) + 1;
        self.counters.record_write(depth);
        Ok(())
    }

    /// Move every item eligible at `now` from pending to visible.
    pub fn promote(&mut self, now: Nanos) {
        let moved = promote_due(&mut self.pending, &mut self.visible, now);
        if moved > 0 {
            self.counters.record_promote(moved);
            debug!(
                moved,
                now,
                still_pending = self.pending.len(),
                "promoted latency queue items"
            );
        }
    }

    /// Promote against the queue's own clock.
    pub fn update(&mut self) {
        let now = self.clock.now();
        self.promote(now);
    }

    /// Remove and return the oldest visible item.
    pub fn read(&mut self) -> Result<T, EmptyQueueError> {
        let item = self.visible.pop_front().ok_or(EmptyQueueError)?;
        self.total_size.fetch_sub(1, Ordering::AcqRel);
        self.counters.record_read();
        Ok(item)
    }

    /// The oldest visible item, left in place.
    pub fn peek(&self) -> Result<&T, EmptyQueueError> {
        self.visible.front().ok_or(EmptyQueueError)
    }

    /// `true` when no further write would be accepted.
    #[inline]
    pub fn full(&self) -> bool {
        !self.capacity.admits(self.total_size.load(Ordering::Acquire))
    }

    /// `true` when neither pending nor visible items are held.
    #[inline]
    pub fn empty(&self) -> bool {
        self.total_size.load(Ordering::Acquire) == 0
    }

    /// `true` when at least one item can be read right now.
    ///
    /// Independent of [`empty`](Self::empty): items still in their latency
    /// window make the queue non-empty but not valid.
    #[inline]
    pub fn valid(&self) -> bool {
        !self.visible.is_empty()
    }

    /// Pending plus visible items.
    #[inline]
    pub fn len(&self) -> usize {
        self.total_size.load(Ordering::Acquire)
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    #[inline]
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    #[inline]
    pub fn latency(&self) -> Nanos {
        self.latency
    }

    /// Eligibility time of the oldest pending item.
    pub fn next_eligible_at(&self) -> Option<Nanos> {
        self.pending.front().map(|e| e.eligible_at)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot(Occupancy {
            capacity: self.capacity,
            latency_ns: self.latency,
            total_size: self.len(),
            pending: self.pending.len(),
            visible: self.visible.len(),
        })
    }
}

impl<T, C> fmt::Debug for LatencyQueue<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatencyQueue")
            .field("capacity", &self.capacity)
            .field("latency", &self.latency)
            .field("pending", &self.pending.len())
            .field("visible", &self.visible.len())
            .finish_non_exhaustive()
    }
}

/// Error returned when the queue is at capacity.
///
/// Contains the item that could not be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Returns the item that could not be written.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "latency queue is full")
    }
}

impl<T: fmt::Debug> std::error::Error for Full<T> {}

/// Error returned by `read`/`peek` when no item is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyQueueError;

impl fmt::Display for EmptyQueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no visible item in latency queue")
    }
}

impl std::error::Error for EmptyQueueError {}
