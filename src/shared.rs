//! Shared Latency Queue
//!
//! Thread-safe latency queue for one producer thread and one consumer
//! thread, with promotion driven from either of them or from a third
//! driver.
//!
//! # Locking
//! - `pending` and `visible` each sit behind their own mutex
//! - `write` locks only `pending`, `read`/`peek` lock only `visible`, so the
//!   producer and consumer never contend with each other
//! - `promote` locks `pending` then `visible` (always in that order), so it
//!   is exclusive against every write, read and peek
//! - `full`/`empty`/`valid` take no lock: they read atomics published with
//!   release ordering

use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

use crate::clock::{Clock, Nanos};
use crate::config::{Capacity, ConfigError, QueueConfig};
use crate::queue::{promote_due, EmptyQueueError, Full, PendingEntry};
use crate::stats::{Occupancy, QueueCounters, QueueStats};

/// Latency queue usable through `&self` from two threads.
///
/// Wrap in an `Arc` and hand a clone to each side.
///
/// # Example
/// ```
/// use latency_fifo::{Capacity, SharedClock, SharedLatencyQueue};
/// use std::sync::Arc;
///
/// let clock = Arc::new(SharedClock::new(0));
/// let queue = Arc::new(SharedLatencyQueue::new(Capacity::Bounded(16), 100, clock.clone()));
///
/// let producer = {
///     let queue = Arc::clone(&queue);
///     std::thread::spawn(move || assert!(queue.write(1u32)))
/// };
/// producer.join().unwrap();
///
/// clock.advance_to(100);
/// queue.update();
/// assert_eq!(queue.read(), Ok(1));
/// ```
pub struct SharedLatencyQueue<T, C> {
    capacity: Capacity,
    latency: Nanos,
    clock: C,
    pending: Mutex<VecDeque<PendingEntry<T>>>,
    visible: Mutex<VecDeque<T>>,
    total_size: CachePadded<AtomicUsize>,
    visible_len: CachePadded<AtomicUsize>,
    counters: QueueCounters,
}

impl<T, C: Clock> SharedLatencyQueue<T, C> {
    /// Create a queue.
    ///
    /// # Panics
    /// Panics if `latency` is negative or `capacity` is `Bounded(0)`.
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
            pending: Mutex::new(VecDeque::with_capacity(reserve)),
            visible: Mutex::new(VecDeque::with_capacity(reserve)),
            total_size: CachePadded::new(AtomicUsize::new(0)),
            visible_len: CachePadded::new(AtomicUsize::new(0)),
            counters: QueueCounters::default(),
        })
    }

    /// Enqueue an item. Returns `false`, with no state change, when full.
    #[inline]
    pub fn write(&self, item: T) -> bool {
        self.try_write(item).is_ok()
    }

    /// Enqueue an item, handing it back inside [`Full`] when full.
    pub fn try_write(&self, item: T) -> Result<(), Full<T>> {
        let Some(depth) = self.reserve_slot() else {
            self.counters.record_reject();
            trace!(capacity = %self.capacity, "shared latency queue full, write rejected");
            return Err(Full(item));
        };

        let mut pending = self.pending.lock();
        let eligible_at = self.clock.now().saturating_add(self.latency);
        pending.push_back(PendingEntry { item, eligible_at });
        drop(pending);

        self.counters.record_write(depth);
        Ok(())
    }

    /// Claim one unit of capacity. Returns the new total size.
    fn reserve_slot(&self) -> Option<usize> {
        let mut current = self.total_size.load(Ordering::Acquire);
        loop {
            if !self.capacity.admits(current) {
                return None;
            }
            match self.total_size.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(current + 1),
                Err(actual) => current = actual,
            }
        }
    }

    /// Move every item eligible at `now` from pending to visible.
    pub fn promote(&self, now: Nanos) {
        let mut pending = self.pending.lock();
        let mut visible = self.visible.lock();

        let moved = promote_due(&mut pending, &mut visible, now);
        if moved > 0 {
            self.visible_len.fetch_add(moved, Ordering::Release);
            self.counters.record_promote(moved);
            debug!(
                moved,
                now,
                still_pending = pending.len(),
                "promoted shared latency queue items"
            );
        }
    }

    /// Promote against the queue's own clock.
    pub fn update(&self) {
        let now = self.clock.now();
        self.promote(now);
    }

    /// Remove and return the oldest visible item.
    pub fn read(&self) -> Result<T, EmptyQueueError> {
        let mut visible = self.visible.lock();
        let item = visible.pop_front().ok_or(EmptyQueueError)?;
        self.visible_len.fetch_sub(1, Ordering::Release);
        drop(visible);

        self.total_size.fetch_sub(1, Ordering::AcqRel);
        self.counters.record_read();
        Ok(item)
    }

    /// A clone of the oldest visible item.
    pub fn peek(&self) -> Result<T, EmptyQueueError>
    where
        T: Clone,
    {
        self.peek_with(T::clone)
    }

    /// Apply `f` to the oldest visible item without removing it.
    pub fn peek_with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, EmptyQueueError> {
        let visible = self.visible.lock();
        visible.front().map(f).ok_or(EmptyQueueError)
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
    #[inline]
    pub fn valid(&self) -> bool {
        self.visible_len.load(Ordering::Acquire) > 0
    }

    /// Pending plus visible items.
    #[inline]
    pub fn len(&self) -> usize {
        self.total_size.load(Ordering::Acquire)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    #[inline]
    pub fn visible_len(&self) -> usize {
        self.visible_len.load(Ordering::Acquire)
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
        self.pending.lock().front().map(|e| e.eligible_at)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Counters plus an occupancy read under both locks, so
    /// `total_size == pending + visible` holds in every snapshot.
    pub fn stats(&self) -> QueueStats {
        let pending = self.pending.lock();
        let visible = self.visible.lock();
        self.counters.snapshot(Occupancy {
            capacity: self.capacity,
            latency_ns: self.latency,
            total_size: pending.len() + visible.len(),
            pending: pending.len(),
            visible: visible.len(),
        })
    }
}

impl<T, C> fmt::Debug for SharedLatencyQueue<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLatencyQueue")
            .field("capacity", &self.capacity)
            .field("latency", &self.latency)
            .field("total_size", &self.total_size.load(Ordering::Acquire))
            .field("visible", &self.visible_len.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}
