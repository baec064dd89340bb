//! Queue counters
//!
//! Lifetime throughput counters for a latency queue, exposed as a
//! serializable snapshot.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::clock::Nanos;
use crate::config::Capacity;

/// Relaxed counters updated on every queue operation.
#[derive(Debug, Default)]
pub(crate) struct QueueCounters {
    written: AtomicU64,
    rejected: AtomicU64,
    promoted: AtomicU64,
    read: AtomicU64,
    max_depth: AtomicUsize,
}

impl QueueCounters {
    #[inline]
    pub(crate) fn record_write(&self, depth: usize) {
        self.written.fetch_add(1, Ordering::Relaxed);
        self.max_depth.fetch_max(depth, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_reject(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_promote(&self, count: usize) {
        self.promoted.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_read(&self) {
        self.read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, occupancy: Occupancy) -> QueueStats {
        QueueStats {
            capacity: occupancy.capacity,
            latency_ns: occupancy.latency_ns,
            total_size: occupancy.total_size,
            pending: occupancy.pending,
            visible: occupancy.visible,
            max_depth: self.max_depth.load(Ordering::Relaxed),
            total_written: self.written.load(Ordering::Relaxed),
            total_rejected: self.rejected.load(Ordering::Relaxed),
            total_promoted: self.promoted.load(Ordering::Relaxed),
            total_read: self.read.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time occupancy supplied by the owning queue.
pub(crate) struct Occupancy {
    pub capacity: Capacity,
    pub latency_ns: Nanos,
    pub total_size: usize,
    pub pending: usize,
    pub visible: usize,
}

/// Snapshot of queue counters for serialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub capacity: Capacity,
    pub latency_ns: Nanos,
    pub total_size: usize,
    pub pending: usize,
    pub visible: usize,
    pub max_depth: usize,
    pub total_written: u64,
    pub total_rejected: u64,
    pub total_promoted: u64,
    pub total_read: u64,
}

impl QueueStats {
    /// Fraction of capacity in use, in percent. `None` when unbounded.
    pub fn utilization_pct(&self) -> Option<f64> {
        self.capacity
            .limit()
            .map(|limit| self.total_size as f64 / limit as f64 * 100.0)
    }
}
