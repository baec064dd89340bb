//! Latency Queue Behaviour Tests
//!
//! End-to-end checks of the queue contract against a controlled clock:
//! - FIFO order through pending and visible
//! - Capacity enforcement and slot reuse
//! - No early promotion
//! - Size conservation across write/promote/read
//! - Empty and valid reported independently

use crate::clock::{Nanos, SimClock};
use crate::config::Capacity;
use crate::queue::{EmptyQueueError, LatencyQueue};
use crate::shared::SharedLatencyQueue;

// =============================================================================
// Reference scenario
// =============================================================================

#[test]
fn test_reference_scenario() {
    let mut q = LatencyQueue::new(Capacity::Bounded(2), 5, SimClock::new(0));

    assert!(q.write('A'));
    assert!(q.write('B'));
    assert!(!q.write('C'), "third write must be rejected at capacity 2");
    assert_eq!(q.len(), 2);

    q.promote(3);
    assert_eq!(q.visible_len(), 0);
    assert!(!q.valid());

    q.promote(5);
    assert_eq!(q.visible_len(), 2);
    assert!(q.valid());

    assert_eq!(q.read(), Ok('A'));
    assert_eq!(q.len(), 1);

    q.clock_mut().advance_to(5);
    assert!(q.write('C'), "freed slot must accept a write");
    assert_eq!(q.next_eligible_at(), Some(10));
    assert_eq!(q.read(), Ok('B'));
    assert!(!q.valid());
}

#[test]
fn test_reference_scenario_shared() {
    let q = SharedLatencyQueue::new(Capacity::Bounded(2), 5, SimClock::new(0));

    assert!(q.write('A'));
    assert!(q.write('B'));
    assert!(!q.write('C'));

    q.promote(3);
    assert!(!q.valid());

    q.promote(5);
    assert!(q.valid());
    assert_eq!(q.read(), Ok('A'));
    assert_eq!(q.len(), 1);
    assert!(q.write('C'));
}

// =============================================================================
// FIFO order
// =============================================================================

#[test]
fn test_fifo_order_across_promotions() {
    let mut q = LatencyQueue::new(Capacity::Unbounded, 10, SimClock::new(0));

    for i in 0..100u32 {
        q.clock_mut().advance_to(i as Nanos);
        assert!(q.write(i));
    }

    let mut out = Vec::new();
    for now in (0..=120).step_by(7) {
        q.promote(now);
        while let Ok(v) = q.read() {
            out.push(v);
        }
    }

    assert_eq!(out, (0..100).collect::<Vec<_>>());
    assert!(q.empty());
}

#[test]
fn test_interleaved_write_read_preserves_order() {
    let mut q = LatencyQueue::new(Capacity::Bounded(8), 0, SimClock::new(0));

    for i in 0..1000u64 {
        assert!(q.write(i));
        q.update();
        assert_eq!(q.read(), Ok(i));
    }
}

// =============================================================================
// Capacity
// =============================================================================

#[test]
fn test_capacity_rejects_exactly_one_past_limit() {
    for cap in [1u32, 2, 7, 64] {
        let mut q = LatencyQueue::new(Capacity::Bounded(cap), 3, SimClock::new(0));
        for i in 0..cap {
            assert!(q.write(i), "write {} of {} rejected", i, cap);
        }
        assert!(q.full());
        assert!(!q.write(cap));
        assert_eq!(q.len(), cap as usize);
        assert_eq!(q.pending_len(), cap as usize);
    }
}

#[test]
fn test_capacity_counts_pending_and_visible() {
    let mut q = LatencyQueue::new(Capacity::Bounded(3), 5, SimClock::new(0));
    q.write(1);
    q.write(2);
    q.promote(5);
    q.clock_mut().advance_to(5);
    q.write(3);

    assert_eq!(q.visible_len(), 2);
    assert_eq!(q.pending_len(), 1);
    assert!(q.full());
    assert!(!q.write(4));
}

#[test]
fn test_max_bound_constructs_lazily() {
    let mut q = LatencyQueue::new(Capacity::Bounded(u32::MAX), 0, SimClock::new(0));
    assert!(q.write(1u64));
    q.update();
    assert_eq!(q.read(), Ok(1));
    assert!(!q.full());

    let shared = SharedLatencyQueue::new(Capacity::Bounded(u32::MAX), 0, SimClock::new(0));
    assert!(shared.write(2u64));
    shared.update();
    assert_eq!(shared.read(), Ok(2));
    assert!(shared.empty());
}

#[test]
fn test_unbounded_never_full() {
    let mut q = LatencyQueue::new(Capacity::Unbounded, 1, SimClock::new(0));
    for i in 0..10_000u32 {
        assert!(q.write(i));
    }
    assert!(!q.full());
    assert_eq!(q.len(), 10_000);
}

// =============================================================================
// Latency
// =============================================================================

#[test]
fn test_no_early_promotion() {
    let latency = 1_000;
    let mut q = LatencyQueue::new(Capacity::Unbounded, latency, SimClock::new(0));
    q.clock_mut().advance_to(250);
    q.write("item");

    for now in [0, 250, 1_000, 1_249] {
        q.promote(now);
        assert!(!q.valid(), "item visible early at {}", now);
        assert_eq!(q.peek(), Err(EmptyQueueError));
    }

    q.promote(1_250);
    assert_eq!(q.peek(), Ok(&"item"));
}

#[test]
fn test_zero_latency_passes_straight_through() {
    let mut q = LatencyQueue::new(Capacity::Bounded(4), 0, SimClock::new(42));
    q.write(5u8);
    q.update();
    assert!(q.valid());
    assert_eq!(q.read(), Ok(5));
}

#[test]
fn test_late_promotion_moves_everything_due() {
    let mut q = LatencyQueue::new(Capacity::Unbounded, 10, SimClock::new(0));
    for t in [0, 3, 6, 9] {
        q.clock_mut().advance_to(t);
        q.write(t);
    }

    q.promote(15);
    assert_eq!(q.visible_len(), 2);
    q.promote(1_000);
    assert_eq!(q.visible_len(), 4);
    assert_eq!(q.pending_len(), 0);
}

// =============================================================================
// Size conservation
// =============================================================================

#[test]
fn test_promote_never_changes_size() {
    let mut q = LatencyQueue::new(Capacity::Bounded(16), 4, SimClock::new(0));
    for i in 0..10 {
        q.clock_mut().advance_to(i);
        q.write(i);
        let before = q.len();
        q.promote(i);
        assert_eq!(q.len(), before);
        assert_eq!(q.len(), q.pending_len() + q.visible_len());
    }
}

#[test]
fn test_write_read_pair_conserves_size() {
    let mut q = LatencyQueue::new(Capacity::Bounded(16), 0, SimClock::new(0));
    q.write(0);
    q.write(1);
    q.update();

    let before = q.len();
    q.write(2);
    q.read().unwrap();
    assert_eq!(q.len(), before);
}

#[test]
fn test_failed_read_leaves_state_untouched() {
    let mut q = LatencyQueue::new(Capacity::Bounded(2), 10, SimClock::new(0));
    q.write(1);
    assert_eq!(q.read(), Err(EmptyQueueError));
    assert_eq!(q.len(), 1);
    assert_eq!(q.pending_len(), 1);
}

// =============================================================================
// Empty / valid independence
// =============================================================================

#[test]
fn test_non_empty_but_invalid() {
    let mut q = LatencyQueue::new(Capacity::Bounded(2), 5, SimClock::new(0));
    assert!(q.empty());
    assert!(!q.valid());

    q.write(1);
    assert!(!q.empty());
    assert!(!q.valid());

    q.promote(5);
    assert!(!q.empty());
    assert!(q.valid());

    q.read().unwrap();
    assert!(q.empty());
    assert!(!q.valid());
}
