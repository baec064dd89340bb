//! Latency FIFO
//!
//! Single-producer/single-consumer queue that delays every item by a fixed
//! latency: an item written at `t` becomes readable only after a promotion
//! step at or past `t + latency`.
//!
//! - [`LatencyQueue`]: single-owner queue, exclusion enforced by `&mut self`
//! - [`SharedLatencyQueue`]: `&self` queue for a producer thread and a
//!   consumer thread
//! - [`Clock`]: injected time source ([`SimClock`], [`SharedClock`])

pub mod clock;
pub mod config;
pub mod queue;
pub mod shared;
pub mod stats;

#[cfg(test)]
mod queue_tests;

pub use clock::{Clock, Nanos, SharedClock, SimClock};
pub use config::{Capacity, ConfigError, QueueConfig};
pub use queue::{EmptyQueueError, Full, LatencyQueue};
pub use shared::SharedLatencyQueue;
pub use stats::QueueStats;
