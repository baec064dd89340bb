//! Queue configuration
//!
//! Capacity bound and latency, loadable from TOML.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::clock::Nanos;

/// Environment variable naming the TOML file read by [`QueueConfig::from_env`].
pub const CONFIG_PATH_ENV: &str = "LATENCY_FIFO_CONFIG";

/// Latency applied when none is configured: one time unit.
pub const DEFAULT_LATENCY_NS: Nanos = 1;

/// Upper bound on slots allocated at construction; larger bounds grow on demand.
pub const MAX_INITIAL_RESERVE: usize = 1024;

/// Maximum number of items (pending + visible) a queue holds at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capacity {
    /// No limit; `write` never rejects.
    #[default]
    Unbounded,
    /// At most this many items.
    Bounded(u32),
}

impl Capacity {
    /// Whether one more item fits when `len` items are already held.
    #[inline]
    pub fn admits(&self, len: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Bounded(limit) => len < *limit as usize,
        }
    }

    /// The numeric bound, if any.
    #[inline]
    pub fn limit(&self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Bounded(limit) => Some(*limit as usize),
        }
    }

    /// Slots to allocate up front for each internal sequence.
    #[inline]
    pub fn initial_reserve(&self) -> usize {
        self.limit().map_or(0, |limit| limit.min(MAX_INITIAL_RESERVE))
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Bounded(limit) => write!(f, "{}", limit),
        }
    }
}

/// Latency queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Delay between write and eligibility for promotion (ns)
    #[serde(default = "default_latency_ns")]
    pub latency_ns: Nanos,

    /// Capacity bound across pending and visible items
    #[serde(default)]
    pub capacity: Capacity,
}

fn default_latency_ns() -> Nanos {
    DEFAULT_LATENCY_NS
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: Capacity::Unbounded,
            latency_ns: DEFAULT_LATENCY_NS,
        }
    }
}

impl QueueConfig {
    pub fn new(capacity: Capacity, latency_ns: Nanos) -> Self {
        Self {
            capacity,
            latency_ns,
        }
    }

    /// Check the configuration describes a usable queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.latency_ns < 0 {
            return Err(ConfigError::NegativeLatency {
                latency_ns: self.latency_ns,
            });
        }
        if self.capacity == Capacity::Bounded(0) {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `LATENCY_FIFO_CONFIG`, or defaults
    pub fn from_env() -> Self {
        let Ok(path) = std::env::var(CONFIG_PATH_ENV) else {
            return Self::default();
        };

        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Using default queue config ({}): {}", path, e);
            Self::default()
        })
    }

    /// Save to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Errors for configurations that cannot back a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Latency below zero would make items eligible before they were written
    NegativeLatency { latency_ns: Nanos },
    /// `Bounded(0)` can never accept an item
    ZeroCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeLatency { latency_ns } => {
                write!(f, "latency must be non-negative, got {}ns", latency_ns)
            }
            Self::ZeroCapacity => write!(f, "bounded capacity must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}
