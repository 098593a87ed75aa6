//! Eviction Policy Module
//!
//! Frequency-aware probabilistic eviction. A key with access count `n` is
//! evicted with probability `(1 - 1/(n + 1)) * base`: zero for untouched
//! keys, rising towards `base` as the key gets hotter.

use crate::error::{CacheError, Result};

// == Eviction Probability ==
/// Probability that a key with `access_count` accesses is evicted.
pub fn eviction_probability(access_count: u64, base_probability: f64) -> f64 {
    (1.0 - 1.0 / (access_count as f64 + 1.0)) * base_probability
}

// == Should Evict ==
/// Evicts iff `random_draw` falls below the key's eviction probability.
pub fn should_evict(access_count: u64, base_probability: f64, random_draw: f64) -> bool {
    random_draw < eviction_probability(access_count, base_probability)
}

// == Eviction Policy ==
/// A validated base probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvictionPolicy {
    base_probability: f64,
}

impl EvictionPolicy {
    /// Creates a policy, rejecting a base probability outside `[0, 1]`.
    pub fn new(base_probability: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&base_probability) {
            return Err(CacheError::ConfigInvalid(format!(
                "eviction probability must be within [0, 1], got {}",
                base_probability
            )));
        }
        Ok(Self { base_probability })
    }

    pub fn base_probability(&self) -> f64 {
        self.base_probability
    }

    pub fn probability(&self, access_count: u64) -> f64 {
        eviction_probability(access_count, self.base_probability)
    }

    pub fn should_evict(&self, access_count: u64, random_draw: f64) -> bool {
        should_evict(access_count, self.base_probability, random_draw)
    }
}
