//! Sweep Bookkeeping
//!
//! Outcome reporting for eviction sweeps and bounded key sampling.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::cache::DrawSource;
use crate::error::CacheError;

// == Sweep Failure ==
/// A key whose evaluation or deletion failed during a sweep.
#[derive(Debug)]
pub struct SweepFailure {
    pub key: String,
    pub error: CacheError,
}

// == Sweep Report ==
/// Result of one pass over the population.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Entry count that triggered the sweep
    pub population: u64,
    /// Keys evaluated against the policy
    pub examined: usize,
    /// Keys whose value record was deleted
    pub evicted: Vec<String>,
    /// Per-key failures; the pass continued past each of them
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn new(population: u64) -> Self {
        Self {
            population,
            ..Self::default()
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub(crate) fn fail(&mut self, key: &str, error: CacheError) {
        self.failures.push(SweepFailure {
            key: key.to_string(),
            error,
        });
    }
}

// == Sweep Guard ==
/// Holds the engine's sweep flag for the duration of one sweep.
pub(crate) struct SweepGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SweepGuard<'a> {
    /// Claims the flag, or returns `None` if a sweep already holds it.
    pub(crate) fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// == Reservoir Sample ==
/// Keeps a uniform sample of at most `limit` keys (Algorithm R).
pub fn reservoir_sample(keys: Vec<String>, limit: usize, draws: &dyn DrawSource) -> Vec<String> {
    if keys.len() <= limit {
        return keys;
    }

    let mut iter = keys.into_iter();
    let mut reservoir: Vec<String> = iter.by_ref().take(limit).collect();

    for (offset, key) in iter.enumerate() {
        let seen = limit + offset + 1;
        let slot = ((draws.next_draw() * seen as f64) as usize).min(seen - 1);
        if slot < limit {
            reservoir[slot] = key;
        }
    }

    reservoir
}
