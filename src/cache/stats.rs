//! Cache Statistics Module
//!
//! Tracks cache activity: hits, misses, writes, and sweep outcomes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of gets that found a value
    pub hits: u64,
    /// Number of gets that found nothing
    pub misses: u64,
    /// Number of successful sets
    pub sets: u64,
    /// Number of entries removed by eviction sweeps
    pub evictions: u64,
    /// Number of completed sweeps
    pub sweeps: u64,
    /// Per-key failures encountered during sweeps
    pub sweep_failures: u64,
    /// Sweeps skipped because another sweep was running
    pub skipped_sweeps: u64,
    /// Current number of entries in the value namespace
    pub total_entries: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Lock-free counters shared by concurrent engine callers.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
    sweeps: AtomicU64,
    sweep_failures: AtomicU64,
    skipped_sweeps: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a finished sweep with its eviction and failure counts.
    pub fn record_sweep(&self, evicted: usize, failures: usize) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        self.sweep_failures.fetch_add(failures as u64, Ordering::Relaxed);
    }

    pub fn record_skipped_sweep(&self) {
        self.skipped_sweeps.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    pub fn snapshot(&self, total_entries: u64) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            sweep_failures: self.sweep_failures.load(Ordering::Relaxed),
            skipped_sweeps: self.skipped_sweeps.load(Ordering::Relaxed),
            total_entries,
        }
    }
}
