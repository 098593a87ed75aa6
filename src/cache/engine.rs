//! Cache Engine Module
//!
//! Orchestrates reads and writes against the backing store, counts every
//! access, and runs a probabilistic eviction sweep when a write leaves the
//! population above capacity.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::sweep::{reservoir_sample, SweepGuard, SweepReport};
use crate::cache::{
    AccessTracker, CacheStats, DrawSource, EvictionPolicy, StatsRecorder, ThreadDraws,
    MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::store::{Keyspace, KvStore};

// == Cache Engine ==
/// Key-value cache with frequency-aware probabilistic eviction.
///
/// All methods take `&self`; share an engine across tasks with `Arc`.
/// Only the counter increment is atomic. Gets and sets may race with a
/// running sweep, which is acceptable for an advisory cache.
pub struct CacheEngine {
    store: Arc<dyn KvStore>,
    keyspace: Keyspace,
    tracker: AccessTracker,
    policy: EvictionPolicy,
    draws: Arc<dyn DrawSource>,
    stats: StatsRecorder,
    /// Set while a sweep is running
    sweeping: AtomicBool,
    /// Population size above which writes trigger a sweep
    max_cache_size: usize,
    /// Keys evaluated per sweep; `None` evaluates all of them
    sample_size: Option<usize>,
}

impl CacheEngine {
    // == Constructor ==
    /// Creates an engine over `store`.
    ///
    /// # Arguments
    /// * `store` - Backing store shared with any other engine instances
    /// * `policy` - Validated eviction policy
    /// * `max_cache_size` - Capacity that triggers a sweep; must be positive
    pub fn new(
        store: Arc<dyn KvStore>,
        policy: EvictionPolicy,
        max_cache_size: usize,
    ) -> Result<Self> {
        if max_cache_size == 0 {
            return Err(CacheError::ConfigInvalid(
                "max_cache_size must be positive".to_string(),
            ));
        }

        let keyspace = Keyspace::default();
        Ok(Self {
            tracker: AccessTracker::new(store.clone(), keyspace.clone()),
            store,
            keyspace,
            policy,
            draws: Arc::new(ThreadDraws),
            stats: StatsRecorder::new(),
            sweeping: AtomicBool::new(false),
            max_cache_size,
            sample_size: None,
        })
    }

    /// Creates an engine from validated configuration.
    pub fn from_config(config: &Config, store: Arc<dyn KvStore>) -> Result<Self> {
        config.validate()?;
        let policy = EvictionPolicy::new(config.eviction_probability)?;
        Ok(Self::new(store, policy, config.max_cache_size)?
            .with_keyspace(Keyspace::new(&config.key_prefix))
            .with_sample_size(config.sweep_sample_size))
    }

    /// Replaces the random source used for eviction draws.
    pub fn with_draws(mut self, draws: Arc<dyn DrawSource>) -> Self {
        self.draws = draws;
        self
    }

    /// Places value and counter records under a different namespace.
    pub fn with_keyspace(mut self, keyspace: Keyspace) -> Self {
        self.tracker = AccessTracker::new(self.store.clone(), keyspace.clone());
        self.keyspace = keyspace;
        self
    }

    /// Limits each sweep to a reservoir sample of `sample_size` keys.
    pub fn with_sample_size(mut self, sample_size: Option<usize>) -> Self {
        self.sample_size = sample_size;
        self
    }

    // == Get ==
    /// Retrieves the value for `key`, or `None` on a miss.
    ///
    /// The access is counted even on a miss. Never triggers eviction.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self.store.get(&self.keyspace.value_key(key)).await?;
        self.tracker.record_access(key).await?;

        if value.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        Ok(value)
    }

    // == Set ==
    /// Stores `value` under `key`, counts the access, then sweeps if the
    /// population exceeds capacity.
    ///
    /// Succeeds once the value is written; sweep problems are logged, not
    /// returned.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidRequest(
                "Key cannot be empty".to_string(),
            ));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        self.store.set(&self.keyspace.value_key(key), value).await?;
        self.tracker.record_access(key).await?;
        self.stats.record_set();

        if let Err(e) = self.maybe_evict().await {
            warn!("Eviction sweep after set of '{}' aborted: {}", key, e);
        }
        Ok(())
    }

    // == Maybe Evict ==
    /// Runs one sweep if the population exceeds `max_cache_size`.
    ///
    /// Returns `None` when under capacity or when another sweep is already
    /// running. Per-key failures are collected in the report; only sizing or
    /// enumeration failures are returned as errors.
    pub async fn maybe_evict(&self) -> Result<Option<SweepReport>> {
        let population = self.store.count_keys(self.keyspace.value_prefix()).await?;
        if population <= self.max_cache_size as u64 {
            return Ok(None);
        }

        let Some(_guard) = SweepGuard::try_acquire(&self.sweeping) else {
            debug!("Sweep already in progress, skipping (population={})", population);
            self.stats.record_skipped_sweep();
            return Ok(None);
        };

        let report = self.sweep(population).await?;
        self.stats.record_sweep(report.evicted.len(), report.failures.len());

        if report.has_failures() {
            let keys: Vec<&str> = report.failures.iter().map(|f| f.key.as_str()).collect();
            warn!(
                "Eviction sweep finished with {} failures (keys: {:?}); first error: {}",
                report.failures.len(),
                keys,
                report.failures[0].error
            );
        }
        info!(
            "Eviction sweep: population={}, examined={}, evicted={}",
            report.population,
            report.examined,
            report.evicted.len()
        );

        Ok(Some(report))
    }

    /// One pass over the value namespace. No re-check of size mid-pass.
    async fn sweep(&self, population: u64) -> Result<SweepReport> {
        let mut report = SweepReport::new(population);

        let entry_keys: Vec<String> = self
            .store
            .scan_keys(self.keyspace.value_prefix())
            .await?
            .iter()
            .filter_map(|k| self.keyspace.entry_key(k))
            .map(str::to_string)
            .collect();

        let candidates = match self.sample_size {
            Some(limit) => reservoir_sample(entry_keys, limit, self.draws.as_ref()),
            None => entry_keys,
        };

        for key in candidates {
            // Read right before the draw so concurrent accesses count
            let count = match self.tracker.read_count(&key).await {
                Ok(count) => count,
                Err(e) => {
                    report.fail(&key, e);
                    continue;
                }
            };
            report.examined += 1;

            let draw = self.draws.next_draw();
            if !self.policy.should_evict(count, draw) {
                continue;
            }
            debug!("Evicting '{}' (access_count={}, draw={:.4})", key, count, draw);

            let value_deleted = match self.store.delete(&self.keyspace.value_key(&key)).await {
                Ok(()) => true,
                Err(e) => {
                    report.fail(&key, e);
                    false
                }
            };
            if let Err(e) = self.tracker.forget(&key).await {
                report.fail(&key, e);
            }
            if value_deleted {
                report.evicted.push(key);
            }
        }

        Ok(report)
    }

    // == Access Count ==
    /// Current access count for `key`, without counting this lookup.
    pub async fn access_count(&self, key: &str) -> Result<u64> {
        self.tracker.read_count(key).await
    }

    // == Length ==
    /// Number of entries in the value namespace.
    pub async fn len(&self) -> Result<u64> {
        self.store.count_keys(self.keyspace.value_prefix()).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> Result<CacheStats> {
        Ok(self.stats.snapshot(self.len().await?))
    }

    pub fn max_cache_size(&self) -> usize {
        self.max_cache_size
    }

    pub fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }
}
