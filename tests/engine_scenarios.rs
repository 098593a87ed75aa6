//! End-to-end scenarios for the cache engine
//!
//! Exercises the engine against the in-memory store and against stores that
//! inject failures.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use prob_cache::cache::{
    CacheEngine, DrawSource, EvictionPolicy, ScriptedDraws, SeededDraws,
};
use prob_cache::store::{KvStore, MemoryStore};
use prob_cache::{CacheError, Result};
use tokio_test::{assert_err, assert_ok};

// == Helper Functions ==

fn engine_with(
    store: Arc<dyn KvStore>,
    max: usize,
    base: f64,
    draws: Arc<dyn DrawSource>,
) -> CacheEngine {
    CacheEngine::new(store, EvictionPolicy::new(base).unwrap(), max)
        .unwrap()
        .with_draws(draws)
}

/// Memory store whose deletes fail for selected keys.
struct FlakyDeleteStore {
    inner: MemoryStore,
    failing: HashSet<String>,
}

#[async_trait]
impl KvStore for FlakyDeleteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if self.failing.contains(key) {
            return Err(CacheError::StoreUnavailable(format!("delete of {} timed out", key)));
        }
        self.inner.delete(key).await
    }

    async fn incr(&self, key: &str) -> Result<u64> {
        self.inner.incr(key).await
    }

    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.scan_keys(prefix).await
    }
}

/// Store that is reachable for reads and writes but cannot be sized.
struct NoCountStore {
    inner: MemoryStore,
}

#[async_trait]
impl KvStore for NoCountStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn incr(&self, key: &str) -> Result<u64> {
        self.inner.incr(key).await
    }

    async fn scan_keys(&self, _prefix: &str) -> Result<Vec<String>> {
        Err(CacheError::StoreUnavailable("SCAN refused".to_string()))
    }
}

/// Store with no connection at all.
struct DownStore;

#[async_trait]
impl KvStore for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(CacheError::StoreUnavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(CacheError::StoreUnavailable("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(CacheError::StoreUnavailable("connection refused".to_string()))
    }

    async fn incr(&self, _key: &str) -> Result<u64> {
        Err(CacheError::StoreUnavailable("connection refused".to_string()))
    }

    async fn scan_keys(&self, _prefix: &str) -> Result<Vec<String>> {
        Err(CacheError::StoreUnavailable("connection refused".to_string()))
    }
}

// == Access Counting ==

#[tokio::test]
async fn test_get_on_unknown_key_returns_none_and_counts() {
    let engine = engine_with(
        Arc::new(MemoryStore::new()),
        100,
        0.1,
        Arc::new(SeededDraws::new(1)),
    );

    let value = assert_ok!(engine.get("never_set").await);
    assert!(value.is_none());
    assert_eq!(engine.access_count("never_set").await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_access_loses_no_updates() {
    let engine = Arc::new(engine_with(
        Arc::new(MemoryStore::new()),
        100,
        0.1,
        Arc::new(SeededDraws::new(2)),
    ));
    let n = 200;

    let mut handles = Vec::new();
    for i in 0..n {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                engine.set("shared", "v").await.map(|_| ())
            } else {
                engine.get("shared").await.map(|_| ())
            }
        }));
    }
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    assert_eq!(engine.access_count("shared").await.unwrap(), n as u64);
}

// == Sweeps ==

#[tokio::test]
async fn test_population_shrinks_after_sweeps() {
    let engine = engine_with(
        Arc::new(MemoryStore::new()),
        100,
        0.1,
        Arc::new(SeededDraws::new(42)),
    );

    for i in 0..200 {
        engine.set(&format!("key{}", i), &format!("value{}", i)).await.unwrap();
    }

    let stats = engine.stats().await.unwrap();
    assert!(stats.sweeps > 0);
    assert!(stats.evictions > 0);
    assert!(engine.len().await.unwrap() < 200);
}

#[tokio::test]
async fn test_every_key_evaluated_in_each_sweep() {
    let draws = Arc::new(ScriptedDraws::constant(0.99));
    let engine = engine_with(Arc::new(MemoryStore::new()), 5, 1.0, draws.clone());

    for i in 0..10 {
        engine.set(&format!("k{}", i), "v").await.unwrap();
    }

    // Sweeps after the 6th..10th set see 6..10 keys, one draw per key
    assert_eq!(draws.consumed(), 6 + 7 + 8 + 9 + 10);
    assert_eq!(engine.len().await.unwrap(), 10);
    assert_eq!(engine.stats().await.unwrap().sweeps, 5);
}

#[tokio::test]
async fn test_single_access_eviction_rate_is_half() {
    let draws: Arc<dyn DrawSource> = Arc::new(SeededDraws::new(2024));
    let mut examined = 0usize;
    let mut evicted = 0usize;

    for _ in 0..500 {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(store.clone(), 5, 1.0, draws.clone());

        for i in 0..5 {
            engine.set(&format!("k{}", i), "v").await.unwrap();
        }
        // Sixth entry with one access, written without triggering the sweep
        store.set("pcache:v:k5", "v").await.unwrap();
        store.set("pcache:c:k5", "1").await.unwrap();

        let report = engine.maybe_evict().await.unwrap().unwrap();
        examined += report.examined;
        evicted += report.evicted.len();
    }

    assert_eq!(examined, 3000);
    let rate = evicted as f64 / examined as f64;
    assert!((rate - 0.5).abs() < 0.05, "eviction rate {} too far from 0.5", rate);
}

#[tokio::test]
async fn test_sampled_sweep_still_evicts() {
    let engine = engine_with(
        Arc::new(MemoryStore::new()),
        10,
        1.0,
        Arc::new(ScriptedDraws::constant(0.0)),
    )
    .with_sample_size(Some(3));

    for i in 0..11 {
        engine.set(&format!("k{}", i), "v").await.unwrap();
    }

    // One sweep over a sample of 3 keys, all evicted at draw 0.0
    assert_eq!(engine.len().await.unwrap(), 8);
    assert_eq!(engine.stats().await.unwrap().evictions, 3);
}

// == Failures ==

#[tokio::test]
async fn test_sweep_continues_past_failed_delete() {
    let failing: HashSet<String> = ["pcache:v:bad".to_string()].into_iter().collect();
    let store = Arc::new(FlakyDeleteStore {
        inner: MemoryStore::new(),
        failing,
    });
    let engine = engine_with(store.clone(), 1, 1.0, Arc::new(ScriptedDraws::constant(0.0)));

    for key in ["bad", "good1", "good2"] {
        store.set(&format!("pcache:v:{}", key), "v").await.unwrap();
        store.set(&format!("pcache:c:{}", key), "4").await.unwrap();
    }

    let report = engine.maybe_evict().await.unwrap().unwrap();
    assert_eq!(report.examined, 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key, "bad");
    assert!(matches!(report.failures[0].error, CacheError::StoreUnavailable(_)));

    let mut evicted = report.evicted.clone();
    evicted.sort();
    assert_eq!(evicted, vec!["good1".to_string(), "good2".to_string()]);
    assert_eq!(engine.len().await.unwrap(), 1);
    assert_eq!(engine.stats().await.unwrap().sweep_failures, 1);
}

#[tokio::test]
async fn test_set_succeeds_when_sweep_fails() {
    let failing: HashSet<String> = (0..3).map(|i| format!("pcache:v:k{}", i)).collect();
    let store = Arc::new(FlakyDeleteStore {
        inner: MemoryStore::new(),
        failing,
    });
    let engine = engine_with(store, 1, 1.0, Arc::new(ScriptedDraws::constant(0.0)));

    for i in 0..3 {
        assert_ok!(engine.set(&format!("k{}", i), "v").await);
    }
    assert_eq!(engine.get("k2").await.unwrap(), Some("v".to_string()));
    assert!(engine.stats().await.unwrap().sweep_failures > 0);
}

#[tokio::test]
async fn test_set_succeeds_when_sizing_fails() {
    let engine = engine_with(
        Arc::new(NoCountStore {
            inner: MemoryStore::new(),
        }),
        1,
        1.0,
        Arc::new(ScriptedDraws::constant(0.0)),
    );

    assert_ok!(engine.set("a", "1").await);
    assert_ok!(engine.set("b", "2").await);
    assert_err!(engine.maybe_evict().await);
    assert_eq!(engine.get("a").await.unwrap(), Some("1".to_string()));
}

#[tokio::test]
async fn test_store_unavailable_propagates() {
    let engine = engine_with(Arc::new(DownStore), 10, 0.1, Arc::new(SeededDraws::new(3)));

    assert!(matches!(
        engine.get("k").await,
        Err(CacheError::StoreUnavailable(_))
    ));
    assert!(matches!(
        engine.set("k", "v").await,
        Err(CacheError::StoreUnavailable(_))
    ));
}
