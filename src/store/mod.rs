//! Store Module
//!
//! Capability interface over the backing key-value store, plus the
//! in-memory and Redis implementations. No eviction logic lives here.

mod keyspace;
mod memory;
#[cfg(feature = "redis")]
mod redis_store;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{CacheError, Result};

pub use keyspace::Keyspace;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

// == KvStore Trait ==
/// Operations the cache needs from a backing store.
///
/// Failures are connectivity or protocol errors and surface as
/// [`CacheError::StoreUnavailable`].
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Atomically increments the integer stored under `key` and returns the
    /// new value. An absent key is treated as 0.
    async fn incr(&self, key: &str) -> Result<u64>;

    /// Lists every stored key starting with `prefix`, in no particular order.
    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Counts the stored keys starting with `prefix`.
    async fn count_keys(&self, prefix: &str) -> Result<u64> {
        Ok(self.scan_keys(prefix).await?.len() as u64)
    }
}

// == Connect ==
/// Opens the store named by `endpoint` for records laid out by `keyspace`.
///
/// `memory://` gives a fresh [`MemoryStore`]; `redis://` and `rediss://`
/// need the `redis` feature.
pub async fn connect(endpoint: &str, keyspace: &Keyspace) -> Result<Arc<dyn KvStore>> {
    if endpoint.starts_with("memory://") {
        return Ok(Arc::new(MemoryStore::new()));
    }

    if endpoint.starts_with("redis://") || endpoint.starts_with("rediss://") {
        return connect_redis(endpoint, keyspace).await;
    }

    Err(CacheError::ConfigInvalid(format!(
        "unsupported store endpoint: {}",
        endpoint
    )))
}

#[cfg(feature = "redis")]
async fn connect_redis(endpoint: &str, keyspace: &Keyspace) -> Result<Arc<dyn KvStore>> {
    Ok(Arc::new(RedisStore::connect(endpoint).await?.with_index(
        keyspace.value_prefix(),
        keyspace.index_key(),
    )))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(endpoint: &str, _keyspace: &Keyspace) -> Result<Arc<dyn KvStore>> {
    Err(CacheError::ConfigInvalid(format!(
        "{} requires the `redis` feature",
        endpoint
    )))
}
