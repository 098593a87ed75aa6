//! Access Tracker Module
//!
//! Per-key access counters kept in the store's counter namespace, so every
//! engine sharing a store sees the same counts.

use std::sync::Arc;

use crate::error::{CacheError, Result};
use crate::store::{Keyspace, KvStore};

// == Access Tracker ==
/// Counts reads and writes per entry key.
#[derive(Clone)]
pub struct AccessTracker {
    store: Arc<dyn KvStore>,
    keyspace: Keyspace,
}

impl AccessTracker {
    // == Constructor ==
    pub fn new(store: Arc<dyn KvStore>, keyspace: Keyspace) -> Self {
        Self { store, keyspace }
    }

    // == Record Access ==
    /// Increments the counter for `key` and returns the new count.
    ///
    /// Relies on the store's atomic increment, so concurrent callers never
    /// lose an update.
    pub async fn record_access(&self, key: &str) -> Result<u64> {
        self.store.incr(&self.keyspace.counter_key(key)).await
    }

    // == Read Count ==
    /// Current count for `key`; 0 when no counter record exists.
    pub async fn read_count(&self, key: &str) -> Result<u64> {
        let counter_key = self.keyspace.counter_key(key);
        match self.store.get(&counter_key).await? {
            Some(raw) => raw.parse().map_err(|_| {
                CacheError::Internal(format!(
                    "counter record '{}' holds non-integer value '{}'",
                    counter_key, raw
                ))
            }),
            None => Ok(0),
        }
    }

    // == Forget ==
    /// Deletes the counter record. Idempotent.
    pub async fn forget(&self, key: &str) -> Result<()> {
        self.store.delete(&self.keyspace.counter_key(key)).await
    }
}
