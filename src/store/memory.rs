//! In-Memory Store
//!
//! HashMap-backed store for single-process deployments and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::KvStore;
use crate::error::{CacheError, Result};

// == Memory Store ==
/// In-process key-value store guarded by an async RwLock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all namespaces.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.records
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.records.write().await.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<u64> {
        // Read-modify-write happens under one write guard
        let mut records = self.records.write().await;
        let current = match records.get(key) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                CacheError::StoreUnavailable(format!(
                    "value at '{}' is not an integer",
                    key
                ))
            })?,
            None => 0,
        };
        let next = current.checked_add(1).ok_or_else(|| {
            CacheError::StoreUnavailable(format!("increment of '{}' would overflow", key))
        })?;
        records.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .records
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn count_keys(&self, prefix: &str) -> Result<u64> {
        Ok(self
            .records
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .count() as u64)
    }
}
