//! Redis Store
//!
//! Backs the cache with a Redis server. Counters use `INCR`, which Redis
//! executes atomically, and enumeration uses cursor-based `SCAN` so a sweep
//! never blocks the server the way `KEYS` would.
//!
//! Records under the indexed prefix are also tracked in a Redis set, written
//! in the same MULTI/EXEC as the record itself. Counting them is then a
//! single `SCARD` instead of a walk over the namespace.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::info;

use super::KvStore;
use crate::error::{CacheError, Result};

/// Keys fetched per SCAN round-trip
const SCAN_BATCH: usize = 100;

/// Prefix whose records are mirrored in an index set.
struct IndexedPrefix {
    prefix: String,
    index_key: String,
}

// == Redis Store ==
pub struct RedisStore {
    connection: ConnectionManager,
    index: Option<IndexedPrefix>,
}

impl RedisStore {
    /// Connects to the Redis server at `endpoint` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let client = Client::open(endpoint)
            .map_err(|e| CacheError::ConfigInvalid(format!("bad redis endpoint: {}", e)))?;
        let connection = ConnectionManager::new(client).await?;
        info!("Connected to redis store at {}", endpoint);
        Ok(Self {
            connection,
            index: None,
        })
    }

    /// Mirrors every key under `prefix` into the set at `index_key`.
    ///
    /// `index_key` must not itself start with `prefix`. Keys written to the
    /// server without going through this store are not indexed.
    pub fn with_index(mut self, prefix: &str, index_key: &str) -> Self {
        self.index = Some(IndexedPrefix {
            prefix: prefix.to_string(),
            index_key: index_key.to_string(),
        });
        self
    }

    /// Index set covering `key`, if any.
    fn index_for(&self, key: &str) -> Option<&str> {
        self.index
            .as_ref()
            .filter(|ix| key.starts_with(&ix.prefix))
            .map(|ix| ix.index_key.as_str())
    }

    /// Index set that lists exactly the keys under `prefix`.
    fn index_of(&self, prefix: &str) -> Option<&str> {
        self.index
            .as_ref()
            .filter(|ix| ix.prefix == prefix)
            .map(|ix| ix.index_key.as_str())
    }

    async fn scan_index(&self, index_key: &str) -> Result<Vec<String>> {
        let mut conn = self.connection.clone();
        let mut keys = Vec::new();
        let mut cursor = 0u64;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SSCAN")
                .arg(index_key)
                .arg(cursor)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);
            cursor = next;

            if cursor == 0 {
                break;
            }
        }

        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }
}

/// Escapes glob metacharacters so `s` matches only itself in `SCAN MATCH`.
fn escape_glob(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        match self.index_for(key) {
            Some(index_key) => {
                let mut pipe = redis::pipe();
                pipe.atomic();
                pipe.set(key, value).ignore();
                pipe.sadd(index_key, key).ignore();
                pipe.query_async::<()>(&mut conn).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        match self.index_for(key) {
            Some(index_key) => {
                let mut pipe = redis::pipe();
                pipe.atomic();
                pipe.del(key).ignore();
                pipe.srem(index_key, key).ignore();
                pipe.query_async::<()>(&mut conn).await?;
            }
            None => {
                let _: () = conn.del(key).await?;
            }
        }
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<u64> {
        let mut conn = self.connection.clone();
        let count: u64 = conn.incr(key, 1u64).await?;
        Ok(count)
    }

    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
        if let Some(index_key) = self.index_of(prefix) {
            return self.scan_index(index_key).await;
        }

        let mut conn = self.connection.clone();
        let pattern = format!("{}*", escape_glob(prefix));
        let mut keys = Vec::new();
        let mut cursor = 0u64;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);
            cursor = next;

            if cursor == 0 {
                break;
            }
        }

        // SCAN may return a key more than once
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    async fn count_keys(&self, prefix: &str) -> Result<u64> {
        match self.index_of(prefix) {
            Some(index_key) => {
                let mut conn = self.connection.clone();
                let count: u64 = conn.scard(index_key).await?;
                Ok(count)
            }
            None => Ok(self.scan_keys(prefix).await?.len() as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    /// Store over a fresh namespace; returns the value prefix and index key.
    async fn indexed_store(ns: &str) -> (RedisStore, String, String) {
        let prefix = format!("prob_cache_test:{}:{}:v:", ns, std::process::id());
        let index_key = format!("prob_cache_test:{}:{}:idx", ns, std::process::id());
        let store = RedisStore::connect(&redis_url())
            .await
            .unwrap()
            .with_index(&prefix, &index_key);
        (store, prefix, index_key)
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("pcache:v:"), "pcache:v:");
        assert_eq!(escape_glob("a*b?c[d]e\\"), "a\\*b\\?c\\[d\\]e\\\\");
    }

    #[test]
    fn test_escaped_prefix_has_no_bare_wildcards() {
        let pattern = format!("{}*", escape_glob("app*:v:"));
        assert_eq!(pattern, "app\\*:v:*");
    }

    #[tokio::test]
    #[ignore] // Requires a local Redis server
    async fn test_set_delete_keep_index_in_step() {
        let (store, prefix, index_key) = indexed_store("index").await;
        let a = format!("{}a", prefix);
        let b = format!("{}b", prefix);

        store.set(&a, "1").await.unwrap();
        store.set(&b, "2").await.unwrap();
        store.set(&a, "3").await.unwrap();
        assert_eq!(store.count_keys(&prefix).await.unwrap(), 2);
        assert_eq!(store.scan_keys(&prefix).await.unwrap(), vec![a.clone(), b.clone()]);

        store.delete(&a).await.unwrap();
        store.delete(&a).await.unwrap();
        assert_eq!(store.count_keys(&prefix).await.unwrap(), 1);
        assert_eq!(store.get(&a).await.unwrap(), None);
        assert_eq!(store.get(&b).await.unwrap(), Some("2".to_string()));

        store.delete(&b).await.unwrap();
        store.delete(&index_key).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires a local Redis server
    async fn test_incr_counts_from_one() {
        let (store, _, _) = indexed_store("incr").await;
        let key = format!("prob_cache_test:incr:{}:c:n", std::process::id());
        store.delete(&key).await.unwrap();

        assert_eq!(store.incr(&key).await.unwrap(), 1);
        assert_eq!(store.incr(&key).await.unwrap(), 2);

        store.set(&key, "abc").await.unwrap();
        assert!(matches!(
            store.incr(&key).await,
            Err(CacheError::StoreUnavailable(_))
        ));

        store.delete(&key).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires a local Redis server
    async fn test_unindexed_scan_treats_prefix_literally() {
        let store = RedisStore::connect(&redis_url()).await.unwrap();
        let base = format!("prob_cache_test:glob:{}", std::process::id());
        let literal = format!("{}:a*:", base);
        let inside = format!("{}k", literal);
        let outside = format!("{}:abc:k", base);

        store.set(&inside, "1").await.unwrap();
        store.set(&outside, "1").await.unwrap();

        assert_eq!(store.scan_keys(&literal).await.unwrap(), vec![inside.clone()]);
        assert_eq!(store.count_keys(&literal).await.unwrap(), 1);

        store.delete(&inside).await.unwrap();
        store.delete(&outside).await.unwrap();
    }
}
