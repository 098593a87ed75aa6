//! Keyspace Module
//!
//! Splits the flat store keyspace into a value namespace and a counter
//! namespace so sizing and sweeping never see counter records.

// == Keyspace ==
/// Derives record names for an entry key.
///
/// With prefix `pcache`, entry `user:1` is stored as `pcache:v:user:1` and its
/// access counter as `pcache:c:user:1`. Stores that cannot count a prefix
/// cheaply keep an index of value records under `pcache:idx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyspace {
    value_prefix: String,
    counter_prefix: String,
    index_key: String,
}

impl Keyspace {
    // == Constructor ==
    /// Creates a keyspace rooted at `prefix`.
    pub fn new(prefix: &str) -> Self {
        Self {
            value_prefix: format!("{}:v:", prefix),
            counter_prefix: format!("{}:c:", prefix),
            index_key: format!("{}:idx", prefix),
        }
    }

    /// Store key of the value record for `key`.
    pub fn value_key(&self, key: &str) -> String {
        format!("{}{}", self.value_prefix, key)
    }

    /// Store key of the counter record for `key`.
    pub fn counter_key(&self, key: &str) -> String {
        format!("{}{}", self.counter_prefix, key)
    }

    /// Prefix shared by every value record.
    pub fn value_prefix(&self) -> &str {
        &self.value_prefix
    }

    /// Store key of the set indexing every value record.
    pub fn index_key(&self) -> &str {
        &self.index_key
    }

    /// Recovers the entry key from a value record key.
    ///
    /// Returns `None` for keys outside the value namespace.
    pub fn entry_key<'a>(&self, store_key: &'a str) -> Option<&'a str> {
        store_key.strip_prefix(&self.value_prefix)
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new("pcache")
    }
}
