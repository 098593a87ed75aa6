//! Configuration Module
//!
//! Handles loading and validating cache configuration from environment variables.

use std::env;

use crate::error::{CacheError, Result};

/// Default maximum number of entries before a sweep is triggered
pub const DEFAULT_MAX_CACHE_SIZE: usize = 100;

/// Default base eviction probability
pub const DEFAULT_EVICTION_PROBABILITY: f64 = 0.1;

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// The cache-related values are fixed for the lifetime of an engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address of the backing store (`memory://`, `redis://host:port`)
    pub store_endpoint: String,
    /// Population size above which a write triggers an eviction sweep
    pub max_cache_size: usize,
    /// Base rate the per-key eviction probability approaches
    pub eviction_probability: f64,
    /// Reservoir sample size per sweep; `None` sweeps every key
    pub sweep_sample_size: Option<usize>,
    /// Background sweep interval in seconds, 0 disables the task
    pub sweep_interval: u64,
    /// Prefix for the value and counter namespaces in the store
    pub key_prefix: String,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `STORE_ENDPOINT` - Backing store address (default: memory://)
    /// - `MAX_CACHE_SIZE` - Capacity before sweeping (default: 100)
    /// - `EVICTION_PROBABILITY` - Base eviction rate (default: 0.1)
    /// - `SWEEP_SAMPLE_SIZE` - Keys sampled per sweep (default: unset, full sweep)
    /// - `SWEEP_INTERVAL` - Background sweep frequency in seconds (default: 0, disabled)
    /// - `KEY_PREFIX` - Store namespace prefix (default: pcache)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            store_endpoint: env::var("STORE_ENDPOINT").unwrap_or(defaults.store_endpoint),
            max_cache_size: parse_var("MAX_CACHE_SIZE").unwrap_or(defaults.max_cache_size),
            eviction_probability: parse_var("EVICTION_PROBABILITY")
                .unwrap_or(defaults.eviction_probability),
            sweep_sample_size: parse_var("SWEEP_SAMPLE_SIZE"),
            sweep_interval: parse_var("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            key_prefix: env::var("KEY_PREFIX").unwrap_or(defaults.key_prefix),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    // == Validate ==
    /// Checks the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.eviction_probability) {
            return Err(CacheError::ConfigInvalid(format!(
                "eviction_probability must be within [0, 1], got {}",
                self.eviction_probability
            )));
        }
        if self.max_cache_size == 0 {
            return Err(CacheError::ConfigInvalid(
                "max_cache_size must be positive".to_string(),
            ));
        }
        if self.sweep_sample_size == Some(0) {
            return Err(CacheError::ConfigInvalid(
                "sweep_sample_size must be positive when set".to_string(),
            ));
        }
        if self.key_prefix.is_empty() {
            return Err(CacheError::ConfigInvalid(
                "key_prefix cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_endpoint: "memory://".to_string(),
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            eviction_probability: DEFAULT_EVICTION_PROBABILITY,
            sweep_sample_size: None,
            sweep_interval: 0,
            key_prefix: "pcache".to_string(),
            server_port: 3000,
        }
    }
}
