//! Probabilistic Cache - A key-value cache layer with frequency-aware eviction
//!
//! Every get and set bumps a per-key access counter in the backing store.
//! When a write leaves the cache over capacity, each key is evicted with a
//! probability that grows with its access count.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheEngine;
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_sweep_task;
