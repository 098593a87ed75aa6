//! Cache Module
//!
//! Access counting, probabilistic eviction, and the engine tying them to a
//! backing store.

mod engine;
mod policy;
mod random;
mod stats;
mod sweep;
mod tracker;


// Re-export public types
pub use engine::CacheEngine;
pub use policy::{eviction_probability, should_evict, EvictionPolicy};
pub use random::{DrawSource, ScriptedDraws, SeededDraws, ThreadDraws};
pub use stats::{CacheStats, StatsRecorder};
pub use sweep::{reservoir_sample, SweepFailure, SweepReport};
pub use tracker::AccessTracker;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
