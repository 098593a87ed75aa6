//! Random Draw Sources
//!
//! Eviction decisions consume one uniform draw per key. The source is a
//! trait object so tests can script the sequence.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// == Draw Source ==
/// Supplies uniform draws in `[0, 1)`.
pub trait DrawSource: Send + Sync {
    fn next_draw(&self) -> f64;
}

// == Thread Draws ==
/// Draws from the thread-local generator. Default for production engines.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDraws;

impl DrawSource for ThreadDraws {
    fn next_draw(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

// == Seeded Draws ==
/// Reproducible draws from a seeded generator.
#[derive(Debug)]
pub struct SeededDraws {
    rng: Mutex<StdRng>,
}

impl SeededDraws {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl DrawSource for SeededDraws {
    fn next_draw(&self) -> f64 {
        // A poisoned generator is still a valid generator
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.random::<f64>()
    }
}

// == Scripted Draws ==
/// Replays a fixed sequence of draws, wrapping around at the end.
///
/// An empty script always yields `0.0`.
#[derive(Debug)]
pub struct ScriptedDraws {
    draws: Vec<f64>,
    cursor: AtomicUsize,
}

impl ScriptedDraws {
    pub fn new(draws: Vec<f64>) -> Self {
        Self {
            draws,
            cursor: AtomicUsize::new(0),
        }
    }

    /// A script that repeats `draw` forever.
    pub fn constant(draw: f64) -> Self {
        Self::new(vec![draw])
    }

    /// Number of draws handed out so far.
    pub fn consumed(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

impl DrawSource for ScriptedDraws {
    fn next_draw(&self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.draws[idx % self.draws.len()]
    }
}
