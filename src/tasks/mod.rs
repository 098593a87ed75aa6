//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Sweep: Re-checks capacity and runs an eviction sweep when over it

mod sweeper;

pub use sweeper::spawn_sweep_task;
