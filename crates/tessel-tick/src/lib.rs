//! Fixed-timestep execution for tessel worlds.
//!
//! # Tick Execution Model
//!
//! ```text
//! Tick N:
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Phase 1: Run every update system in registration order     │
//! │  Phase 2: Run every draw system in registration order       │
//! │  Phase 3: Refresh the world (message queues emptied)        │
//! │  Phase 4: Sleep out the rest of the tick budget             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages sent during phase 1 are visible to every later update system
//! and every draw system of the same tick, and to nothing after it.

mod config;
mod runner;
mod schedule;

pub use config::{MAX_TICKS_VAR, TICK_RATE_VAR, TickConfig, TickError, TickResult};
pub use runner::TickLoop;
pub use schedule::Schedule;
