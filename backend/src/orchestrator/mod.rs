//! Orchestrator - trial loop, results and checkpoints
//!
//! See `engine.rs` for the day loop.

pub mod checkpoint;
pub mod engine;
pub mod results;

pub use engine::{run_trial, run_trials, DayResult, Simulation, SimulationError, TrialOutcome};

pub use checkpoint::{compute_model_hash, validate_snapshot, TrialSnapshot};
pub use results::{ResultRow, ResultTable};
