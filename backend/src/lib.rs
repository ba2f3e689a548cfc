//! Network Simulator Core - Rust Engine
//!
//! Age-structured compartmental epidemic simulation over a network of
//! regions connected by commuting flows, deterministic or stochastic.
//!
//! # Architecture
//!
//! - **core**: Day clock
//! - **models**: Domain types (labels, mixing matrix, commute graph, state, schedules, issues)
//! - **network**: Validated model construction from input tables
//! - **contacts**: Internal and external contact engine
//! - **progression**: Compartment transitions and the daily step function
//! - **seeding**: Initial infections
//! - **orchestrator**: Trial loop, result tables, checkpoints
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Per-region population is conserved every day
//! 2. All randomness is deterministic (one seeded generator per trial)
//! 3. A built model is immutable and shared read-only by all trials

// Module declarations
pub mod contacts;
pub mod core;
pub mod models;
pub mod network;
pub mod orchestrator;
pub mod progression;
pub mod rng;
pub mod seeding;

// Re-exports for convenience
pub use contacts::{distribute_over_ages, external_contacts, internal_contacts, merge_contacts, NetworkContacts};
pub use core::time::DayClock;
pub use models::{
    AgeMixing, AgeRange, CommuteGraph, Compartment, EdgeWeights, GraphError, Issue, IssueLog, LabelError,
    MixingError, MixingMatrix, Multiplier, NetworkState, ParameterSchedule, ProgressionRates, RegionState,
    StateLayout,
};
pub use network::{ExternalContactMode, ModelError, ModelInputs, NetworkModel, SeedInfection};
pub use orchestrator::{
    run_trial, run_trials, DayResult, ResultRow, ResultTable, Simulation, SimulationError, TrialOutcome,
    TrialSnapshot,
};
pub use progression::{infections_from_contacts, internal_progression, next_state};
pub use rng::{RngManager, SamplingError};
pub use seeding::{apply_initial_infections, randomly_infect_regions, SeedingError};
