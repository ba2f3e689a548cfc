//! Domain models for the network simulator

pub mod graph;
pub mod issue;
pub mod labels;
pub mod mixing;
pub mod progression;
pub mod schedule;
pub mod state;

// Re-exports
pub use graph::{CommuteGraph, EdgeWeights, GraphError};
pub use issue::{Issue, IssueLog};
pub use labels::{AgeRange, Compartment, LabelError, StateLayout};
pub use mixing::{AgeMixing, MixingError, MixingMatrix, MixingRow};
pub use progression::ProgressionRates;
pub use schedule::{Multiplier, ParameterSchedule};
pub use state::{NetworkState, RegionState};
