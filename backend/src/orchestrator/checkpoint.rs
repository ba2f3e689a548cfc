//! Checkpoint - Save/Load Trial State
//!
//! Enables serialization and deserialization of an in-flight trial for
//! pause/resume.
//!
//! # Critical Invariants
//!
//! - **Determinism**: a restored trial continues with exactly the rows an
//!   uninterrupted trial would have produced
//! - **Population Conservation**: region totals match the model's
//! - **Model Matching**: a snapshot can only be loaded into the model that
//!   produced it

use crate::models::{Issue, RegionState};
use crate::network::NetworkModel;
use crate::orchestrator::SimulationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Relative tolerance for the population check on deterministic snapshots
const POPULATION_TOLERANCE: f64 = 1e-6;

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Everything needed to resume a trial from the end of a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSnapshot {
    /// Date the state belongs to
    pub date: NaiveDate,

    /// Days since the start date
    pub day: usize,

    /// Generator state at the time of the snapshot
    pub rng_state: u64,

    /// Per-region state, in layout order
    pub regions: Vec<RegionState>,

    /// Issues recorded so far
    pub issues: Vec<Issue>,

    /// SHA256 of the model (see [`compute_model_hash`])
    pub model_hash: String,
}

impl TrialSnapshot {
    pub fn to_json(&self) -> Result<String, SimulationError> {
        serde_json::to_string(self)
            .map_err(|e| SimulationError::SerializationError(format!("Snapshot serialization failed: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json)
            .map_err(|e| SimulationError::SerializationError(format!("Snapshot deserialization failed: {}", e)))
    }
}

// ============================================================================
// Hashing
// ============================================================================

/// Canonical SHA256 of any serializable value
///
/// Object keys are sorted recursively before hashing, so the digest does not
/// depend on field or map order.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(value)
        .map_err(|e| SimulationError::SerializationError(format!("Model serialization failed: {}", e)))?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> = map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value))
        .map_err(|e| SimulationError::SerializationError(format!("Model serialization failed: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprint of a model, stored in every snapshot
pub fn compute_model_hash(model: &NetworkModel) -> Result<String, SimulationError> {
    compute_hash(model)
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Check that `snapshot` can be resumed against `model`
pub fn validate_snapshot(snapshot: &TrialSnapshot, model: &NetworkModel) -> Result<(), SimulationError> {
    // 1. Same model
    let expected = compute_model_hash(model)?;
    if snapshot.model_hash != expected {
        return Err(SimulationError::ModelMismatch {
            expected,
            actual: snapshot.model_hash.clone(),
        });
    }

    // 2. Date consistent with the run
    let date = model
        .start_date()
        .checked_add_days(chrono::Days::new(snapshot.day as u64));
    if date != Some(snapshot.date) || snapshot.date > model.end_date() {
        return Err(SimulationError::StateValidationError(format!(
            "Snapshot date {} does not match day {} of a run from {} to {}",
            snapshot.date,
            snapshot.day,
            model.start_date(),
            model.end_date()
        )));
    }

    // 3. Dimensions
    let layout = model.layout();
    if snapshot.regions.len() != layout.num_regions() {
        return Err(SimulationError::StateValidationError(format!(
            "Snapshot has {} regions, model has {}",
            snapshot.regions.len(),
            layout.num_regions()
        )));
    }
    for (name, region) in layout.regions().iter().zip(&snapshot.regions) {
        if region.num_compartments() != layout.num_compartments() || region.values().len() != layout.region_width() {
            return Err(SimulationError::StateValidationError(format!(
                "Region {} has {} cells over {} compartments, model has {} over {}",
                name,
                region.values().len(),
                region.num_compartments(),
                layout.region_width(),
                layout.num_compartments()
            )));
        }
        if region.values().iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(SimulationError::StateValidationError(format!(
                "Region {} holds a negative or non-finite count",
                name
            )));
        }
    }

    // 4. Population conservation
    for ((name, region), expected) in layout
        .regions()
        .iter()
        .zip(&snapshot.regions)
        .zip(model.initial_state().region_totals())
    {
        let total = region.total();
        if (total - expected).abs() > POPULATION_TOLERANCE * expected.max(1.0) {
            return Err(SimulationError::StateValidationError(format!(
                "Population of region {} changed: expected {}, got {}",
                name, expected, total
            )));
        }
    }

    Ok(())
}
