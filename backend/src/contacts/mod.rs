//! Contact engine
//!
//! Number of new infectious contacts per region and age group, from inside
//! the region (mixing matrix) and from other regions (commute graph).
//! Results are dense `[region][age]` vectors in layout order.

pub mod distribute;
pub mod external;
pub mod internal;

pub use distribute::distribute_over_ages;
pub use external::{external_contacts_aggregate, external_contacts_by_age, incoming_contacts_by_region};
pub use internal::{internal_contacts, internal_contacts_all, sample_contacts_from_sources};

use crate::models::{IssueLog, NetworkState};
use crate::network::{ExternalContactMode, NetworkModel};
use crate::rng::{RngManager, SamplingError};

/// Contacts indexed `[region][age]`
pub type NetworkContacts = Vec<Vec<f64>>;

/// External contacts using the model's configured mode
pub fn external_contacts(
    model: &NetworkModel,
    state: &NetworkState,
    movement_multiplier: f64,
    stochastic: bool,
    rng: &mut RngManager,
    issues: &mut IssueLog,
) -> Result<NetworkContacts, SamplingError> {
    match model.external_mode() {
        ExternalContactMode::AgeStructured => external_contacts_by_age(
            model.graph(),
            state,
            model.age_mixing(),
            movement_multiplier,
            model.infectious(),
            stochastic,
            rng,
            issues,
        ),
        ExternalContactMode::Aggregate => external_contacts_aggregate(
            model.graph(),
            state,
            movement_multiplier,
            model.infectious(),
            stochastic,
            rng,
            issues,
        ),
    }
}

/// Element-wise sum of two contact tables
///
/// # Panics
///
/// Panics if the tables differ in shape
pub fn merge_contacts(mut left: NetworkContacts, right: &NetworkContacts) -> NetworkContacts {
    assert_eq!(left.len(), right.len(), "contact tables cover different regions");
    for (l, r) in left.iter_mut().zip(right) {
        assert_eq!(l.len(), r.len(), "contact tables cover different ages");
        for (a, b) in l.iter_mut().zip(r) {
            *a += b;
        }
    }
    left
}
