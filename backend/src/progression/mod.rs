//! Transition engine and step function
//!
//! [`internal_progression`] moves people between non-susceptible
//! compartments; [`next_state`] combines that with the day's new infections.

mod step;

pub use step::{infections_from_contacts, next_state};

use crate::models::labels::SUSCEPTIBLE_IDX;
use crate::models::{NetworkState, ProgressionRates};
use crate::rng::{to_count, RngManager, SamplingError};

/// Where everybody outside `S` ends up after one day of progression
///
/// Returns a new state holding only the progressed compartments; the `S`
/// column is zero. Deterministic runs split each count by probability;
/// stochastic runs draw a multinomial that sums exactly to the count.
/// The input is not modified.
pub fn internal_progression(
    state: &NetworkState,
    rates: &ProgressionRates,
    stochastic: bool,
    rng: &mut RngManager,
) -> Result<NetworkState, SamplingError> {
    let layout = state.layout();
    let mut delta = NetworkState::zeros(std::sync::Arc::clone(layout));
    let mut probabilities = Vec::new();

    for (r, region) in state.regions().iter().enumerate() {
        let out = delta.region_mut(r);
        for age in 0..layout.num_ages() {
            for src in 0..layout.num_compartments() {
                if src == SUSCEPTIBLE_IDX {
                    continue;
                }
                let count = region.get(age, src);
                if count == 0.0 {
                    continue;
                }
                let outflows = rates.outflows(age, src);
                if stochastic {
                    probabilities.clear();
                    probabilities.extend(outflows.iter().map(|(_, p)| *p));
                    let split = rng.multinomial(to_count(count), &probabilities)?;
                    for ((dst, _), moved) in outflows.iter().zip(split) {
                        out.add(age, *dst, moved as f64);
                    }
                } else {
                    for (dst, p) in outflows {
                        out.add(age, *dst, count * p);
                    }
                }
            }
        }
    }
    Ok(delta)
}
