//! Initial infections
//!
//! Seeds are resolved to layout indices when the model is built; here they
//! are applied to a state, or drawn at random for scenario sweeps.

use crate::models::{AgeRange, Issue, IssueLog, LabelError, NetworkState};
use crate::network::{NetworkModel, SeedInfection};
use crate::rng::{RngManager, SamplingError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum SeedingError {
    #[error("cannot seed {requested} regions, the network has {available}")]
    TooManyRegions { requested: usize, available: usize },

    #[error("invalid seed count {0}")]
    InvalidCount(f64),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),
}

/// Move seeded people from `S` to `E`
///
/// A seed larger than the susceptibles left in its cell is clamped and
/// recorded as an issue.
pub fn apply_initial_infections(state: &mut NetworkState, seeds: &[SeedInfection], issues: &mut IssueLog) {
    for seed in seeds {
        let region_name = state.layout().regions()[seed.region].clone();
        let age_name = state.layout().ages()[seed.age].clone();
        let region = state.region_mut(seed.region);
        let available = region.susceptible(seed.age);

        let count = if seed.count > available {
            issues.record(Issue::new(
                format!(
                    "Initial infections exceed susceptibles in {} ({}): {:?} > {:?} - adjusting to susceptibles",
                    region_name, age_name, seed.count, available
                ),
                Issue::CLAMPED,
            ));
            available
        } else {
            seed.count
        };
        region.expose(seed.age, count);
        debug!(region = %region_name, age = %age_name, count, "seeded infection");
    }
}

/// Pick `k` distinct regions uniformly and seed `count` in each of `ages`
pub fn randomly_infect_regions(
    model: &NetworkModel,
    k: usize,
    ages: &[AgeRange],
    count: f64,
    rng: &mut RngManager,
) -> Result<Vec<SeedInfection>, SeedingError> {
    let layout = model.layout();
    if k > layout.num_regions() {
        return Err(SeedingError::TooManyRegions {
            requested: k,
            available: layout.num_regions(),
        });
    }
    if !count.is_finite() || count < 0.0 {
        return Err(SeedingError::InvalidCount(count));
    }

    let ages = ages
        .iter()
        .map(|age| layout.age_index(age))
        .collect::<Result<Vec<_>, _>>()?;

    let regions = rng.sample_distinct(layout.num_regions(), k)?;
    Ok(regions
        .into_iter()
        .flat_map(|region| ages.iter().map(move |&age| SeedInfection { region, age, count }))
        .collect())
}
