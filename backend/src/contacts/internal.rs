//! Contacts within a region
//!
//! For susceptible age `a`:
//!
//! ```text
//! expected_a = (S_a / N_a) · Σ_b mixing[a][b] · infectious_b · contact_multiplier
//! ```
//!
//! Stochastic runs draw, per infectious age `b`, a Poisson number of contacts
//! with mean `mixing[a][b] · infectious_b · contact_multiplier`, then keep each
//! contact with probability `S_a / N_a` (the chance it lands on a
//! susceptible). The result has the same mean as the deterministic figure.

use super::NetworkContacts;
use crate::models::{AgeMixing, NetworkState, RegionState};
use crate::rng::{RngManager, SamplingError};

/// Susceptible share of one age group, 0 for an empty group
pub(crate) fn susceptible_fraction(region: &RegionState, age: usize) -> f64 {
    let total = region.age_total(age);
    if total > 0.0 {
        region.susceptible(age) / total
    } else {
        0.0
    }
}

/// Sample contacts reaching susceptibles of one age
///
/// `rates[b]` and `infectious[b]` describe each infectious age group.
///
/// # Panics
///
/// Panics if `rates` and `infectious` differ in length
pub fn sample_contacts_from_sources(
    rates: &[f64],
    infectious: &[f64],
    contact_multiplier: f64,
    susceptible_fraction: f64,
    rng: &mut RngManager,
) -> Result<u64, SamplingError> {
    assert_eq!(
        rates.len(),
        infectious.len(),
        "contact rates and infectious counts must have the same length"
    );

    let mut contacts = 0;
    for (rate, count) in rates.iter().zip(infectious) {
        let produced = rng.poisson(rate * count * contact_multiplier)?;
        contacts += rng.binomial(produced, susceptible_fraction)?;
    }
    Ok(contacts)
}

/// Infectious contacts per age group inside one region
pub fn internal_contacts(
    region: &RegionState,
    mixing: &AgeMixing,
    contact_multiplier: f64,
    infectious: &[usize],
    stochastic: bool,
    rng: &mut RngManager,
) -> Result<Vec<f64>, SamplingError> {
    let num_ages = region.num_ages();
    let infectious_by_age: Vec<f64> = (0..num_ages)
        .map(|age| region.infectious(age, infectious))
        .collect();

    let mut contacts = Vec::with_capacity(num_ages);
    for age in 0..num_ages {
        let fraction = susceptible_fraction(region, age);
        let value = if stochastic {
            sample_contacts_from_sources(
                mixing.row(age),
                &infectious_by_age,
                contact_multiplier,
                fraction,
                rng,
            )? as f64
        } else {
            let raw: f64 = mixing
                .row(age)
                .iter()
                .zip(&infectious_by_age)
                .map(|(rate, count)| rate * count)
                .sum();
            fraction * raw * contact_multiplier
        };
        contacts.push(value);
    }
    Ok(contacts)
}

/// [`internal_contacts`] for every region, in layout order
pub fn internal_contacts_all(
    state: &NetworkState,
    mixing: &AgeMixing,
    contact_multiplier: f64,
    infectious: &[usize],
    stochastic: bool,
    rng: &mut RngManager,
) -> Result<NetworkContacts, SamplingError> {
    state
        .regions()
        .iter()
        .map(|region| internal_contacts(region, mixing, contact_multiplier, infectious, stochastic, rng))
        .collect()
}
