//! Contacts between regions along the commute graph
//!
//! Two modes, picked per model:
//!
//! - [`external_contacts_by_age`]: for target region `v`, age `a` and each
//!   incoming edge `u → v` (self-loops skipped),
//!   `w'_uv · Σ_b mixing[a][b] · I_u_b / N_u_b`, summed over edges and scaled
//!   by `S_v_a / N_v_a`.
//! - [`external_contacts_aggregate`]: the same with whole-region totals and no
//!   mixing matrix, then split over ages by susceptibles.
//!
//! Stochastic runs sum the expected value first and draw once per
//! (region, age), or once per region in aggregate mode. A count that would
//! exceed the susceptibles is clamped and recorded as an issue.

use super::distribute::distribute_over_ages;
use super::internal::susceptible_fraction;
use super::NetworkContacts;
use crate::models::{AgeMixing, CommuteGraph, Issue, IssueLog, NetworkState, RegionState};
use crate::rng::{RngManager, SamplingError};
use tracing::trace;

fn infectious_fraction(region: &RegionState, age: usize, infectious: &[usize]) -> f64 {
    let total = region.age_total(age);
    if total > 0.0 {
        region.infectious(age, infectious) / total
    } else {
        0.0
    }
}

/// Clamp `contacts` to `susceptibles`, recording the adjustment
fn cap_at_susceptibles(contacts: f64, susceptibles: f64, stochastic: bool, issues: &mut IssueLog) -> f64 {
    if contacts <= susceptibles {
        return contacts;
    }
    let shown = if stochastic {
        format!("{}", contacts as u64)
    } else {
        format!("{:?}", contacts)
    };
    issues.record(Issue::new(
        format!(
            "totalSus < incoming contacts ({:?} < {}) - adjusting to totalSus",
            susceptibles, shown
        ),
        Issue::CLAMPED,
    ));
    susceptibles
}

/// Age-structured contacts into every region
#[allow(clippy::too_many_arguments)]
pub fn external_contacts_by_age(
    graph: &CommuteGraph,
    state: &NetworkState,
    mixing: &AgeMixing,
    movement_multiplier: f64,
    infectious: &[usize],
    stochastic: bool,
    rng: &mut RngManager,
    issues: &mut IssueLog,
) -> Result<NetworkContacts, SamplingError> {
    let num_ages = state.layout().num_ages();

    // I_u_b / N_u_b for every region, computed once
    let fractions: Vec<Vec<f64>> = state
        .regions()
        .iter()
        .map(|region| {
            (0..num_ages)
                .map(|age| infectious_fraction(region, age, infectious))
                .collect()
        })
        .collect();

    let mut contacts = Vec::with_capacity(state.regions().len());
    for (target, region) in state.regions().iter().enumerate() {
        let mut by_age = vec![0.0; num_ages];
        for (age, slot) in by_age.iter_mut().enumerate() {
            let mut incoming = 0.0;
            for (source, edge) in graph.incoming(target) {
                if source == target {
                    continue;
                }
                let mixed: f64 = mixing
                    .row(age)
                    .iter()
                    .zip(&fractions[source])
                    .map(|(rate, fraction)| rate * fraction)
                    .sum();
                incoming += edge.effective_weight(movement_multiplier) * mixed;
            }

            let expected = incoming * susceptible_fraction(region, age);
            let drawn = if stochastic {
                rng.poisson(expected)? as f64
            } else {
                expected
            };
            *slot = cap_at_susceptibles(drawn, region.susceptible(age), stochastic, issues);
        }
        trace!(region = target, contacts = ?by_age, "external contacts");
        contacts.push(by_age);
    }
    Ok(contacts)
}

/// Expected whole-region contacts into every region, before capping
///
/// `Σ_u w'_uv · I_u / N_u`, scaled by `S_v / N_v`.
pub fn incoming_contacts_by_region(
    graph: &CommuteGraph,
    state: &NetworkState,
    movement_multiplier: f64,
    infectious: &[usize],
) -> Vec<f64> {
    let fractions: Vec<f64> = state
        .regions()
        .iter()
        .map(|region| {
            let total = region.total();
            if total > 0.0 {
                region.infectious_total(infectious) / total
            } else {
                0.0
            }
        })
        .collect();

    state
        .regions()
        .iter()
        .enumerate()
        .map(|(target, region)| {
            let mut incoming = 0.0;
            for (source, edge) in graph.incoming(target) {
                if source != target {
                    incoming += edge.effective_weight(movement_multiplier) * fractions[source];
                }
            }
            let total = region.total();
            let fraction = if total > 0.0 {
                region.susceptible_total() / total
            } else {
                0.0
            };
            incoming * fraction
        })
        .collect()
}

/// Whole-region contacts into every region, split over ages
pub fn external_contacts_aggregate(
    graph: &CommuteGraph,
    state: &NetworkState,
    movement_multiplier: f64,
    infectious: &[usize],
    stochastic: bool,
    rng: &mut RngManager,
    issues: &mut IssueLog,
) -> Result<NetworkContacts, SamplingError> {
    let expected = incoming_contacts_by_region(graph, state, movement_multiplier, infectious);

    let mut contacts = Vec::with_capacity(expected.len());
    for (target, (region, expected)) in state.regions().iter().zip(expected).enumerate() {
        let drawn = if stochastic {
            rng.poisson(expected)? as f64
        } else {
            expected
        };
        let capped = cap_at_susceptibles(drawn, region.susceptible_total(), stochastic, issues);
        trace!(region = target, contacts = capped, "external contacts (aggregate)");
        contacts.push(distribute_over_ages(region, capped, stochastic, rng)?);
    }
    Ok(contacts)
}
