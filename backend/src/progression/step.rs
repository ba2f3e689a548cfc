//! One day of dynamics
//!
//! # Critical Invariants
//!
//! 1. **Conservation**: per (region, age) the compartment sum is unchanged
//!    (up to float rounding when deterministic, exactly when stochastic)
//! 2. **Non-negativity**: infections never exceed the susceptibles

use crate::contacts::NetworkContacts;
use crate::models::labels::SUSCEPTIBLE_IDX;
use crate::models::{Issue, IssueLog, NetworkState};
use crate::rng::{to_count, RngManager, SamplingError};

/// Excess of infections over susceptibles tolerated silently
const CLAMP_TOLERANCE: f64 = 1e-9;

/// New infections caused by `contacts` contacts landing on `susceptible` people
///
/// Contacts pick their targets at random, so some people are hit more than
/// once. The expected number of distinct people hit is
/// `S · (1 − (1 − 1/S)^c)`, or `min(c, S)` when fewer than one person is
/// susceptible. Each hit person is infected with `infection_probability`.
/// Stochastic runs draw `Binomial(S, p_hit · infection_probability)`.
///
/// # Example
/// ```
/// use network_sim_core_rs::{infections_from_contacts, RngManager};
///
/// let mut rng = RngManager::new(1);
/// let infected = infections_from_contacts(30.0, 20.0, 1.0, false, &mut rng).unwrap();
/// assert!((infected - 14.77153539229312).abs() < 1e-12);
/// ```
pub fn infections_from_contacts(
    susceptible: f64,
    contacts: f64,
    infection_probability: f64,
    stochastic: bool,
    rng: &mut RngManager,
) -> Result<f64, SamplingError> {
    if susceptible <= 0.0 || contacts <= 0.0 {
        return Ok(0.0);
    }

    if stochastic {
        let people = to_count(susceptible);
        if people == 0 {
            return Ok(0.0);
        }
        let n = people as f64;
        let p_hit = 1.0 - (1.0 - 1.0 / n).powf(contacts);
        return Ok(rng.binomial(people, p_hit * infection_probability)? as f64);
    }

    let hit = if susceptible < 1.0 {
        contacts.min(susceptible)
    } else {
        susceptible * (1.0 - (1.0 - 1.0 / susceptible).powf(contacts))
    };
    Ok(hit * infection_probability)
}

/// Next day's state
///
/// Non-`S` compartments come from `progression`; `S` is carried from
/// `current`. Then, per (region, age), the contacts turn into infections that
/// move from `S` to `E`. Infections exceeding the susceptibles are clamped,
/// with an issue when the excess is more than rounding noise.
///
/// # Panics
///
/// - `progression`, `contacts` and `current` disagree on regions or layout
/// - `progression` holds any susceptibles
#[allow(clippy::too_many_arguments)]
pub fn next_state(
    progression: &NetworkState,
    contacts: &NetworkContacts,
    current: &NetworkState,
    infection_probability: f64,
    stochastic: bool,
    rng: &mut RngManager,
    issues: &mut IssueLog,
) -> Result<NetworkState, SamplingError> {
    assert!(
        progression.same_layout(current),
        "progression and current state use different layouts"
    );
    let layout = current.layout();
    assert_eq!(
        contacts.len(),
        layout.num_regions(),
        "contacts cover {} regions, state has {}",
        contacts.len(),
        layout.num_regions()
    );

    let mut next = progression.clone();
    for (r, region_contacts) in contacts.iter().enumerate() {
        assert_eq!(
            region_contacts.len(),
            layout.num_ages(),
            "contacts for region {} cover {} ages, layout has {}",
            layout.regions()[r],
            region_contacts.len(),
            layout.num_ages()
        );

        let now = current.region(r);
        let out = next.region_mut(r);
        for (age, &age_contacts) in region_contacts.iter().enumerate() {
            assert!(
                out.susceptible(age) == 0.0,
                "progression must not contain susceptibles (region {}, age {})",
                layout.regions()[r],
                layout.ages()[age]
            );
            let susceptible = now.susceptible(age);
            out.set(age, SUSCEPTIBLE_IDX, susceptible);

            let mut infected =
                infections_from_contacts(susceptible, age_contacts, infection_probability, stochastic, rng)?;
            if infected > susceptible {
                if infected - susceptible > CLAMP_TOLERANCE {
                    issues.record(Issue::new(
                        format!(
                            "Infections exceed susceptibles in {} ({}): {:?} > {:?} - adjusting to susceptibles",
                            layout.regions()[r],
                            layout.ages()[age],
                            infected,
                            susceptible
                        ),
                        Issue::CLAMPED,
                    ));
                }
                infected = susceptible;
            }
            out.expose(age, infected);
        }
    }

    debug_assert!(next
        .regions()
        .iter()
        .all(|region| region.values().iter().all(|v| *v >= 0.0)));
    Ok(next)
}
