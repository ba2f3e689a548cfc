//! Model construction and validation
//!
//! Turns long-format input tables into a [`NetworkModel`]. Every fatal
//! configuration problem is reported as a [`ModelError`] before anything is
//! built; recoverable ones come back as [`Issue`]s next to the model.

use super::{ExternalContactMode, NetworkModel, SeedInfection};
use crate::models::labels::{SUSCEPTIBLE, SUSCEPTIBLE_IDX};
use crate::models::{
    AgeRange, CommuteGraph, Compartment, GraphError, Issue, IssueLog, LabelError, MixingError,
    MixingMatrix, Multiplier, NetworkState, ParameterSchedule, ProgressionRates, StateLayout,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Allowed deviation of a source's outgoing probabilities from 1
const TRANSITION_SUM_TOLERANCE: f64 = 1e-6;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Invalid {field} date '{value}', expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    #[error("End date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("Transition probabilities from {compartment} for age {age} sum to {total}, expected 1")]
    TransitionSum {
        age: String,
        compartment: String,
        total: f64,
    },

    #[error("Invalid transition rate {rate} for {from} -> {to} (age {age})")]
    InvalidTransitionRate {
        age: String,
        from: String,
        to: String,
        rate: f64,
    },

    #[error("Susceptible compartment cannot be a transition source (age {age})")]
    SusceptibleSource { age: String },

    #[error("Compartment {from} cannot transition into S (age {age})")]
    TransitionIntoSusceptible { age: String, from: String },

    #[error("Only E can transition into E, found {from} -> E (age {age})")]
    TransitionIntoExposed { age: String, from: String },

    #[error("Duplicate transition {from} -> {to} for age {age}")]
    DuplicateTransition { age: String, from: String, to: String },

    #[error("Compartment {compartment} has no outgoing transitions for age {age}")]
    MissingTransitions { age: String, compartment: String },

    #[error("Transition table has no exposed (E) compartment")]
    MissingExposed,

    #[error("Age groups of the {table} do not match the transition table: {details}")]
    AgeMismatch { table: &'static str, details: String },

    #[error("Unknown infectious compartment: {0}")]
    UnknownInfectiousCompartment(String),

    #[error("Infection probability {value} on {date} is outside [0, 1]")]
    InvalidInfectionProbability { date: String, value: f64 },

    #[error("Infection probability schedule does not cover start date {start} and has no default")]
    InfectionProbabilityNotCovered { start: NaiveDate },

    #[error("Invalid multipliers on {date}: movement={movement}, contact={contact}")]
    InvalidMultiplier {
        date: String,
        movement: f64,
        contact: f64,
    },

    #[error("Invalid population {count} for region {region}, age {age}")]
    InvalidPopulation {
        region: String,
        age: String,
        count: f64,
    },

    #[error("Invalid infection count {count} for region {region}, age {age}")]
    InvalidInfectionCount {
        region: String,
        age: String,
        count: f64,
    },

    #[error("Stochastic runs need whole numbers, got {count} for region {region}, age {age}")]
    NonIntegralCount {
        region: String,
        age: String,
        count: f64,
    },

    #[error("Number of trials must be positive")]
    ZeroTrials,

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Mixing(#[from] MixingError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// `(age, src, dst, rate)` row of the transition table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRow {
    pub age: String,
    pub src: String,
    pub dst: String,
    pub rate: f64,
}

/// `(region, age, count)` row of the population table
///
/// Rows repeating a (region, age) pair are summed, so tables split by sex
/// can be passed as they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRow {
    pub region: String,
    pub age: String,
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuteRow {
    pub source: String,
    pub target: String,
    pub weight: f64,
    pub delta_adjustment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixingEntry {
    pub source: String,
    pub target: String,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplierRow {
    pub date: String,
    pub movement: f64,
    pub contact: f64,
}

/// `(region, age, count)` row of the initial infections table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfectionRow {
    pub region: String,
    pub age: String,
    pub count: f64,
}

/// Everything needed to build a [`NetworkModel`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInputs {
    pub progression: Vec<TransitionRow>,
    pub population: Vec<PopulationRow>,
    pub commutes: Vec<CommuteRow>,
    pub mixing: Vec<MixingEntry>,
    pub infectious_compartments: Vec<String>,
    pub infection_probability: Vec<DatedValue>,
    #[serde(default)]
    pub infection_probability_default: Option<f64>,
    #[serde(default)]
    pub initial_infections: Vec<InfectionRow>,
    pub trials: u64,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub multipliers: Vec<MultiplierRow>,
    #[serde(default)]
    pub multiplier_default: Option<Multiplier>,
    #[serde(default)]
    pub stochastic: bool,
    #[serde(default)]
    pub external_contact_mode: ExternalContactMode,
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ModelError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| ModelError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

fn format_ages(ages: &BTreeSet<AgeRange>) -> String {
    ages.iter().map(AgeRange::as_str).collect::<Vec<_>>().join(", ")
}

fn check_ages(
    table: &'static str,
    expected: &BTreeSet<AgeRange>,
    found: &BTreeSet<AgeRange>,
) -> Result<(), ModelError> {
    if expected == found {
        return Ok(());
    }
    Err(ModelError::AgeMismatch {
        table,
        details: format!("expected [{}], found [{}]", format_ages(expected), format_ages(found)),
    })
}

fn is_whole(value: f64) -> bool {
    value.fract() == 0.0
}

/// Fails on the first fractional seeded count
pub(super) fn check_integral(model: &NetworkModel) -> Result<(), ModelError> {
    let layout = model.layout();
    for (r, a, c, value) in model.initial_state().cells() {
        if c == SUSCEPTIBLE_IDX && !is_whole(value) {
            return Err(ModelError::NonIntegralCount {
                region: layout.regions()[r].clone(),
                age: layout.ages()[a].to_string(),
                count: value,
            });
        }
    }
    for seed in model.initial_infections() {
        if !is_whole(seed.count) {
            return Err(ModelError::NonIntegralCount {
                region: layout.regions()[seed.region].clone(),
                age: layout.ages()[seed.age].to_string(),
                count: seed.count,
            });
        }
    }
    Ok(())
}

/// Validated transition rows keyed by (age, src, dst)
type TransitionTable = BTreeMap<(AgeRange, Compartment, Compartment), f64>;

fn read_transitions(rows: &[TransitionRow]) -> Result<TransitionTable, ModelError> {
    let mut table = TransitionTable::new();
    for row in rows {
        let age = AgeRange::new(&row.age);
        let src = Compartment::new(&row.src);
        let dst = Compartment::new(&row.dst);

        if src.is_susceptible() {
            return Err(ModelError::SusceptibleSource { age: age.to_string() });
        }
        if dst.is_susceptible() {
            return Err(ModelError::TransitionIntoSusceptible {
                age: age.to_string(),
                from: src.to_string(),
            });
        }
        if dst.is_exposed() && !src.is_exposed() {
            return Err(ModelError::TransitionIntoExposed {
                age: age.to_string(),
                from: src.to_string(),
            });
        }
        if !row.rate.is_finite() || !(0.0..=1.0).contains(&row.rate) {
            return Err(ModelError::InvalidTransitionRate {
                age: age.to_string(),
                from: src.to_string(),
                to: dst.to_string(),
                rate: row.rate,
            });
        }
        if table.insert((age.clone(), src.clone(), dst.clone()), row.rate).is_some() {
            return Err(ModelError::DuplicateTransition {
                age: age.to_string(),
                from: src.to_string(),
                to: dst.to_string(),
            });
        }
    }
    Ok(table)
}

impl NetworkModel {
    /// Validate inputs and build the model
    ///
    /// Returns the model together with the non-fatal issues found while
    /// building it.
    ///
    /// # Errors
    ///
    /// Any fatal configuration problem; no partial model is returned.
    pub fn build(inputs: &ModelInputs) -> Result<(NetworkModel, Vec<Issue>), ModelError> {
        if inputs.trials == 0 {
            return Err(ModelError::ZeroTrials);
        }

        let start_date = parse_date("start", &inputs.start_date)?;
        let end_date = parse_date("end", &inputs.end_date)?;
        if end_date < start_date {
            return Err(ModelError::EndBeforeStart {
                start: start_date,
                end: end_date,
            });
        }

        // Transition table and the label sets it implies
        let transitions = read_transitions(&inputs.progression)?;
        let ages: BTreeSet<AgeRange> = transitions.keys().map(|(age, _, _)| age.clone()).collect();
        let compartments: BTreeSet<Compartment> = transitions
            .keys()
            .flat_map(|(_, src, dst)| [src.clone(), dst.clone()])
            .collect();
        if !compartments.iter().any(Compartment::is_exposed) {
            return Err(ModelError::MissingExposed);
        }

        // Population
        let mut population: BTreeMap<(String, AgeRange), f64> = BTreeMap::new();
        for row in &inputs.population {
            let age = AgeRange::new(&row.age);
            if !row.count.is_finite() || row.count < 0.0 {
                return Err(ModelError::InvalidPopulation {
                    region: row.region.clone(),
                    age: age.to_string(),
                    count: row.count,
                });
            }
            *population.entry((row.region.clone(), age)).or_insert(0.0) += row.count;
        }
        let population_ages: BTreeSet<AgeRange> = population.keys().map(|(_, a)| a.clone()).collect();
        check_ages("population table", &ages, &population_ages)?;

        // Mixing
        let mixing = MixingMatrix::from_triples(
            inputs
                .mixing
                .iter()
                .map(|m| (m.source.as_str(), m.target.as_str(), m.rate)),
        )?;
        check_ages("mixing matrix rows", &ages, &mixing.row_ages())?;
        check_ages("mixing matrix columns", &ages, &mixing.column_ages())?;

        // Layout over every region named by the population or the commutes
        let populated: BTreeSet<String> = population.keys().map(|(r, _)| r.clone()).collect();
        let mut regions = populated.clone();
        for edge in &inputs.commutes {
            regions.insert(edge.source.clone());
            regions.insert(edge.target.clone());
        }
        let layout = Arc::new(StateLayout::new(regions, ages.iter().cloned(), compartments));

        // Progression, dense
        let mut progression = ProgressionRates::new(layout.num_ages(), layout.num_compartments());
        for ((age, src, dst), rate) in &transitions {
            let a = layout.age_index(age)?;
            let s = layout.compartment_index(src.as_str())?;
            let d = layout.compartment_index(dst.as_str())?;
            progression.insert(a, s, d, *rate);
        }
        for (a, age) in layout.ages().iter().enumerate() {
            for (c, compartment) in layout.compartments().iter().enumerate().skip(1) {
                if progression.outflows(a, c).is_empty() {
                    return Err(ModelError::MissingTransitions {
                        age: age.to_string(),
                        compartment: compartment.to_string(),
                    });
                }
                let total = progression.outflow_total(a, c);
                if (total - 1.0).abs() > TRANSITION_SUM_TOLERANCE {
                    return Err(ModelError::TransitionSum {
                        age: age.to_string(),
                        compartment: compartment.to_string(),
                        total,
                    });
                }
            }
        }
        let age_mixing = mixing.to_dense(&layout)?;

        // Infectious compartments
        let mut infectious = Vec::with_capacity(inputs.infectious_compartments.len());
        for name in &inputs.infectious_compartments {
            let idx = layout
                .compartment_index(name)
                .map_err(|_| ModelError::UnknownInfectiousCompartment(name.clone()))?;
            infectious.push(idx);
        }
        infectious.sort_unstable();
        infectious.dedup();

        // Graph
        let mut graph = CommuteGraph::new(&layout);
        for edge in &inputs.commutes {
            graph.add_edge(&edge.source, &edge.target, edge.weight, edge.delta_adjustment)?;
        }

        // Schedules
        let mut probabilities = Vec::with_capacity(inputs.infection_probability.len());
        for entry in &inputs.infection_probability {
            let date = parse_date("infection probability", &entry.date)?;
            if !(0.0..=1.0).contains(&entry.value) {
                return Err(ModelError::InvalidInfectionProbability {
                    date: entry.date.clone(),
                    value: entry.value,
                });
            }
            probabilities.push((date, entry.value));
        }
        if let Some(default) = inputs.infection_probability_default {
            if !(0.0..=1.0).contains(&default) {
                return Err(ModelError::InvalidInfectionProbability {
                    date: "default".to_string(),
                    value: default,
                });
            }
        }
        let infection_probability = ParameterSchedule::new(probabilities);
        if infection_probability.value_at(start_date).is_none()
            && inputs.infection_probability_default.is_none()
        {
            return Err(ModelError::InfectionProbabilityNotCovered { start: start_date });
        }

        let mut multipliers = Vec::with_capacity(inputs.multipliers.len());
        for row in &inputs.multipliers {
            let date = parse_date("multiplier", &row.date)?;
            let multiplier = Multiplier {
                movement: row.movement,
                contact: row.contact,
            };
            if !multiplier.is_valid() {
                return Err(ModelError::InvalidMultiplier {
                    date: row.date.clone(),
                    movement: row.movement,
                    contact: row.contact,
                });
            }
            multipliers.push((date, multiplier));
        }
        let multiplier_default = inputs.multiplier_default.unwrap_or(Multiplier::UNRESTRICTED);
        if !multiplier_default.is_valid() {
            return Err(ModelError::InvalidMultiplier {
                date: "default".to_string(),
                movement: multiplier_default.movement,
                contact: multiplier_default.contact,
            });
        }

        // Seeded population: everybody starts susceptible
        let mut initial_state = NetworkState::zeros(Arc::clone(&layout));
        for ((region, age), count) in &population {
            initial_state.set(region, age, SUSCEPTIBLE, *count)?;
        }

        let mut initial_infections = Vec::with_capacity(inputs.initial_infections.len());
        for row in &inputs.initial_infections {
            let age = AgeRange::new(&row.age);
            if !row.count.is_finite() || row.count < 0.0 {
                return Err(ModelError::InvalidInfectionCount {
                    region: row.region.clone(),
                    age: age.to_string(),
                    count: row.count,
                });
            }
            initial_infections.push(SeedInfection {
                region: layout.region_index(&row.region)?,
                age: layout.age_index(&age)?,
                count: row.count,
            });
        }

        let model = NetworkModel {
            layout: Arc::clone(&layout),
            graph,
            progression,
            mixing,
            age_mixing,
            infectious,
            infection_probability,
            infection_probability_default: inputs.infection_probability_default,
            multipliers: ParameterSchedule::new(multipliers),
            multiplier_default,
            initial_state,
            initial_infections,
            trials: inputs.trials,
            start_date,
            end_date,
            stochastic: false,
            external_mode: inputs.external_contact_mode,
        }
        .with_stochastic(inputs.stochastic)?;

        // Recoverable findings
        let mut issues = IssueLog::new();
        for region in layout.regions() {
            if !populated.contains(region) {
                issues.record(Issue::new(
                    format!(
                        "Region {} is not in the population table, assuming population of 0 for all ages",
                        region
                    ),
                    Issue::MODEL,
                ));
            }
        }
        let isolated = model.graph.isolated_regions();
        if !isolated.is_empty() {
            issues.record(Issue::new(
                format!(
                    "These regions have no contacts in the current network: {}",
                    isolated.join(", ")
                ),
                Issue::MODEL,
            ));
        }

        debug!(
            compartments = layout.num_compartments(),
            edges = model.graph.edge_count(),
            "transition table and graph validated"
        );
        info!(
            regions = layout.num_regions(),
            ages = layout.num_ages(),
            start = %start_date,
            end = %end_date,
            trials = inputs.trials,
            issues = issues.len(),
            "network model built"
        );

        Ok((model, issues.into_vec()))
    }
}
