//! Network model
//!
//! The immutable bundle a trial runs against: layout, commute graph,
//! transition probabilities, mixing, schedules, seeded population and
//! run settings. Built once from [`ModelInputs`] by [`NetworkModel::build`]
//! and shared read-only by every trial.

mod builder;

pub use builder::{
    CommuteRow, DatedValue, InfectionRow, MixingEntry, ModelError, ModelInputs, MultiplierRow,
    PopulationRow, TransitionRow,
};

use crate::models::{
    AgeMixing, CommuteGraph, MixingMatrix, Multiplier, NetworkState, ParameterSchedule,
    ProgressionRates, StateLayout,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;

/// How contacts between regions are computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalContactMode {
    /// Per (region, age), weighted by the mixing matrix
    #[default]
    AgeStructured,
    /// Per region from whole-region totals, then split over ages
    Aggregate,
}

/// One resolved initial infection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeedInfection {
    pub region: usize,
    pub age: usize,
    pub count: f64,
}

fn serialize_layout<S: Serializer>(layout: &Arc<StateLayout>, serializer: S) -> Result<S::Ok, S::Error> {
    layout.as_ref().serialize(serializer)
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkModel {
    #[serde(serialize_with = "serialize_layout")]
    layout: Arc<StateLayout>,
    graph: CommuteGraph,
    progression: ProgressionRates,
    mixing: MixingMatrix,
    #[serde(skip)]
    age_mixing: AgeMixing,
    /// Compartment indices counted as infectious, ascending
    infectious: Vec<usize>,
    infection_probability: ParameterSchedule<f64>,
    infection_probability_default: Option<f64>,
    multipliers: ParameterSchedule<Multiplier>,
    multiplier_default: Multiplier,
    initial_state: NetworkState,
    initial_infections: Vec<SeedInfection>,
    trials: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    stochastic: bool,
    external_mode: ExternalContactMode,
}

impl NetworkModel {
    pub fn layout(&self) -> &Arc<StateLayout> {
        &self.layout
    }

    pub fn graph(&self) -> &CommuteGraph {
        &self.graph
    }

    pub fn progression(&self) -> &ProgressionRates {
        &self.progression
    }

    pub fn mixing(&self) -> &MixingMatrix {
        &self.mixing
    }

    /// Dense mixing rates in layout age order
    pub fn age_mixing(&self) -> &AgeMixing {
        &self.age_mixing
    }

    pub fn infectious(&self) -> &[usize] {
        &self.infectious
    }

    /// Population before any infection is seeded
    pub fn initial_state(&self) -> &NetworkState {
        &self.initial_state
    }

    pub fn initial_infections(&self) -> &[SeedInfection] {
        &self.initial_infections
    }

    pub fn trials(&self) -> u64 {
        self.trials
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn stochastic(&self) -> bool {
        self.stochastic
    }

    pub fn external_mode(&self) -> ExternalContactMode {
        self.external_mode
    }

    /// Same model, other external contact mode
    pub fn with_external_mode(mut self, mode: ExternalContactMode) -> Self {
        self.external_mode = mode;
        self
    }

    /// Same model, other sampling mode
    ///
    /// Switching to stochastic re-checks that all seeded counts are whole
    /// numbers.
    pub fn with_stochastic(mut self, stochastic: bool) -> Result<Self, ModelError> {
        if stochastic {
            builder::check_integral(&self)?;
        }
        self.stochastic = stochastic;
        Ok(self)
    }

    /// Multipliers in force on `date`
    pub fn multiplier_on(&self, date: NaiveDate) -> Multiplier {
        self.multipliers.resolve(date, self.multiplier_default)
    }

    /// Infection probability in force on `date`
    ///
    /// Construction guarantees coverage from the start date on.
    pub fn infection_probability_on(&self, date: NaiveDate) -> f64 {
        self.infection_probability
            .value_at(date)
            .copied()
            .or(self.infection_probability_default)
            .unwrap_or(0.0)
    }
}
