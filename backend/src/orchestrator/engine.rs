//! Simulation Engine
//!
//! Runs one trial day by day against a shared, immutable [`NetworkModel`].
//!
//! # Architecture
//!
//! ```text
//! Before day 0: seed initial infections, record the start date
//!
//! For each day d (start < d <= end):
//! 1. Advance to d, resolve its multipliers and infection probability
//! 2. External contacts (movement multiplier)
//! 3. Internal contacts (contact multiplier)
//! 4. Progression of everyone outside S
//! 5. Next state: contacts -> infections, S -> E
//! 6. Record the rows of d
//! ```
//!
//! One [`RngManager`] is threaded through the whole trial, so a trial is a
//! pure function of (model, seeds, generator seed).

use crate::contacts::{external_contacts, internal_contacts_all, merge_contacts};
use crate::core::time::DayClock;
use crate::models::{Issue, IssueLog, NetworkState};
use crate::network::{NetworkModel, SeedInfection};
use crate::orchestrator::checkpoint::{compute_model_hash, validate_snapshot, TrialSnapshot};
use crate::orchestrator::results::ResultTable;
use crate::progression::{internal_progression, next_state};
use crate::rng::{RngManager, SamplingError};
use crate::seeding::apply_initial_infections;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Result of a single simulated day
#[derive(Debug, Clone, PartialEq)]
pub struct DayResult {
    /// Date the new state belongs to
    pub date: NaiveDate,

    /// Days since the start date
    pub day: usize,

    /// People moved from S to E during the step
    pub new_infections: f64,

    /// Issues recorded during the step
    pub issues_recorded: usize,
}

/// Finished trial
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialOutcome {
    pub results: ResultTable,
    pub issues: Vec<Issue>,
}

/// Simulation error types
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Simulation already reached its end date {0}")]
    Finished(NaiveDate),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("State validation error: {0}")]
    StateValidationError(String),

    #[error("Snapshot belongs to another model: expected hash {expected}, got {actual}")]
    ModelMismatch { expected: String, actual: String },

    #[error(transparent)]
    Sampling(#[from] SamplingError),
}

/// One trial in progress
#[derive(Debug)]
pub struct Simulation<'m> {
    model: &'m NetworkModel,
    clock: DayClock,
    state: NetworkState,
    rng: RngManager,
    issues: IssueLog,
    results: ResultTable,
}

impl<'m> Simulation<'m> {
    /// Start a trial with the model's own initial infections
    pub fn new(model: &'m NetworkModel, seed: u64) -> Self {
        Self::with_seeds(model, model.initial_infections(), RngManager::new(seed))
    }

    /// Start a trial with explicit initial infections
    ///
    /// Seeds exceeding the susceptibles are clamped with an issue.
    pub fn with_seeds(model: &'m NetworkModel, seeds: &[SeedInfection], rng: RngManager) -> Self {
        let mut state = model.initial_state().clone();
        let mut issues = IssueLog::new();
        apply_initial_infections(&mut state, seeds, &mut issues);

        let clock = DayClock::new(model.start_date(), model.end_date());
        let mut results = ResultTable::new();
        results.record(clock.current_date(), &state);

        info!(
            start = %model.start_date(),
            end = %model.end_date(),
            regions = model.layout().num_regions(),
            seeds = seeds.len(),
            stochastic = model.stochastic(),
            "trial started"
        );

        Self {
            model,
            clock,
            state,
            rng,
            issues,
            results,
        }
    }

    /// Resume a trial from a snapshot
    ///
    /// The result table of the restored trial only holds rows dated after
    /// the snapshot.
    pub fn restore(model: &'m NetworkModel, snapshot: TrialSnapshot) -> Result<Self, SimulationError> {
        validate_snapshot(&snapshot, model)?;

        let clock = DayClock::at_day(model.start_date(), model.end_date(), snapshot.day);
        let state = NetworkState::from_regions(model.layout().clone(), snapshot.regions);
        let issues = IssueLog::from_recorded(snapshot.issues);

        info!(date = %snapshot.date, day = snapshot.day, "trial restored");

        Ok(Self {
            model,
            clock,
            state,
            rng: RngManager::new(snapshot.rng_state),
            issues,
            results: ResultTable::new(),
        })
    }

    /// Capture everything needed to resume this trial
    pub fn snapshot(&self) -> Result<TrialSnapshot, SimulationError> {
        Ok(TrialSnapshot {
            date: self.clock.current_date(),
            day: self.clock.current_day(),
            rng_state: self.rng.get_state(),
            regions: self.state.regions().to_vec(),
            issues: self.issues.issues().to_vec(),
            model_hash: compute_model_hash(self.model)?,
        })
    }

    pub fn model(&self) -> &NetworkModel {
        self.model
    }

    pub fn state(&self) -> &NetworkState {
        &self.state
    }

    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }

    pub fn results(&self) -> &ResultTable {
        &self.results
    }

    pub fn current_date(&self) -> NaiveDate {
        self.clock.current_date()
    }

    pub fn current_day(&self) -> usize {
        self.clock.current_day()
    }

    /// True once the state for the end date has been computed
    pub fn is_finished(&self) -> bool {
        self.clock.is_finished()
    }

    /// Simulate one day
    ///
    /// # Errors
    ///
    /// [`SimulationError::Finished`] when the end date is already reached.
    pub fn step_day(&mut self) -> Result<DayResult, SimulationError> {
        if self.clock.is_finished() {
            return Err(SimulationError::Finished(self.clock.end_date()));
        }

        let model = self.model;
        let stochastic = model.stochastic();
        let issues_before = self.issues.len();

        // STEP 1: ADVANCE, PARAMETERS FOR THE NEW DAY
        self.clock.advance_day();
        let date = self.clock.current_date();
        let multiplier = model.multiplier_on(date);
        let infection_probability = model.infection_probability_on(date);

        // STEP 2-3: CONTACTS
        let external = external_contacts(
            model,
            &self.state,
            multiplier.movement,
            stochastic,
            &mut self.rng,
            &mut self.issues,
        )?;
        let internal = internal_contacts_all(
            &self.state,
            model.age_mixing(),
            multiplier.contact,
            model.infectious(),
            stochastic,
            &mut self.rng,
        )?;
        let contacts = merge_contacts(external, &internal);

        // STEP 4: PROGRESSION
        let progressed = internal_progression(&self.state, model.progression(), stochastic, &mut self.rng)?;

        // STEP 5: INFECTIONS
        let next = next_state(
            &progressed,
            &contacts,
            &self.state,
            infection_probability,
            stochastic,
            &mut self.rng,
            &mut self.issues,
        )?;
        let new_infections = susceptible_total(&self.state) - susceptible_total(&next);
        self.state = next;

        // STEP 6: RECORD
        self.results.record(date, &self.state);

        let result = DayResult {
            date,
            day: self.clock.current_day(),
            new_infections,
            issues_recorded: self.issues.len() - issues_before,
        };
        debug!(
            date = %result.date,
            movement = multiplier.movement,
            contact = multiplier.contact,
            infection_probability,
            new_infections,
            issues = result.issues_recorded,
            "day simulated"
        );
        Ok(result)
    }

    /// Simulate at most `max_days` days, stopping early at the end date
    ///
    /// Returns the number of days simulated.
    pub fn run_for(&mut self, max_days: usize) -> Result<usize, SimulationError> {
        let mut simulated = 0;
        while simulated < max_days && !self.clock.is_finished() {
            self.step_day()?;
            simulated += 1;
        }
        Ok(simulated)
    }

    /// Simulate up to and including the end date
    pub fn run(&mut self) -> Result<usize, SimulationError> {
        self.run_for(usize::MAX)
    }

    /// Results and issues of the trial so far
    pub fn finish(self) -> TrialOutcome {
        info!(
            date = %self.clock.current_date(),
            rows = self.results.len(),
            issues = self.issues.len(),
            "trial finished"
        );
        TrialOutcome {
            results: self.results,
            issues: self.issues.into_vec(),
        }
    }
}

fn susceptible_total(state: &NetworkState) -> f64 {
    state.regions().iter().map(|region| region.susceptible_total()).sum()
}

/// Run one complete trial
pub fn run_trial(model: &NetworkModel, seed: u64) -> Result<TrialOutcome, SimulationError> {
    let mut simulation = Simulation::new(model, seed);
    simulation.run()?;
    Ok(simulation.finish())
}

/// Run `model.trials()` trials, trial `i` seeded with `base_seed + i`
pub fn run_trials(model: &NetworkModel, base_seed: u64) -> Result<Vec<TrialOutcome>, SimulationError> {
    (0..model.trials())
        .map(|i| {
            debug!(trial = i, "starting trial");
            run_trial(model, base_seed.wrapping_add(i))
        })
        .collect()
}
