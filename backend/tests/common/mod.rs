//! Shared fixtures for the integration tests

#![allow(dead_code)]

use network_sim_core_rs::network::{
    CommuteRow, DatedValue, InfectionRow, MixingEntry, MultiplierRow, PopulationRow, TransitionRow,
};
use network_sim_core_rs::{ModelInputs, NetworkModel};

pub const CHILD: &str = "[0,17)";
pub const ELDER: &str = "70+";
pub const AGES: [&str; 2] = [CHILD, ELDER];

pub fn transition(age: &str, src: &str, dst: &str, rate: f64) -> TransitionRow {
    TransitionRow {
        age: age.to_string(),
        src: src.to_string(),
        dst: dst.to_string(),
        rate,
    }
}

pub fn population(region: &str, age: &str, count: f64) -> PopulationRow {
    PopulationRow {
        region: region.to_string(),
        age: age.to_string(),
        count,
    }
}

pub fn commute(source: &str, target: &str, weight: f64, delta_adjustment: f64) -> CommuteRow {
    CommuteRow {
        source: source.to_string(),
        target: target.to_string(),
        weight,
        delta_adjustment,
    }
}

pub fn mixing(source: &str, target: &str, rate: f64) -> MixingEntry {
    MixingEntry {
        source: source.to_string(),
        target: target.to_string(),
        rate,
    }
}

pub fn dated(date: &str, value: f64) -> DatedValue {
    DatedValue {
        date: date.to_string(),
        value,
    }
}

pub fn multiplier(date: &str, movement: f64, contact: f64) -> MultiplierRow {
    MultiplierRow {
        date: date.to_string(),
        movement,
        contact,
    }
}

pub fn infection(region: &str, age: &str, count: f64) -> InfectionRow {
    InfectionRow {
        region: region.to_string(),
        age: age.to_string(),
        count,
    }
}

/// S -> E -> {A, I} -> R, identical for both ages
pub fn progression() -> Vec<TransitionRow> {
    AGES.iter()
        .flat_map(|age| {
            vec![
                transition(age, "E", "E", 0.6),
                transition(age, "E", "A", 0.2),
                transition(age, "E", "I", 0.2),
                transition(age, "A", "A", 0.7),
                transition(age, "A", "R", 0.3),
                transition(age, "I", "I", 0.8),
                transition(age, "I", "R", 0.2),
                transition(age, "R", "R", 1.0),
            ]
        })
        .collect()
}

/// Three regions, a commute cycle and a 16-day run starting 2020-03-16
///
/// r1's children are split over two rows (summed at construction).
pub fn inputs() -> ModelInputs {
    ModelInputs {
        progression: progression(),
        population: vec![
            population("r1", CHILD, 600.0),
            population("r1", CHILD, 400.0),
            population("r1", ELDER, 500.0),
            population("r2", CHILD, 800.0),
            population("r2", ELDER, 700.0),
            population("r3", CHILD, 300.0),
            population("r3", ELDER, 900.0),
        ],
        commutes: vec![
            commute("r1", "r2", 100.0, 0.5),
            commute("r2", "r1", 80.0, 0.5),
            commute("r2", "r3", 50.0, 1.0),
            commute("r3", "r1", 30.0, 0.0),
        ],
        mixing: vec![
            mixing(CHILD, CHILD, 2.0),
            mixing(CHILD, ELDER, 0.5),
            mixing(ELDER, CHILD, 0.5),
            mixing(ELDER, ELDER, 1.0),
        ],
        infectious_compartments: vec!["A".to_string(), "I".to_string()],
        infection_probability: vec![dated("2020-03-16", 0.5)],
        infection_probability_default: None,
        initial_infections: vec![infection("r1", CHILD, 10.0)],
        trials: 1,
        start_date: "2020-03-16".to_string(),
        end_date: "2020-03-31".to_string(),
        multipliers: vec![],
        multiplier_default: None,
        stochastic: false,
        external_contact_mode: Default::default(),
    }
}

pub fn build(inputs: &ModelInputs) -> NetworkModel {
    NetworkModel::build(inputs).expect("fixture inputs are valid").0
}

pub fn model() -> NetworkModel {
    build(&inputs())
}

pub fn stochastic_model() -> NetworkModel {
    let mut inputs = inputs();
    inputs.stochastic = true;
    build(&inputs)
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} +/- {}, got {}",
        expected,
        tolerance,
        actual
    );
}
