//! Pause/resume through trial snapshots

mod common;

use chrono::NaiveDate;
use network_sim_core_rs::orchestrator::compute_model_hash;
use network_sim_core_rs::{
    NetworkModel, ResultRow, Simulation, SimulationError, TrialSnapshot,
};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, day).unwrap()
}

fn paused_at(model: &NetworkModel, seed: u64, days: usize) -> TrialSnapshot {
    let mut simulation = Simulation::new(model, seed);
    simulation.run_for(days).unwrap();
    simulation.snapshot().unwrap()
}

fn assert_resume_matches_uninterrupted(model: &NetworkModel, seed: u64, pause_after: usize) {
    let mut uninterrupted = Simulation::new(model, seed);
    uninterrupted.run().unwrap();

    let snapshot = paused_at(model, seed, pause_after);
    let json = snapshot.to_json().unwrap();
    let restored_snapshot = TrialSnapshot::from_json(&json).unwrap();
    assert_eq!(restored_snapshot, snapshot);

    let mut resumed = Simulation::restore(model, restored_snapshot).unwrap();
    assert_eq!(resumed.current_day(), pause_after);
    assert!(resumed.results().is_empty());
    resumed.run().unwrap();

    assert_eq!(resumed.state(), uninterrupted.state());
    let expected: Vec<&ResultRow> = uninterrupted.results().after(snapshot.date).collect();
    let actual: Vec<&ResultRow> = resumed.results().rows().iter().collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_resume_deterministic_trial() {
    let model = common::model();
    assert_resume_matches_uninterrupted(&model, 1, 6);
}

#[test]
fn test_resume_stochastic_trial() {
    let model = common::stochastic_model();
    for pause_after in [0, 1, 7, 14] {
        assert_resume_matches_uninterrupted(&model, 77, pause_after);
    }
}

#[test]
fn test_snapshot_records_position() {
    let model = common::model();
    let snapshot = paused_at(&model, 3, 4);
    assert_eq!(snapshot.day, 4);
    assert_eq!(snapshot.date, d(20));
    assert_eq!(snapshot.regions.len(), 3);
    assert_eq!(snapshot.model_hash, compute_model_hash(&model).unwrap());
}

#[test]
fn test_snapshot_of_finished_trial_restores_finished() {
    let model = common::model();
    let snapshot = paused_at(&model, 3, 100);
    assert_eq!(snapshot.date, d(31));

    let mut resumed = Simulation::restore(&model, snapshot).unwrap();
    assert!(resumed.is_finished());
    assert!(matches!(resumed.step_day(), Err(SimulationError::Finished(_))));
}

#[test]
fn test_model_hash_is_stable() {
    let a = common::model();
    let b = common::model();
    assert_eq!(compute_model_hash(&a).unwrap(), compute_model_hash(&b).unwrap());
    assert_eq!(compute_model_hash(&a).unwrap().len(), 64);
}

#[test]
fn test_snapshot_rejected_by_other_model() {
    let model = common::model();
    let snapshot = paused_at(&model, 1, 2);

    let mut inputs = common::inputs();
    inputs.infection_probability = vec![common::dated("2020-03-16", 0.25)];
    let other = common::build(&inputs);

    assert!(matches!(
        Simulation::restore(&other, snapshot),
        Err(SimulationError::ModelMismatch { .. })
    ));
}

#[test]
fn test_snapshot_with_inconsistent_date_rejected() {
    let model = common::model();
    let mut snapshot = paused_at(&model, 1, 2);
    snapshot.date = d(25);
    assert!(matches!(
        Simulation::restore(&model, snapshot),
        Err(SimulationError::StateValidationError(_))
    ));

    let mut snapshot = paused_at(&model, 1, 2);
    snapshot.day = 40;
    snapshot.date = d(16) + chrono::Days::new(40);
    assert!(matches!(
        Simulation::restore(&model, snapshot),
        Err(SimulationError::StateValidationError(_))
    ));
}

#[test]
fn test_snapshot_with_changed_population_rejected() {
    let model = common::model();
    let snapshot = paused_at(&model, 1, 2);

    let mut json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
    let first = &mut json["regions"][0]["values"][0];
    let value = first.as_f64().unwrap();
    *first = serde_json::json!(value + 50.0);
    let tampered = TrialSnapshot::from_json(&json.to_string()).unwrap();

    let err = Simulation::restore(&model, tampered).unwrap_err();
    assert!(matches!(err, SimulationError::StateValidationError(ref msg) if msg.contains("r1")));
}

#[test]
fn test_snapshot_with_missing_region_rejected() {
    let model = common::model();
    let mut snapshot = paused_at(&model, 1, 2);
    snapshot.regions.pop();
    assert!(matches!(
        Simulation::restore(&model, snapshot),
        Err(SimulationError::StateValidationError(_))
    ));
}

#[test]
fn test_snapshot_with_negative_count_rejected() {
    let model = common::model();
    let snapshot = paused_at(&model, 1, 2);

    let mut json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
    json["regions"][1]["values"][0] = serde_json::json!(-1.0);
    let tampered = TrialSnapshot::from_json(&json.to_string()).unwrap();
    assert!(matches!(
        Simulation::restore(&model, tampered),
        Err(SimulationError::StateValidationError(_))
    ));
}

#[test]
fn test_garbage_json_is_a_serialization_error() {
    assert!(matches!(
        TrialSnapshot::from_json("{\"date\": 3}"),
        Err(SimulationError::SerializationError(_))
    ));
}

#[test]
fn test_restored_trial_keeps_issues_once() {
    let mut inputs = common::inputs();
    inputs.initial_infections = vec![common::infection("r3", common::CHILD, 5000.0)];
    let model = common::build(&inputs);

    let mut uninterrupted = Simulation::new(&model, 9);
    uninterrupted.run().unwrap();
    let expected = uninterrupted.finish().issues;
    assert!(!expected.is_empty());

    let snapshot = paused_at(&model, 9, 5);
    assert_eq!(snapshot.issues.len(), 1);
    let mut resumed = Simulation::restore(&model, snapshot).unwrap();
    assert_eq!(resumed.issues().len(), 1);
    resumed.run().unwrap();
    assert_eq!(resumed.finish().issues, expected);
}
