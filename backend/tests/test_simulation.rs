//! End-to-end trials: invariants, determinism and driver behaviour

mod common;

use chrono::NaiveDate;
use common::{assert_close, commute, dated, infection, multiplier, population, CHILD, ELDER};
use network_sim_core_rs::seeding::SeedingError;
use network_sim_core_rs::{
    randomly_infect_regions, run_trial, run_trials, AgeRange, Compartment, Issue, ModelInputs, NetworkModel,
    ResultTable, RngManager, Simulation, SimulationError,
};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, day).unwrap()
}

fn susceptibles_on(results: &ResultTable, date: NaiveDate) -> f64 {
    results
        .rows()
        .iter()
        .filter(|row| row.date == date && row.state.is_susceptible())
        .map(|row| row.total)
        .sum()
}

fn initial_susceptibles(model: &NetworkModel) -> f64 {
    model
        .initial_state()
        .regions()
        .iter()
        .map(|region| region.susceptible_total())
        .sum()
}

fn assert_population_constant(model: &NetworkModel, results: &ResultTable) {
    let expected = model.initial_state().total_population();
    for (date, total) in results.totals_by_date() {
        assert!(
            (total - expected).abs() <= 1e-6 * expected,
            "population on {} is {}, expected {}",
            date,
            total,
            expected
        );
    }
}

#[test]
fn test_population_constant_every_day() {
    for stochastic in [false, true] {
        let mut inputs = common::inputs();
        inputs.stochastic = stochastic;
        let model = common::build(&inputs);

        let outcome = run_trial(&model, 123).unwrap();
        assert_eq!(outcome.results.dates().len(), 16);
        assert_population_constant(&model, &outcome.results);

        // per region too
        let per_region = outcome.results.aggregate_ages();
        for region in model.layout().regions() {
            let totals: Vec<f64> = per_region
                .dates()
                .iter()
                .map(|date| {
                    per_region
                        .rows()
                        .iter()
                        .filter(|row| row.date == *date && &row.node == region)
                        .map(|row| row.total)
                        .sum()
                })
                .collect();
            for total in &totals {
                assert_close(*total, totals[0], 1e-6 * totals[0]);
            }
        }
    }
}

#[test]
fn test_start_date_rows_hold_seeded_state() {
    let model = common::model();
    let outcome = run_trial(&model, 1).unwrap();
    let child = AgeRange::new(CHILD);
    let cell = |state: &str| {
        outcome
            .results
            .rows()
            .iter()
            .find(|row| {
                row.date == d(16) && row.node == "r1" && row.age.as_ref() == Some(&child) && row.state.as_str() == state
            })
            .map(|row| row.total)
            .unwrap()
    };
    assert_eq!(cell("S"), 990.0);
    assert_eq!(cell("E"), 10.0);
    assert_eq!(cell("A"), 0.0);
}

#[test]
fn test_no_movement_keeps_infection_in_seeded_region() {
    for stochastic in [false, true] {
        let mut inputs = common::inputs();
        inputs.commutes.iter_mut().for_each(|edge| edge.delta_adjustment = 1.0);
        inputs.multipliers = vec![multiplier("2020-03-16", 0.0, 1.0)];
        inputs.initial_infections = vec![infection("r1", CHILD, 100.0)];
        inputs.stochastic = stochastic;
        let model = common::build(&inputs);

        let outcome = run_trial(&model, 123).unwrap();
        let infectious = [Compartment::new("A"), Compartment::new("I")];
        let spread: f64 = outcome
            .results
            .rows()
            .iter()
            .filter(|row| row.node != "r1" && infectious.contains(&row.state))
            .map(|row| row.total)
            .sum();
        assert_eq!(spread, 0.0);

        // while the seeded region does see infections
        let inside: f64 = outcome
            .results
            .rows()
            .iter()
            .filter(|row| row.node == "r1" && infectious.contains(&row.state))
            .map(|row| row.total)
            .sum();
        assert!(inside > 0.0);
        assert_population_constant(&model, &outcome.results);
    }
}

#[test]
fn test_no_contacts_means_no_new_infections() {
    let mut inputs = common::inputs();
    inputs.population = vec![
        population("r1", CHILD, 31950.0),
        population("r1", ELDER, 31950.0),
    ];
    inputs.commutes = vec![commute("r1", "r1", 0.0, 1.0)];
    inputs.multipliers = vec![multiplier("2020-03-16", 1.0, 0.0)];
    inputs.initial_infections = vec![infection("r1", ELDER, 1000.0)];
    let (model, issues) = NetworkModel::build(&inputs).unwrap();
    assert!(issues.is_empty());

    let outcome = run_trial(&model, 123).unwrap();
    let seeded = initial_susceptibles(&model) - 1000.0;
    for date in outcome.results.dates() {
        assert_eq!(susceptibles_on(&outcome.results, date), seeded);
    }
}

#[test]
fn test_zero_infection_probability() {
    let mut inputs = common::inputs();
    inputs.infection_probability = vec![dated("2020-03-16", 0.0)];
    inputs.initial_infections = vec![infection("r2", CHILD, 30.0)];
    let model = common::build(&inputs);

    let outcome = run_trial(&model, 123).unwrap();
    let last = *outcome.results.dates().last().unwrap();
    assert_eq!(susceptibles_on(&outcome.results, last) + 30.0, initial_susceptibles(&model));
}

#[test]
fn test_schedule_change_applies_on_its_own_date() {
    let mut inputs = common::inputs();
    inputs.infection_probability = vec![dated("2020-03-16", 0.0), dated("2020-03-20", 1.0)];
    let model = common::build(&inputs);

    let outcome = run_trial(&model, 1).unwrap();
    let seeded = initial_susceptibles(&model) - 10.0;
    for day in 16..20 {
        assert_eq!(susceptibles_on(&outcome.results, d(day)), seeded, "2020-03-{}", day);
    }
    for day in 20..=31 {
        assert!(susceptibles_on(&outcome.results, d(day)) < seeded, "2020-03-{}", day);
    }
}

#[test]
fn test_end_date_parameters_are_used() {
    let mut inputs = common::inputs();
    inputs.infection_probability = vec![dated("2020-03-16", 0.0), dated("2020-03-31", 1.0)];
    let model = common::build(&inputs);

    let mut simulation = Simulation::new(&model, 1);
    simulation.run_for(14).unwrap();
    let seeded = initial_susceptibles(&model) - 10.0;
    assert_eq!(susceptibles_on(simulation.results(), d(30)), seeded);

    let last = simulation.step_day().unwrap();
    assert_eq!(last.date, d(31));
    assert!(last.new_infections > 0.0);
    assert!(susceptibles_on(simulation.results(), d(31)) < seeded);
    assert!(simulation.is_finished());
}

#[test]
fn test_infections_spread_with_default_settings() {
    let model = common::model();
    let mut simulation = Simulation::new(&model, 5);
    let mut infected = 0.0;
    while !simulation.is_finished() {
        infected += simulation.step_day().unwrap().new_infections;
    }
    assert!(infected > 0.0);
    let final_s = susceptibles_on(simulation.results(), d(31));
    assert_close(initial_susceptibles(&model) - 10.0 - infected, final_s, 1e-6);
}

#[test]
fn test_same_seed_same_results() {
    let model = common::stochastic_model();
    let a = run_trial(&model, 2024).unwrap();
    let b = run_trial(&model, 2024).unwrap();
    assert_eq!(a, b);

    let c = run_trial(&model, 2025).unwrap();
    assert_ne!(a.results, c.results);
}

#[test]
fn test_deterministic_runs_ignore_seed() {
    let model = common::model();
    assert_eq!(run_trial(&model, 1).unwrap(), run_trial(&model, 999).unwrap());
}

#[test]
fn test_stepping_past_end_is_an_error() {
    let model = common::model();
    let mut simulation = Simulation::new(&model, 1);
    assert_eq!(simulation.run().unwrap(), 15);
    assert!(simulation.is_finished());
    assert_eq!(simulation.current_date(), d(31));
    assert!(matches!(simulation.step_day(), Err(SimulationError::Finished(date)) if date == d(31)));
    assert_eq!(simulation.run_for(3).unwrap(), 0);
}

#[test]
fn test_run_for_is_bounded() {
    let model = common::model();
    let mut simulation = Simulation::new(&model, 1);
    assert_eq!(simulation.run_for(3).unwrap(), 3);
    assert_eq!(simulation.current_day(), 3);
    assert_eq!(simulation.current_date(), d(19));
    assert_eq!(simulation.results().dates(), vec![d(16), d(17), d(18), d(19)]);

    let step = simulation.step_day().unwrap();
    assert_eq!(step.date, d(20));
    assert_eq!(step.day, 4);
}

#[test]
fn test_single_day_run_has_only_seeded_rows() {
    let mut inputs: ModelInputs = common::inputs();
    inputs.end_date = inputs.start_date.clone();
    let model = common::build(&inputs);
    let outcome = run_trial(&model, 1).unwrap();
    assert_eq!(outcome.results.dates(), vec![d(16)]);
}

#[test]
fn test_run_trials_seeds_each_trial() {
    let mut inputs = common::inputs();
    inputs.stochastic = true;
    inputs.trials = 3;
    let model = common::build(&inputs);

    let outcomes = run_trials(&model, u64::MAX).unwrap();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0], run_trial(&model, u64::MAX).unwrap());
    assert_eq!(outcomes[1], run_trial(&model, 0).unwrap());
    assert_eq!(outcomes[2], run_trial(&model, 1).unwrap());

    let tables: Vec<ResultTable> = outcomes.into_iter().map(|outcome| outcome.results).collect();
    let mean = ResultTable::mean(&tables).unwrap();
    assert_eq!(mean.len(), tables[0].len());
    assert_population_constant(&model, &mean);
}

#[test]
fn test_oversized_seed_is_clamped_with_issue() {
    let mut inputs = common::inputs();
    inputs.initial_infections = vec![infection("r3", CHILD, 5000.0)];
    let model = common::build(&inputs);

    let simulation = Simulation::new(&model, 1);
    let r3 = model.layout().region_index("r3").unwrap();
    let child = model.layout().age_index(&AgeRange::new(CHILD)).unwrap();
    assert_eq!(simulation.state().region(r3).susceptible(child), 0.0);
    assert_eq!(simulation.issues().at_least(Issue::CLAMPED).len(), 1);
}

#[test]
fn test_randomly_infect_regions() {
    let model = common::model();
    let ages = [AgeRange::new(CHILD), AgeRange::new(ELDER)];
    let mut rng = RngManager::new(11);

    let seeds = randomly_infect_regions(&model, 2, &ages, 5.0, &mut rng).unwrap();
    assert_eq!(seeds.len(), 4);
    assert_ne!(seeds[0].region, seeds[2].region);
    assert!(seeds.iter().all(|seed| seed.count == 5.0));

    let mut again = RngManager::new(11);
    assert_eq!(randomly_infect_regions(&model, 2, &ages, 5.0, &mut again).unwrap(), seeds);

    let simulation = Simulation::with_seeds(&model, &seeds, rng);
    assert_eq!(
        initial_susceptibles(&model) - 20.0,
        simulation.state().regions().iter().map(|r| r.susceptible_total()).sum::<f64>()
    );

    assert_eq!(
        randomly_infect_regions(&model, 4, &ages, 1.0, &mut again),
        Err(SeedingError::TooManyRegions {
            requested: 4,
            available: 3
        })
    );
}
