//! Network simulation CLI
//!
//! Usage:
//!
//! ```bash
//! network-sim validate model.json
//! network-sim run model.json --seed 42 --mean --output results.json
//! network-sim run model.json --pause-after 10 --snapshot paused.json
//! network-sim resume model.json paused.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use network_sim_core_rs::{
    run_trials, Issue, ModelInputs, NetworkModel, ResultTable, Simulation, TrialOutcome, TrialSnapshot,
};

#[derive(Parser, Debug)]
#[command(name = "network-sim")]
#[command(about = "Age-structured epidemic simulation over a commuting network")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the model and report issues without simulating
    Validate {
        /// Model inputs (JSON)
        input: PathBuf,
    },

    /// Run every trial of a model
    Run {
        /// Model inputs (JSON)
        input: PathBuf,

        /// Seed of the first trial, trial i uses seed + i
        #[arg(long, default_value = "1")]
        seed: u64,

        /// Override the number of trials
        #[arg(long)]
        trials: Option<u64>,

        /// Keep age groups instead of summing them per region
        #[arg(long)]
        by_age: bool,

        /// Write the cell-wise mean over trials instead of every trial
        #[arg(long)]
        mean: bool,

        /// Stop the first trial after this many days and write a snapshot
        #[arg(long, requires = "snapshot")]
        pause_after: Option<usize>,

        /// Snapshot output path
        #[arg(long, requires = "pause_after")]
        snapshot: Option<PathBuf>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Continue a paused trial to its end date
    Resume {
        /// Model inputs (JSON), must match the model that was paused
        input: PathBuf,

        /// Snapshot written by `run --pause-after`
        snapshot: PathBuf,

        #[arg(long)]
        by_age: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Args::parse().command {
        Command::Validate { input } => {
            let (model, issues) = load_model(&input, None)?;
            info!(
                regions = model.layout().num_regions(),
                ages = model.layout().num_ages(),
                compartments = model.layout().num_compartments(),
                edges = model.graph().edge_count(),
                issues = issues.len(),
                "model is valid"
            );
            write_output(None, &json!({ "issues": issues }))
        }
        Command::Run {
            input,
            seed,
            trials,
            by_age,
            mean,
            pause_after,
            snapshot,
            output,
        } => {
            let (model, model_issues) = load_model(&input, trials)?;
            if let (Some(days), Some(path)) = (pause_after, snapshot) {
                return pause(&model, seed, days, &path);
            }

            let outcomes = run_trials(&model, seed).context("trial failed")?;
            let issues: Vec<&Issue> = model_issues
                .iter()
                .chain(outcomes.iter().flat_map(|outcome| &outcome.issues))
                .collect();

            let tables: Vec<ResultTable> = outcomes
                .iter()
                .map(|outcome| view(&outcome.results, by_age))
                .collect();
            let document = if mean {
                let mean = ResultTable::mean(&tables).context("model runs zero trials")?;
                json!({ "results": mean, "issues": issues })
            } else {
                json!({ "trials": tables, "issues": issues })
            };
            write_output(output.as_deref(), &document)
        }
        Command::Resume {
            input,
            snapshot,
            by_age,
            output,
        } => {
            let (model, _) = load_model(&input, None)?;
            let raw = fs::read_to_string(&snapshot)
                .with_context(|| format!("failed to read snapshot {}", snapshot.display()))?;
            let snapshot = TrialSnapshot::from_json(&raw)?;

            let mut simulation = Simulation::restore(&model, snapshot)?;
            simulation.run()?;
            let TrialOutcome { results, issues } = simulation.finish();
            write_output(
                output.as_deref(),
                &json!({ "results": view(&results, by_age), "issues": issues }),
            )
        }
    }
}

fn load_model(path: &Path, trials: Option<u64>) -> Result<(NetworkModel, Vec<Issue>)> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut inputs: ModelInputs =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse model inputs {}", path.display()))?;
    if let Some(trials) = trials {
        inputs.trials = trials;
    }

    NetworkModel::build(&inputs).with_context(|| format!("invalid model {}", path.display()))
}

fn pause(model: &NetworkModel, seed: u64, days: usize, path: &Path) -> Result<()> {
    let mut simulation = Simulation::new(model, seed);
    let simulated = simulation.run_for(days)?;
    if simulated < days {
        bail!(
            "run ends on {} after {} days, nothing left to pause",
            simulation.current_date(),
            simulated
        );
    }
    let snapshot = simulation.snapshot()?;
    fs::write(path, snapshot.to_json()?).with_context(|| format!("failed to write {}", path.display()))?;
    info!(date = %snapshot.date, path = %path.display(), "snapshot written");
    Ok(())
}

fn view(results: &ResultTable, by_age: bool) -> ResultTable {
    if by_age {
        results.clone()
    } else {
        results.aggregate_ages()
    }
}

fn write_output(path: Option<&Path>, document: &serde_json::Value) -> Result<()> {
    let text = serde_json::to_string_pretty(document)?;
    match path {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "results written");
        }
        None => println!("{}", text),
    }
    Ok(())
}
