/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use thermsched::config::ScenarioLoader;
use thermsched::policy::available_policies;
use thermsched::scheduler::{SchedulerResult, Simulator};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Thermal- and frequency-aware real-time scheduling simulator.
///
/// Example:
///   thermsched --scenario scenarios/two_cores.yaml --policy JDEDS --thermal
#[derive(Debug, Parser)]
#[command(
    name = "thermsched",
    about = "Discrete-time multiprocessor scheduling simulator with TCPN thermal model",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML scenario file.
    #[arg(short = 's', long = "scenario", required_unless_present = "list_policies")]
    scenario: Option<PathBuf>,

    /// Scheduling policy to simulate.
    #[arg(short = 'p', long = "policy", default_value = "G-EDF")]
    policy: String,

    /// Print the registered policies and exit.
    #[arg(short = 'l', long = "list-policies", default_value_t = false)]
    list_policies: bool,

    /// Enable thermal simulation regardless of the scenario setting.
    #[arg(short = 't', long = "thermal", default_value_t = false)]
    thermal: bool,

    /// Override the simulation step (seconds).
    #[arg(long = "dt")]
    dt: Option<f64>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_policies {
        for name in available_policies() {
            println!("{name}");
        }
        return;
    }

    if let Err(e) = run(&cli) {
        error!("Simulation failed: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let path = cli
        .scenario
        .as_ref()
        .context("a scenario file is required")?;

    info!(
        scenario = %path.display(),
        policy   = %cli.policy,
        thermal  = cli.thermal,
        dt       = ?cli.dt,
        "Configuration"
    );

    let mut spec = ScenarioLoader::load_from_file(path)?;
    if cli.thermal {
        spec.simulation.simulate_thermal = true;
    }
    if let Some(dt) = cli.dt {
        spec.simulation.dt = dt;
    }

    let simulator = Simulator::new(spec).context("Scenario rejected")?;
    let result = simulator
        .run_by_name(&cli.policy)
        .with_context(|| format!("Policy {} could not complete the run", cli.policy))?;

    print_summary(&result);
    Ok(())
}

// ── Summary ───────────────────────────────────────────────────────────────────

fn print_summary(result: &SchedulerResult) {
    info!("=== Simulation summary ===");
    info!(
        policy      = result.policy(),
        tasks       = result.tasks(),
        cores       = result.cores(),
        quantum     = result.quantum(),
        hyperperiod = result.hyperperiod(),
        steps       = result.steps(),
        corrections = result.corrections(),
        "Run"
    );

    let misses = result.deadline_misses();
    if misses.is_empty() {
        info!("No deadline misses");
    } else {
        warn!("{} deadline miss(es):", misses.len());
        for miss in misses {
            warn!(
                "  task {} | deadline {:.4}s | pending {:.1} cycles",
                miss.task, miss.job_deadline, miss.pending_cycles
            );
        }
    }

    let thermal = (result.energy_per_core(), result.max_core_temperatures());
    if let (Some(energy), Some(peaks)) = thermal {
        for (core, (joules, peak)) in energy.iter().zip(peaks.iter()).enumerate() {
            info!("  core {core} | energy {joules:.3} J | max temperature {peak:.2} °C");
        }
    }
}
