/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scenario loading.
//!
//! A scenario file describes one complete simulation input.  The expected
//! YAML structure is:
//! ```yaml
//! tasks:
//!   periodic:
//!     - name: sensor
//!       cycles: 2000
//!       period: 0.1
//!       deadline: 0.1        # optional, defaults to the period
//!   aperiodic:
//!     - cycles: 500
//!       arrival: 0.05
//!       deadline: 0.2
//! cpu:
//!   board: { x: 12, y: 12, z: 0.001, density: 8933, specific_heat_capacity: 385, thermal_conductivity: 400 }
//!   cores:
//!     number_of_cores: 2
//!     material: { x: 2, y: 2, z: 0.0006, density: 2330, specific_heat_capacity: 712, thermal_conductivity: 148 }
//!     available_frequencies: [500, 1000]
//! environment:                # optional
//!   convection_factor: 50
//!   t_env: 45
//!   t_max: 110
//! simulation:                 # optional, every field has a default
//!   dt: 0.01
//!   simulate_thermal: true
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::specification::{
    CpuSpecification, EnvironmentSpecification, GlobalSpecification, SimulationSpecification,
};
use crate::task::{Task, TaskSet};

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
struct ScenarioFile {
    tasks: TasksSection,
    cpu: CpuSpecification,
    #[serde(default)]
    environment: EnvironmentSpecification,
    #[serde(default)]
    simulation: SimulationSpecification,
}

#[derive(Debug, Default, Deserialize)]
struct TasksSection {
    #[serde(default)]
    periodic: Vec<PeriodicEntry>,
    #[serde(default)]
    aperiodic: Vec<AperiodicEntry>,
}

#[derive(Debug, Deserialize)]
struct PeriodicEntry {
    name: Option<String>,
    cycles: f64,
    period: f64,
    /// Relative deadline; implicit (equal to the period) when absent.
    deadline: Option<f64>,
    energy_per_cycle: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AperiodicEntry {
    name: Option<String>,
    cycles: f64,
    arrival: f64,
    /// Absolute deadline.
    deadline: f64,
    energy_per_cycle: Option<f64>,
}

impl PeriodicEntry {
    fn into_task(self, index: usize) -> Task {
        let deadline = self.deadline.unwrap_or(self.period);
        let task = Task::periodic(self.cycles, self.period, deadline)
            .with_name(self.name.unwrap_or_else(|| format!("periodic_{index}")));
        match self.energy_per_cycle {
            Some(e) => task.with_energy_per_cycle(e),
            None => task,
        }
    }
}

impl AperiodicEntry {
    fn into_task(self, index: usize) -> Task {
        let task = Task::aperiodic(self.cycles, self.arrival, self.deadline)
            .with_name(self.name.unwrap_or_else(|| format!("aperiodic_{index}")));
        match self.energy_per_cycle {
            Some(e) => task.with_energy_per_cycle(e),
            None => task,
        }
    }
}

// ── ScenarioLoader ────────────────────────────────────────────────────────────

/// Reads scenario files into a validated [`GlobalSpecification`].
#[derive(Debug, Default)]
pub struct ScenarioLoader;

impl ScenarioLoader {
    /// Parses and validates the scenario at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, if the YAML is
    /// structurally invalid, or if the resulting specification is rejected
    /// (unknown initial frequency, overlapping cores, non-positive `dt`, ...).
    pub fn load_from_file(path: &Path) -> Result<GlobalSpecification> {
        info!("Loading scenario from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open scenario file: {}", path.display()))?;

        Self::load_from_str(&content)
            .with_context(|| format!("Invalid scenario file: {}", path.display()))
    }

    /// Same as [`load_from_file`](Self::load_from_file) for in-memory YAML.
    pub fn load_from_str(content: &str) -> Result<GlobalSpecification> {
        let file: ScenarioFile =
            serde_yaml::from_str(content).context("Failed to parse scenario YAML")?;

        if file.tasks.periodic.is_empty() && file.tasks.aperiodic.is_empty() {
            warn!("Scenario declares no tasks");
        }

        let periodic: Vec<Task> = file
            .tasks
            .periodic
            .into_iter()
            .enumerate()
            .map(|(i, e)| e.into_task(i))
            .collect();
        let aperiodic: Vec<Task> = file
            .tasks
            .aperiodic
            .into_iter()
            .enumerate()
            .map(|(i, e)| e.into_task(i))
            .collect();

        let tasks = TaskSet::new(periodic, aperiodic).context("Invalid task set")?;
        for task in tasks.iter() {
            debug!(
                "  Task {} ({}) | cycles: {} | kind: {:?}",
                task.id, task.name, task.cycles, task.kind
            );
        }

        let spec = GlobalSpecification {
            tasks,
            cpu: file.cpu,
            environment: file.environment,
            simulation: file.simulation,
        };
        spec.validate().context("Scenario rejected")?;

        info!(
            tasks = spec.tasks.len(),
            cores = spec.cpu.number_of_cores(),
            dt = spec.simulation.dt,
            thermal = spec.simulation.simulate_thermal,
            "Scenario loaded"
        );
        Ok(spec)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
