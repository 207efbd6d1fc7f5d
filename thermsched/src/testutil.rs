/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scenario fixtures shared by the unit tests.

use crate::specification::{
    CoreSpecification, CpuSpecification, EnergyConsumption, EnvironmentSpecification,
    GlobalSpecification, MaterialCuboid, SimulationSpecification,
};
use crate::task::{Task, TaskSet};

pub(crate) fn copper(x: usize, y: usize) -> MaterialCuboid {
    MaterialCuboid {
        x,
        y,
        z: 0.001,
        density: 8933.0,
        specific_heat_capacity: 385.0,
        thermal_conductivity: 400.0,
    }
}

pub(crate) fn silicon(x: usize, y: usize) -> MaterialCuboid {
    MaterialCuboid {
        x,
        y,
        z: 0.001,
        density: 2330.0,
        specific_heat_capacity: 712.0,
        thermal_conductivity: 148.0,
    }
}

/// Cores of 1x1 cells on a board wide enough for them, no leakage.
pub(crate) fn cpu(cores: usize, frequencies: Vec<f64>) -> CpuSpecification {
    let side = 2 * cores + 1;
    CpuSpecification {
        board: copper(side, side),
        cores: CoreSpecification {
            number_of_cores: cores,
            material: silicon(1, 1),
            origins: vec![],
            available_frequencies: frequencies,
            initial_frequencies: vec![],
            energy: EnergyConsumption {
                leakage_alpha: 0.0,
                leakage_delta: 0.0,
                ..EnergyConsumption::default()
            },
        },
    }
}

/// Periodic tasks `(cycles, period)` with implicit deadlines.
pub(crate) fn implicit_tasks(tasks: &[(f64, f64)]) -> Vec<Task> {
    tasks
        .iter()
        .map(|&(c, t)| Task::periodic(c, t, t))
        .collect()
}

/// Implicit-deadline periodic tasks on `cores` cores running at 1 Hz.
pub(crate) fn edf_scenario(tasks: &[(f64, f64)], cores: usize, dt: f64) -> GlobalSpecification {
    scenario(implicit_tasks(tasks), vec![], cores, vec![1.0], dt)
}

pub(crate) fn scenario(
    periodic: Vec<Task>,
    aperiodic: Vec<Task>,
    cores: usize,
    frequencies: Vec<f64>,
    dt: f64,
) -> GlobalSpecification {
    GlobalSpecification {
        tasks: TaskSet::new(periodic, aperiodic).expect("valid fixture tasks"),
        cpu: cpu(cores, frequencies),
        environment: EnvironmentSpecification::default(),
        simulation: SimulationSpecification {
            dt,
            ..SimulationSpecification::default()
        },
    }
}

/// Two 2x2 cores on an 8x4 board, two periodic tasks, thermal on.
pub(crate) fn thermal_scenario() -> GlobalSpecification {
    let mut spec = scenario(
        implicit_tasks(&[(200.0, 1.0), (300.0, 0.5)]),
        vec![],
        2,
        vec![500.0, 1000.0],
        0.01,
    );
    spec.cpu.board = copper(8, 4);
    spec.cpu.cores.material = silicon(2, 2);
    spec.simulation.simulate_thermal = true;
    spec
}

/// Same scenario with every task drawing `energy` joules per cycle.
pub(crate) fn with_energy_per_cycle(spec: GlobalSpecification, energy: f64) -> GlobalSpecification {
    let periodic = spec
        .tasks
        .periodic()
        .iter()
        .cloned()
        .map(|t| t.with_energy_per_cycle(energy))
        .collect();
    let aperiodic = spec
        .tasks
        .aperiodic()
        .iter()
        .cloned()
        .map(|t| t.with_energy_per_cycle(energy))
        .collect();
    GlobalSpecification {
        tasks: TaskSet::new(periodic, aperiodic).expect("valid fixture tasks"),
        ..spec
    }
}
