/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Platform, environment and simulation specifications.
//!
//! Everything the engine needs besides the task set lives here.  The structs
//! derive `serde` traits so scenario files map onto them directly (see
//! [`crate::config`]); the task set is built separately because ids are
//! assigned on construction.
//!
//! Units: frequencies in Hz, temperatures in °C, lengths in metres, except
//! the x/y extent of a [`MaterialCuboid`] which is counted in mesh cells of
//! side [`SimulationSpecification::mesh_step`].

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scheduler::SimulationError;
use crate::task::TaskSet;

// ── Materials ─────────────────────────────────────────────────────────────────

/// Homogeneous rectangular block of material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialCuboid {
    /// Width in mesh cells.
    pub x: usize,
    /// Depth in mesh cells.
    pub y: usize,
    /// Thickness in metres.
    pub z: f64,
    /// kg/m³
    pub density: f64,
    /// J/(kg·K)
    pub specific_heat_capacity: f64,
    /// W/(m·K)
    pub thermal_conductivity: f64,
}

impl MaterialCuboid {
    /// Number of mesh cells in the x/y plane.
    pub fn cells(&self) -> usize {
        self.x * self.y
    }

    /// Volume in m³ for the given mesh step.
    pub fn volume(&self, mesh_step: f64) -> f64 {
        self.x as f64 * self.y as f64 * mesh_step * mesh_step * self.z
    }

    /// Heat capacity in J/K for the given mesh step.
    pub fn heat_capacity(&self, mesh_step: f64) -> f64 {
        self.volume(mesh_step) * self.density * self.specific_heat_capacity
    }
}

/// Lower-left corner of a core on the board, in mesh cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub x: usize,
    pub y: usize,
}

/// Power coefficients of one core.
///
/// Leakage power is `leakage_delta · T + leakage_alpha` (W, T in °C).
/// Dynamic power at relative frequency `f` is `dynamic_alpha · f³ + dynamic_beta` (W).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConsumption {
    pub leakage_alpha: f64,
    pub leakage_delta: f64,
    pub dynamic_alpha: f64,
    pub dynamic_beta: f64,
}

impl Default for EnergyConsumption {
    fn default() -> Self {
        Self {
            leakage_alpha: 0.001,
            leakage_delta: 0.1,
            dynamic_alpha: 1.52,
            dynamic_beta: 0.08,
        }
    }
}

impl EnergyConsumption {
    /// Dynamic power at relative frequency `f`.
    pub fn dynamic_power(&self, f: f64) -> f64 {
        self.dynamic_alpha * f.powi(3) + self.dynamic_beta
    }
}

// ── CPU ───────────────────────────────────────────────────────────────────────

/// Homogeneous cores: shared geometry, material and frequency table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreSpecification {
    pub number_of_cores: usize,

    pub material: MaterialCuboid,

    /// Placement on the board.  Empty means "generate automatically".
    #[serde(default)]
    pub origins: Vec<Origin>,

    /// Selectable frequencies in Hz.  The maximum is the base frequency.
    pub available_frequencies: Vec<f64>,

    /// Frequency of each core at `t = 0`.  Empty means the base frequency.
    #[serde(default)]
    pub initial_frequencies: Vec<f64>,

    #[serde(default)]
    pub energy: EnergyConsumption,
}

impl CoreSpecification {
    /// Highest available frequency; defines the cycle-to-second conversion.
    pub fn base_frequency(&self) -> f64 {
        self.available_frequencies
            .iter()
            .copied()
            .fold(0.0, f64::max)
    }

    /// Available frequencies divided by the base frequency, ascending.
    pub fn relative_frequencies(&self) -> Vec<f64> {
        let base = self.base_frequency();
        let mut v: Vec<f64> = self
            .available_frequencies
            .iter()
            .map(|f| f / base)
            .collect();
        v.sort_by(f64::total_cmp);
        v
    }

    /// Relative frequency of each core at `t = 0`.
    pub fn initial_relative_frequencies(&self) -> Vec<f64> {
        if self.initial_frequencies.is_empty() {
            vec![1.0; self.number_of_cores]
        } else {
            let base = self.base_frequency();
            self.initial_frequencies.iter().map(|f| f / base).collect()
        }
    }
}

/// Board plus cores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuSpecification {
    pub board: MaterialCuboid,
    pub cores: CoreSpecification,
}

impl CpuSpecification {
    pub fn number_of_cores(&self) -> usize {
        self.cores.number_of_cores
    }

    /// Core origins: the configured ones, or a generated layout.
    ///
    /// Generated layouts put the cores on a `cols × rows` grid
    /// (`cols = ⌈√m⌉`) with equal gaps between cores and to the board edges.
    pub fn core_origins(&self) -> Result<Vec<Origin>, SimulationError> {
        if !self.cores.origins.is_empty() {
            return Ok(self.cores.origins.clone());
        }

        let m = self.cores.number_of_cores;
        let cols = (m as f64).sqrt().ceil() as usize;
        let rows = m.div_ceil(cols.max(1));
        let core = &self.cores.material;

        let used_x = cols * core.x;
        let used_y = rows * core.y;
        if used_x > self.board.x || used_y > self.board.y {
            return Err(SimulationError::InvalidSpecification(format!(
                "{m} cores of {}x{} cells do not fit on a {}x{} board",
                core.x, core.y, self.board.x, self.board.y
            )));
        }
        let gap_x = (self.board.x - used_x) / (cols + 1);
        let gap_y = (self.board.y - used_y) / (rows + 1);

        let origins: Vec<Origin> = (0..m)
            .map(|i| {
                let (col, row) = (i % cols, i / cols);
                Origin {
                    x: gap_x + col * (core.x + gap_x),
                    y: gap_y + row * (core.y + gap_y),
                }
            })
            .collect();

        debug!(cores = m, cols, rows, "Generated core origins");
        Ok(origins)
    }

    /// Structural checks: frequencies, origin count, bounds and overlap.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let cores = &self.cores;
        if cores.number_of_cores == 0 {
            return Err(SimulationError::InvalidSpecification(
                "at least one core is required".into(),
            ));
        }
        if cores.available_frequencies.is_empty()
            || cores.available_frequencies.iter().any(|f| !(*f > 0.0))
        {
            return Err(SimulationError::InvalidSpecification(
                "available frequencies must be a non-empty list of positive values".into(),
            ));
        }
        if !cores.initial_frequencies.is_empty() {
            SimulationError::check_len(
                "initial core frequencies",
                cores.number_of_cores,
                cores.initial_frequencies.len(),
            )?;
            if let Some(f) = cores
                .initial_frequencies
                .iter()
                .find(|f| !cores.available_frequencies.contains(f))
            {
                return Err(SimulationError::InvalidSpecification(format!(
                    "initial frequency {f} Hz is not an available frequency"
                )));
            }
        }
        if !cores.origins.is_empty() {
            SimulationError::check_len("core origins", cores.number_of_cores, cores.origins.len())?;
        }

        let origins = self.core_origins()?;
        let (cx, cy) = (cores.material.x, cores.material.y);
        for (i, o) in origins.iter().enumerate() {
            if o.x + cx > self.board.x || o.y + cy > self.board.y {
                return Err(SimulationError::InvalidSpecification(format!(
                    "core {i} at ({}, {}) exceeds the {}x{} board",
                    o.x, o.y, self.board.x, self.board.y
                )));
            }
            for (j, p) in origins.iter().enumerate().skip(i + 1) {
                let disjoint =
                    o.x + cx <= p.x || p.x + cx <= o.x || o.y + cy <= p.y || p.y + cy <= o.y;
                if !disjoint {
                    return Err(SimulationError::InvalidSpecification(format!(
                        "cores {i} and {j} overlap"
                    )));
                }
            }
        }
        Ok(())
    }
}

// ── Environment ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSpecification {
    /// Convective heat transfer coefficient, W/(m²·K).
    pub convection_factor: f64,
    /// Ambient temperature, °C.
    pub t_env: f64,
    /// Maximum allowed core temperature, °C.
    pub t_max: f64,
}

impl Default for EnvironmentSpecification {
    fn default() -> Self {
        Self {
            convection_factor: 50.0,
            t_env: 45.0,
            t_max: 110.0,
        }
    }
}

// ── Simulation ────────────────────────────────────────────────────────────────

/// Floating precision of markings and matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimulationPrecision {
    #[default]
    F64,
    /// Values are rounded through `f32` after every update.
    F32,
}

impl SimulationPrecision {
    pub fn quantize(self, value: f64) -> f64 {
        match self {
            SimulationPrecision::F64 => value,
            SimulationPrecision::F32 => value as f32 as f64,
        }
    }

    pub fn quantize_vector(self, v: &mut DVector<f64>) {
        if self == SimulationPrecision::F32 {
            v.apply(|x| *x = *x as f32 as f64);
        }
    }

    pub fn quantize_matrix(self, m: &mut DMatrix<f64>) {
        if self == SimulationPrecision::F32 {
            m.apply(|x| *x = *x as f32 as f64);
        }
    }
}

/// How dynamic power is attributed to executing tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThermalModelKind {
    /// Per-core power from the core's frequency (`α·f³ + β`).
    #[default]
    Frequency,
    /// Per-task power from its energy per cycle times the cycle rate.
    Energy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSpecification {
    /// Simulation step in seconds.
    pub dt: f64,
    /// Side of one thermal mesh cell in metres.
    pub mesh_step: f64,
    /// Micro-steps per `dt` for the processor net.
    pub processor_fragmentation: u32,
    /// Micro-steps per `dt` for the thermal net.
    pub thermal_fragmentation: u32,
    /// Decimal places kept before float comparisons.
    pub float_decimals: u32,
    pub precision: SimulationPrecision,
    pub simulate_thermal: bool,
    pub thermal_model: ThermalModelKind,
    /// Correct invalid policy decisions (with a warning) instead of applying them.
    pub validate_decisions: bool,
    /// Refuse task sets whose utilisation exceeds the core count.
    pub utilization_gate: bool,
}

impl Default for SimulationSpecification {
    fn default() -> Self {
        Self {
            dt: 0.01,
            mesh_step: 0.001,
            processor_fragmentation: 16,
            thermal_fragmentation: 128,
            float_decimals: 5,
            precision: SimulationPrecision::F64,
            simulate_thermal: false,
            thermal_model: ThermalModelKind::Frequency,
            validate_decisions: true,
            utilization_gate: true,
        }
    }
}

impl SimulationSpecification {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.dt > 0.0) || !(self.mesh_step > 0.0) {
            return Err(SimulationError::InvalidSpecification(format!(
                "dt and mesh step must be positive (dt={}, mesh_step={})",
                self.dt, self.mesh_step
            )));
        }
        if self.processor_fragmentation == 0 || self.thermal_fragmentation == 0 {
            return Err(SimulationError::InvalidSpecification(
                "fragmentation factors must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ── GlobalSpecification ───────────────────────────────────────────────────────

/// Complete input of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSpecification {
    pub tasks: TaskSet,
    pub cpu: CpuSpecification,
    pub environment: EnvironmentSpecification,
    pub simulation: SimulationSpecification,
}

impl GlobalSpecification {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.tasks.is_empty() {
            return Err(SimulationError::NoTasks);
        }
        self.cpu.validate()?;
        self.simulation.validate()?;
        if self.simulation.simulate_thermal
            && self.simulation.thermal_model == ThermalModelKind::Energy
        {
            if let Some(t) = self.tasks.iter().find(|t| t.energy_per_cycle.is_none()) {
                return Err(SimulationError::InvalidSpecification(format!(
                    "energy-based thermal model needs an energy per cycle for task {}",
                    t.id
                )));
            }
        }
        Ok(())
    }

    /// Rounded comparison helper using the configured decimal precision.
    pub fn round(&self, value: f64) -> f64 {
        crate::hyperperiod::math::round_to(value, self.simulation.float_decimals)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
