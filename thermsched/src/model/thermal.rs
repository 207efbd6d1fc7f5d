/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Thermal TCPN: a 2-D heat-diffusion mesh of the board with the core meshes
//! stacked on top.
//!
//! # Places
//! ```text
//! [ board cells | core 0 cells | … | core m-1 cells | air | alpha | power (m·n) ]
//! ```
//! Cells are row-major (`y · width + x`).  Markings are temperatures in °C,
//! except `alpha` (constant 1) and the power places, which hold the current
//! allocation of `(task, core)` in `[0, 1]`.
//!
//! # Transitions
//! ```text
//! [ board conduction | core conduction | board↔core | convection | leakage | dynamic power ]
//! ```
//! Every transition has exactly one input place, so `pi` is structural and
//! the net is stepped with the cached matrix-power simulator.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info};

use crate::scheduler::SimulationError;
use crate::specification::{
    EnergyConsumption, GlobalSpecification, MaterialCuboid, Origin, ThermalModelKind,
};
use crate::task::TaskId;
use crate::tcpn::PetriNet;

use super::NetBuilder;

/// Linearisation of the mesh dynamics used by steady-state analysis:
///
/// `Ṫ = a·T + b_env·T_env + b_const + ct·w`
///
/// with `T` the mesh temperatures and `w` the allocation vector
/// (`core · n + task`).
#[derive(Debug, Clone)]
pub struct ThermalOperator {
    pub a: DMatrix<f64>,
    pub b_env: DVector<f64>,
    pub b_const: DVector<f64>,
    pub ct: DMatrix<f64>,
}

#[derive(Debug, Clone)]
pub struct ThermalModel {
    pub net: PetriNet,
    board: MaterialCuboid,
    core: MaterialCuboid,
    cores: usize,
    tasks: usize,
    /// J/K of one core block.
    core_heat_capacity: f64,
    kind: ThermalModelKind,
    energy: EnergyConsumption,
    /// J/cycle per task; zero when unknown.
    task_energy: Vec<f64>,
    base_frequency: f64,
    /// First dynamic-power transition.
    power_transitions: usize,
    /// Cores × tasks, watts at the current frequencies.
    power: DMatrix<f64>,
    frequencies: Vec<f64>,
}

impl ThermalModel {
    pub fn build(spec: &GlobalSpecification) -> Result<Self, SimulationError> {
        let cpu = &spec.cpu;
        let env = &spec.environment;
        let d = spec.simulation.mesh_step;
        let board = cpu.board.clone();
        let core = cpu.cores.material.clone();
        let cores = cpu.number_of_cores();
        let tasks = spec.tasks.len();
        let origins = cpu.core_origins()?;
        SimulationError::check_len("core origins", cores, origins.len())?;

        let mut model = Self {
            net: PetriNet::zeros(0, 0),
            board: board.clone(),
            core: core.clone(),
            cores,
            tasks,
            core_heat_capacity: core.heat_capacity(d),
            kind: spec.simulation.thermal_model,
            energy: cpu.cores.energy,
            task_energy: spec
                .tasks
                .iter()
                .map(|t| t.energy_per_cycle.unwrap_or(0.0))
                .collect(),
            base_frequency: cpu.cores.base_frequency(),
            power_transitions: 0,
            power: DMatrix::zeros(cores, tasks),
            frequencies: cpu.cores.initial_relative_frequencies(),
        };
        model.power = model.power_at(&model.frequencies);

        let mut b = NetBuilder::new(model.places());

        // conduction inside each layer
        add_conduction(&mut b, &board, d, 0);
        for k in 0..cores {
            add_conduction(&mut b, &core, d, model.core_cell(k, 0, 0));
        }

        // vertical exchange between each core cell and the board cell below it
        let g = 2.0 * board.thermal_conductivity * core.thermal_conductivity
            / (core.thermal_conductivity * board.z + board.thermal_conductivity * core.z);
        let lambda_board = g / (board.z * board.density * board.specific_heat_capacity);
        let lambda_core = g / (core.z * core.density * core.specific_heat_capacity);
        for (k, Origin { x: ox, y: oy }) in origins.iter().copied().enumerate() {
            for y in 0..core.y {
                for x in 0..core.x {
                    let below = model.board_cell(ox + x, oy + y);
                    let cell = model.core_cell(k, x, y);
                    b.transition(
                        &[(below, 1.0)],
                        &[(cell, lambda_core / lambda_board)],
                        lambda_board,
                    );
                    b.transition(
                        &[(cell, 1.0)],
                        &[(below, lambda_board / lambda_core)],
                        lambda_core,
                    );
                }
            }
        }

        // convection: every board cell sinks to ambient, air feeds every cell
        let lambda_conv =
            env.convection_factor / (board.z * board.density * board.specific_heat_capacity);
        for cell in 0..board.cells() {
            b.transition(&[(cell, 1.0)], &[], lambda_conv);
        }
        let air = model.air_place();
        let mut air_out: Vec<(usize, f64)> = (0..board.cells()).map(|c| (c, 1.0)).collect();
        air_out.push((air, 1.0));
        b.transition(&[(air, 1.0)], &air_out, lambda_conv);

        // leakage: δ·T + α per core, spread over the core's heat capacity
        let capacity = model.core_heat_capacity;
        for k in 0..cores {
            for cell in model.core_cells(k) {
                b.transition(&[(cell, 1.0)], &[(cell, 2.0)], model.energy.leakage_delta / capacity);
            }
        }
        let alpha = model.alpha_place();
        let mut alpha_out: Vec<(usize, f64)> = (0..cores)
            .flat_map(|k| model.core_cells(k))
            .map(|c| (c, 1.0))
            .collect();
        alpha_out.push((alpha, 1.0));
        b.transition(&[(alpha, 1.0)], &alpha_out, model.energy.leakage_alpha / capacity);

        // dynamic power, one transition per (task, core)
        model.power_transitions = b.transitions();
        for k in 0..cores {
            for task in 0..tasks {
                let p = model.power_place(task, k);
                let mut out: Vec<(usize, f64)> = model
                    .core_cells(k)
                    .map(|c| (c, model.power[(k, task)] / capacity))
                    .collect();
                out.push((p, 1.0));
                b.transition(&[(p, 1.0)], &out, model.frequencies[k]);
            }
        }

        let mut mo = DVector::zeros(model.places());
        for p in 0..model.mesh_places() {
            mo[p] = env.t_env;
        }
        mo[air] = env.t_env;
        mo[alpha] = 1.0;

        let mut net = b.build(mo)?;
        let precision = spec.simulation.precision;
        precision.quantize_matrix(&mut net.pre);
        precision.quantize_matrix(&mut net.post);
        precision.quantize_vector(&mut net.lambda);
        model.net = net;

        info!(
            places = model.net.places(),
            transitions = model.net.transitions(),
            board_cells = board.cells(),
            core_cells = core.cells(),
            cores,
            "Thermal model built"
        );
        Ok(model)
    }

    // ── Layout ────────────────────────────────────────────────────────────────

    pub fn cores(&self) -> usize {
        self.cores
    }

    pub fn tasks(&self) -> usize {
        self.tasks
    }

    pub fn board_places(&self) -> usize {
        self.board.cells()
    }

    /// Board plus all core cells.
    pub fn mesh_places(&self) -> usize {
        self.board.cells() + self.cores * self.core.cells()
    }

    pub fn places(&self) -> usize {
        self.mesh_places() + 2 + self.cores * self.tasks
    }

    pub fn air_place(&self) -> usize {
        self.mesh_places()
    }

    pub fn alpha_place(&self) -> usize {
        self.mesh_places() + 1
    }

    pub fn power_place(&self, task: TaskId, core: usize) -> usize {
        self.mesh_places() + 2 + core * self.tasks + task
    }

    pub fn board_cell(&self, x: usize, y: usize) -> usize {
        y * self.board.x + x
    }

    pub fn core_cell(&self, core: usize, x: usize, y: usize) -> usize {
        self.board.cells() + core * self.core.cells() + y * self.core.x + x
    }

    fn core_cells(&self, core: usize) -> std::ops::Range<usize> {
        let start = self.core_cell(core, 0, 0);
        start..start + self.core.cells()
    }

    /// Cell read as "the" temperature of a core.
    pub fn core_center_place(&self, core: usize) -> usize {
        self.core_cell(core, self.core.x / 2, self.core.y / 2)
    }

    // ── Power ─────────────────────────────────────────────────────────────────

    /// Dynamic power (W) of every `(core, task)` pair at the current
    /// frequencies.
    pub fn power_matrix(&self) -> &DMatrix<f64> {
        &self.power
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Dynamic power matrix (cores × tasks) at the given relative frequencies.
    pub fn power_at(&self, frequencies: &[f64]) -> DMatrix<f64> {
        DMatrix::from_fn(self.cores, self.tasks, |k, task| {
            let f = frequencies.get(k).copied().unwrap_or(1.0);
            match self.kind {
                ThermalModelKind::Frequency => self.energy.dynamic_power(f),
                ThermalModelKind::Energy => self.task_energy[task] * f * self.base_frequency,
            }
        })
    }

    /// Re-weight the dynamic-power transitions for new relative core
    /// frequencies.  Updates `net.post` and `net.lambda` in place.
    pub fn apply_frequencies(&mut self, frequencies: &[f64]) -> Result<(), SimulationError> {
        SimulationError::check_len("core frequencies", self.cores, frequencies.len())?;
        self.power = self.power_at(frequencies);
        self.frequencies = frequencies.to_vec();

        for k in 0..self.cores {
            for task in 0..self.tasks {
                let t = self.power_transitions + k * self.tasks + task;
                let weight = self.power[(k, task)] / self.core_heat_capacity;
                for cell in self.core_cells(k) {
                    self.net.post[(cell, t)] = weight;
                }
                self.net.lambda[t] = frequencies[k];
            }
        }
        debug!(?frequencies, "Thermal power transitions re-weighted");
        Ok(())
    }

    // ── Read-out ──────────────────────────────────────────────────────────────

    pub fn board_temperatures(&self, mo: &DVector<f64>) -> Vec<f64> {
        mo.rows(0, self.board.cells()).iter().copied().collect()
    }

    pub fn core_temperatures(&self, mo: &DVector<f64>) -> Vec<f64> {
        (0..self.cores).map(|k| mo[self.core_center_place(k)]).collect()
    }

    /// Mesh temperatures (board and core cells) of a marking.
    pub fn mesh_temperatures(&self, mo: &DVector<f64>) -> DVector<f64> {
        mo.rows(0, self.mesh_places()).into_owned()
    }

    // ── Steady state ──────────────────────────────────────────────────────────

    /// Linear operator of the mesh at the current weights, read from
    /// `C·diag(lambda)·pi`.
    pub fn linear_operator(&self) -> ThermalOperator {
        let mesh = self.mesh_places();
        let mut weighted = self.net.incidence();
        for (j, mut col) in weighted.column_iter_mut().enumerate() {
            col *= self.net.lambda[j];
        }
        let full = &weighted * &self.net.pi;

        let first_power = self.power_place(0, 0);
        ThermalOperator {
            a: full.view((0, 0), (mesh, mesh)).into_owned(),
            b_env: full.column(self.air_place()).rows(0, mesh).into_owned(),
            b_const: full.column(self.alpha_place()).rows(0, mesh).into_owned(),
            ct: full
                .view((0, first_power), (mesh, self.cores * self.tasks))
                .into_owned(),
        }
    }

    /// Selector `S_T` (cores × mesh) picking each core's center cell.
    pub fn core_selector(&self) -> DMatrix<f64> {
        let mut s = DMatrix::zeros(self.cores, self.mesh_places());
        for k in 0..self.cores {
            s[(k, self.core_center_place(k))] = 1.0;
        }
        s
    }
}

/// Four-neighbour conduction inside one layer whose first cell is `offset`.
fn add_conduction(b: &mut NetBuilder, layer: &MaterialCuboid, d: f64, offset: usize) {
    let lambda =
        layer.thermal_conductivity / (layer.density * layer.specific_heat_capacity * d * d);
    let cell = |x: usize, y: usize| offset + y * layer.x + x;
    let mut pairs = 0usize;
    for y in 0..layer.y {
        for x in 0..layer.x {
            let here = cell(x, y);
            let mut neighbours = Vec::with_capacity(2);
            if x + 1 < layer.x {
                neighbours.push(cell(x + 1, y));
            }
            if y + 1 < layer.y {
                neighbours.push(cell(x, y + 1));
            }
            for there in neighbours {
                b.transition(&[(here, 1.0)], &[(there, 1.0)], lambda);
                b.transition(&[(there, 1.0)], &[(here, 1.0)], lambda);
                pairs += 1;
            }
        }
    }
    debug!(offset, pairs, lambda, "Conduction layer added");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::SimulationPrecision;
    use crate::tcpn::{MatrixPowerSimulator, TcpnSimulator};
    use crate::testutil;

    fn model() -> (GlobalSpecification, ThermalModel) {
        let spec = testutil::thermal_scenario();
        let model = ThermalModel::build(&spec).unwrap();
        (spec, model)
    }

    // ── layout ────────────────────────────────────────────────────────────────

    #[test]
    fn place_count_matches_layout() {
        let (spec, m) = model();
        let board = spec.cpu.board.cells();
        let cores = spec.cpu.number_of_cores();
        let core_cells = spec.cpu.cores.material.cells();
        assert_eq!(m.mesh_places(), board + cores * core_cells);
        assert_eq!(m.net.places(), m.mesh_places() + 2 + cores * spec.tasks.len());
        assert_eq!(m.air_place(), m.mesh_places());
    }

    #[test]
    fn initial_marking_is_ambient() {
        let (spec, m) = model();
        let t_env = spec.environment.t_env;
        assert!(m.mesh_temperatures(&m.net.mo).iter().all(|&t| t == t_env));
        assert_eq!(m.net.mo[m.alpha_place()], 1.0);
        assert_eq!(m.net.mo[m.power_place(0, 0)], 0.0);
    }

    #[test]
    fn every_transition_has_one_input_place() {
        let (_, m) = model();
        for t in 0..m.net.transitions() {
            let inputs = m.net.pre.column(t).iter().filter(|&&w| w != 0.0).count();
            assert_eq!(inputs, 1, "transition {t}");
        }
    }

    #[test]
    fn core_center_is_inside_core_block() {
        let (_, m) = model();
        let c = m.core_center_place(1);
        assert!(m.core_cells(1).contains(&c));
    }

    // ── dynamics ──────────────────────────────────────────────────────────────

    #[test]
    fn idle_chip_without_leakage_stays_at_ambient() {
        let (spec, m) = model();
        let mut sim = MatrixPowerSimulator::new(&m.net, 0.01, 128, SimulationPrecision::F64).unwrap();
        let mut mo = m.net.mo.clone();
        for _ in 0..50 {
            mo = sim.simulate_step(&mo);
        }
        for t in m.mesh_temperatures(&mo).iter() {
            assert!((t - spec.environment.t_env).abs() < 1e-6, "drifted to {t}");
        }
    }

    #[test]
    fn executing_core_heats_up_more_than_idle_core() {
        let (_, m) = model();
        let mut sim = MatrixPowerSimulator::new(&m.net, 0.01, 128, SimulationPrecision::F64).unwrap();
        let mut mo = m.net.mo.clone();
        mo[m.power_place(0, 0)] = 1.0;
        for _ in 0..20 {
            mo = sim.simulate_step(&mo);
        }
        let cores = m.core_temperatures(&mo);
        assert!(cores[0] > cores[1], "{cores:?}");
        assert!(cores[0].is_finite());
    }

    // ── frequencies ───────────────────────────────────────────────────────────

    #[test]
    fn frequency_model_uses_cubic_power() {
        let (spec, mut m) = model();
        m.apply_frequencies(&[0.5, 1.0]).unwrap();
        let e = spec.cpu.cores.energy;
        assert!((m.power_matrix()[(0, 0)] - e.dynamic_power(0.5)).abs() < 1e-12);
        assert!((m.power_matrix()[(1, 0)] - e.dynamic_power(1.0)).abs() < 1e-12);
        assert_eq!(m.net.lambda[m.power_transitions], 0.5);
    }

    #[test]
    fn energy_model_scales_with_cycle_rate() {
        let mut spec = testutil::thermal_scenario();
        spec.simulation.thermal_model = ThermalModelKind::Energy;
        let spec = testutil::with_energy_per_cycle(spec, 1e-3);
        let m = ThermalModel::build(&spec).unwrap();
        let base = spec.cpu.cores.base_frequency();
        let p = m.power_at(&[0.5, 1.0]);
        assert!((p[(0, 0)] - 1e-3 * 0.5 * base).abs() < 1e-9);
    }

    #[test]
    fn apply_frequencies_checks_length() {
        let (_, mut m) = model();
        assert!(m.apply_frequencies(&[1.0]).is_err());
    }

    // ── operator ──────────────────────────────────────────────────────────────

    #[test]
    fn ambient_is_an_equilibrium_of_the_operator() {
        let (spec, m) = model();
        let op = m.linear_operator();
        let t_env = spec.environment.t_env;
        let t = DVector::from_element(m.mesh_places(), t_env);
        // no leakage in the fixture, so ambient with zero allocation is steady
        let rate = &op.a * &t + &op.b_env * t_env + &op.b_const;
        assert!(rate.amax() < 1e-6, "max drift {}", rate.amax());
    }

    #[test]
    fn operator_input_columns_only_touch_own_core() {
        let (_, m) = model();
        let op = m.linear_operator();
        let col = op.ct.column(0);
        for cell in m.core_cells(1) {
            assert_eq!(col[cell], 0.0);
        }
        assert!(col[m.core_center_place(0)] > 0.0);
    }

    #[test]
    fn core_selector_picks_center_cells() {
        let (_, m) = model();
        let s = m.core_selector();
        assert_eq!(s.nrows(), 2);
        assert_eq!(s[(1, m.core_center_place(1))], 1.0);
        assert_eq!(s.row(0).sum(), 1.0);
    }
}
