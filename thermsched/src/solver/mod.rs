/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Coupled processor/thermal stepping.
//!
//! [`GlobalModelSolver`] owns the simulators and their markings.  The
//! engine hands it one allocation vector and the core frequencies per step
//! and reads back accumulated execution, temperatures and energy.
//!
//! ```text
//! w_alloc, f ──► task net (marking-dependent)  ──► remaining work in p_cc
//!            ├─► processor net (matrix power)  ──► Δexec / f ──► accumulated_exec
//!            └─► thermal net (matrix power)    ──► board / core-center temperatures
//! ```
//!
//! The task and processor nets share one marking and touch disjoint places,
//! so stepping one after the other equals stepping them together.  The
//! processor step matrix is only rebuilt when `(w_alloc, f)` changes.

use nalgebra::DVector;
use tracing::{debug, trace};

use crate::model::{GlobalModel, ProcessorLayout, ThermalModel};
use crate::scheduler::SimulationError;
use crate::specification::GlobalSpecification;
use crate::task::TaskId;
use crate::tcpn::{MarkingDependentSimulator, MatrixPowerSimulator, TcpnSimulator};

/// Observables of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// Seconds executed so far per `(task, core)`, ordered `core · n + task`.
    pub accumulated_exec: DVector<f64>,
    /// One temperature per board cell, row-major.
    pub board_temperature: Option<Vec<f64>>,
    /// Center-cell temperature of each core.
    pub cores_temperature: Option<Vec<f64>>,
    /// Dynamic energy (J) drawn by each core during the step.
    pub energy_consumption: Option<Vec<f64>>,
}

#[derive(Debug, Clone)]
struct ThermalState {
    model: ThermalModel,
    sim: MatrixPowerSimulator,
    mo: DVector<f64>,
}

#[derive(Debug, Clone)]
pub struct GlobalModelSolver {
    layout: ProcessorLayout,
    arrivals: MarkingDependentSimulator,
    processor: MatrixPowerSimulator,
    processor_mo: DVector<f64>,
    thermal: Option<ThermalState>,
    accumulated_exec: DVector<f64>,
    frequencies: Vec<f64>,
    dt: f64,
}

impl GlobalModelSolver {
    pub fn new(model: GlobalModel, spec: &GlobalSpecification) -> Result<Self, SimulationError> {
        let sim = &spec.simulation;
        let arrivals = MarkingDependentSimulator::new(
            &model.tasks,
            sim.dt,
            sim.processor_fragmentation,
            sim.precision,
        )?;
        let processor = MatrixPowerSimulator::new(
            &model.processor,
            sim.dt,
            sim.processor_fragmentation,
            sim.precision,
        )?;
        SimulationError::check_len(
            "task net marking",
            model.processor.places(),
            model.tasks.places(),
        )?;
        let mut processor_mo = model.processor.mo.clone();
        for p in 0..model.layout.task_places() {
            processor_mo[p] = model.tasks.mo[p];
        }

        let thermal = match model.thermal {
            Some(thermal) => {
                let sim = MatrixPowerSimulator::new(
                    &thermal.net,
                    sim.dt,
                    sim.thermal_fragmentation,
                    sim.precision,
                )?;
                let mo = thermal.net.mo.clone();
                Some(ThermalState {
                    model: thermal,
                    sim,
                    mo,
                })
            }
            None => None,
        };

        debug!(
            allocations = model.layout.allocations(),
            thermal = thermal.is_some(),
            "Global model solver ready"
        );

        Ok(Self {
            layout: model.layout,
            arrivals,
            processor,
            processor_mo,
            thermal,
            accumulated_exec: DVector::zeros(model.layout.allocations()),
            frequencies: spec.cpu.cores.initial_relative_frequencies(),
            dt: sim.dt,
        })
    }

    /// Advance both nets by one step.
    ///
    /// `w_alloc` has one entry per `(task, core)` (`core · n + task`) in
    /// `[0, 1]`; `frequencies` are relative to the base frequency.
    ///
    /// # Errors
    /// [`SimulationError::ShapeMismatch`] when either slice has the wrong
    /// length.
    pub fn run_step(
        &mut self,
        w_alloc: &[f64],
        frequencies: &[f64],
    ) -> Result<StepOutput, SimulationError> {
        let l = self.layout;
        SimulationError::check_len("allocation vector", l.allocations(), w_alloc.len())?;
        SimulationError::check_len("core frequencies", l.cores, frequencies.len())?;

        let mut control = DVector::zeros(l.transitions());
        let mut consume = DVector::from_element(l.task_transitions(), 1.0);
        for core in 0..l.cores {
            for task in 0..l.tasks() {
                let w = w_alloc[l.alloc_index(task, core)];
                control[l.alloc_transition(task, core)] = w * frequencies[core];
                control[l.exec_transition(task, core)] = frequencies[core];
                consume[l.consume_transition(task, core)] = w * frequencies[core];
            }
        }
        self.processor.set_control(&control)?;
        self.arrivals.set_control(&consume)?;

        let next = self.processor.simulate_step(&self.processor_mo);
        let next = self.arrivals.simulate_step(&next);
        for core in 0..l.cores {
            let f = frequencies[core];
            if f <= 0.0 {
                continue;
            }
            for task in 0..l.tasks() {
                let place = l.exec_place(task, core);
                let delta = next[place] - self.processor_mo[place];
                self.accumulated_exec[l.alloc_index(task, core)] += delta.max(0.0) / f;
            }
        }
        self.processor_mo = next;

        let mut output = StepOutput {
            accumulated_exec: self.accumulated_exec.clone(),
            board_temperature: None,
            cores_temperature: None,
            energy_consumption: None,
        };

        if let Some(thermal) = self.thermal.as_mut() {
            if frequencies != self.frequencies.as_slice() {
                thermal.model.apply_frequencies(frequencies)?;
                thermal
                    .sim
                    .set_post_and_lambda(&thermal.model.net.post, &thermal.model.net.lambda)?;
            }
            for core in 0..l.cores {
                for task in 0..l.tasks() {
                    let place = thermal.model.power_place(task, core);
                    thermal.mo[place] = w_alloc[l.alloc_index(task, core)];
                }
            }
            thermal.mo = thermal.sim.simulate_step(&thermal.mo);

            let power = thermal.model.power_matrix();
            let energy: Vec<f64> = (0..l.cores)
                .map(|core| {
                    (0..l.tasks())
                        .map(|task| w_alloc[l.alloc_index(task, core)] * power[(core, task)])
                        .sum::<f64>()
                        * self.dt
                })
                .collect();

            output.board_temperature = Some(thermal.model.board_temperatures(&thermal.mo));
            output.cores_temperature = Some(thermal.model.core_temperatures(&thermal.mo));
            output.energy_consumption = Some(energy);
        }

        self.frequencies = frequencies.to_vec();
        trace!(exec = ?output.accumulated_exec.as_slice(), "Solver step");
        Ok(output)
    }

    pub fn layout(&self) -> &ProcessorLayout {
        &self.layout
    }

    pub fn accumulated_exec(&self) -> &DVector<f64> {
        &self.accumulated_exec
    }

    /// Shared marking of the task and processor nets.
    pub fn processor_marking(&self) -> &DVector<f64> {
        &self.processor_mo
    }

    /// Seconds of base-frequency work left in `p_cc` of `task`.
    pub fn remaining_work(&self, task: TaskId) -> f64 {
        self.processor_mo[self.layout.cycles_place(task)]
    }

    /// Times the processor step matrix has been built.
    pub fn processor_recomputations(&self) -> usize {
        self.processor.recomputations()
    }

    pub fn thermal_model(&self) -> Option<&ThermalModel> {
        self.thermal.as_ref().map(|t| &t.model)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
