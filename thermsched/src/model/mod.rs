/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! TCPN model builders.
//!
//! Pure functions from the scenario to the nets the solver integrates:
//!
//! ```text
//! GlobalModel
//! ├── task net        tasks.rs (arrival / remaining-cycles places)
//! ├── processor net   processor.rs (busy / exec / idle places per core)
//! └── thermal net     thermal.rs (board + core meshes, air, leakage, power)
//! ```
//!
//! # Processor layout
//! The task and processor nets share one place vector:
//! `[p_w (periodic) | p_cc (all tasks) | core 0 | core 1 | …]` where each
//! core block is `[busy × n | exec × n | idle]`.  Each net only has arcs on
//! its own places.
//!
//! Task net transitions: `[t_w (periodic) | t_cc (n·m)]`.
//! Processor net transitions: `[t_alloc (n·m) | t_exec (n·m)]`.
//! Every `n·m` block is ordered `core · n + task`, the same order as the
//! engine's allocation vector.

pub mod processor;
pub mod tasks;
pub mod thermal;

pub use thermal::{ThermalModel, ThermalOperator};

use nalgebra::{DMatrix, DVector};
use tracing::info;

use crate::scheduler::SimulationError;
use crate::specification::GlobalSpecification;
use crate::task::TaskId;
use crate::tcpn::PetriNet;

// ── ProcessorLayout ───────────────────────────────────────────────────────────

/// Index arithmetic of the processor net.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorLayout {
    pub periodic: usize,
    pub aperiodic: usize,
    pub cores: usize,
}

impl ProcessorLayout {
    pub fn new(periodic: usize, aperiodic: usize, cores: usize) -> Self {
        Self {
            periodic,
            aperiodic,
            cores,
        }
    }

    pub fn tasks(&self) -> usize {
        self.periodic + self.aperiodic
    }

    /// `p_w` and `p_cc` places.
    pub fn task_places(&self) -> usize {
        self.periodic + self.tasks()
    }

    pub fn places(&self) -> usize {
        self.task_places() + self.cores * (2 * self.tasks() + 1)
    }

    /// Transitions of the processor net.
    pub fn transitions(&self) -> usize {
        2 * self.allocations()
    }

    /// Transitions of the task net.
    pub fn task_transitions(&self) -> usize {
        self.periodic + self.allocations()
    }

    /// Length of the allocation vector (`tasks × cores`).
    pub fn allocations(&self) -> usize {
        self.tasks() * self.cores
    }

    /// Position of `(task, core)` in the allocation vector.
    pub fn alloc_index(&self, task: TaskId, core: usize) -> usize {
        core * self.tasks() + task
    }

    pub fn waiting_place(&self, periodic_task: TaskId) -> usize {
        periodic_task
    }

    pub fn cycles_place(&self, task: TaskId) -> usize {
        self.periodic + task
    }

    fn core_base(&self, core: usize) -> usize {
        self.task_places() + core * (2 * self.tasks() + 1)
    }

    pub fn busy_place(&self, task: TaskId, core: usize) -> usize {
        self.core_base(core) + task
    }

    pub fn exec_place(&self, task: TaskId, core: usize) -> usize {
        self.core_base(core) + self.tasks() + task
    }

    pub fn idle_place(&self, core: usize) -> usize {
        self.core_base(core) + 2 * self.tasks()
    }

    pub fn arrival_transition(&self, periodic_task: TaskId) -> usize {
        periodic_task
    }

    /// Task-net transition draining `p_cc` of `task` while it runs on `core`.
    pub fn consume_transition(&self, task: TaskId, core: usize) -> usize {
        self.periodic + self.alloc_index(task, core)
    }

    pub fn alloc_transition(&self, task: TaskId, core: usize) -> usize {
        self.alloc_index(task, core)
    }

    pub fn exec_transition(&self, task: TaskId, core: usize) -> usize {
        self.allocations() + self.alloc_index(task, core)
    }
}

/// Rate of the allocation/execution transitions for a step `dt` split in
/// `fragmentation` micro-steps.  Keeps `rate · f · dt / k ≤ 1/2`.
pub fn processor_rate(dt: f64, fragmentation: u32) -> f64 {
    fragmentation.max(1) as f64 / (2.0 * dt)
}

// ── NetBuilder ────────────────────────────────────────────────────────────────

/// Incremental construction of a net transition by transition.
#[derive(Debug, Default)]
pub(crate) struct NetBuilder {
    places: usize,
    pre: Vec<(usize, usize, f64)>,
    post: Vec<(usize, usize, f64)>,
    lambda: Vec<f64>,
}

impl NetBuilder {
    pub(crate) fn new(places: usize) -> Self {
        Self {
            places,
            ..Default::default()
        }
    }

    /// Append a transition and return its index.
    pub(crate) fn transition(
        &mut self,
        inputs: &[(usize, f64)],
        outputs: &[(usize, f64)],
        rate: f64,
    ) -> usize {
        let t = self.lambda.len();
        self.pre.extend(inputs.iter().map(|&(p, w)| (p, t, w)));
        self.post.extend(outputs.iter().map(|&(p, w)| (p, t, w)));
        self.lambda.push(rate);
        t
    }

    pub(crate) fn transitions(&self) -> usize {
        self.lambda.len()
    }

    /// Dense net with `pi = structural_pi(Pre)`.
    pub(crate) fn build(self, mo: DVector<f64>) -> Result<PetriNet, SimulationError> {
        let t = self.lambda.len();
        let mut pre = DMatrix::zeros(self.places, t);
        let mut post = DMatrix::zeros(self.places, t);
        for (p, j, w) in self.pre {
            pre[(p, j)] += w;
        }
        for (p, j, w) in self.post {
            post[(p, j)] += w;
        }
        let pi = PetriNet::structural_pi(&pre);
        PetriNet::new(pre, post, pi, DVector::from_vec(self.lambda), mo)
    }
}

// ── GlobalModel ───────────────────────────────────────────────────────────────

/// All nets of a scenario.
#[derive(Debug, Clone)]
pub struct GlobalModel {
    pub layout: ProcessorLayout,
    /// Arrivals and remaining work; transitions compete for `p_cc`.
    pub tasks: PetriNet,
    /// Allocation and execution; constant priorities.
    pub processor: PetriNet,
    /// `None` when thermal simulation is off.
    pub thermal: Option<ThermalModel>,
}

impl GlobalModel {
    pub fn build(spec: &GlobalSpecification) -> Result<Self, SimulationError> {
        let layout = ProcessorLayout::new(
            spec.tasks.periodic().len(),
            spec.tasks.aperiodic().len(),
            spec.cpu.number_of_cores(),
        );
        let sim = &spec.simulation;
        let rate = processor_rate(sim.dt, sim.processor_fragmentation);

        let mut task_net = PetriNet::zeros(layout.places(), layout.task_transitions());
        tasks::add_tasks_model(
            &mut task_net,
            &layout,
            &spec.tasks,
            spec.cpu.cores.base_frequency(),
        )?;
        let mut processor = PetriNet::zeros(layout.places(), layout.transitions());
        processor::add_processor_model(&mut processor, &layout, rate)?;
        for net in [&mut task_net, &mut processor] {
            sim.precision.quantize_matrix(&mut net.pre);
            sim.precision.quantize_matrix(&mut net.post);
            sim.precision.quantize_vector(&mut net.lambda);
            sim.precision.quantize_vector(&mut net.mo);
            net.check_shapes()?;
        }

        let thermal = if sim.simulate_thermal {
            Some(ThermalModel::build(spec)?)
        } else {
            None
        };

        info!(
            task_transitions = task_net.transitions(),
            processor_places = processor.places(),
            processor_transitions = processor.transitions(),
            thermal_places = thermal.as_ref().map(|t| t.net.places()),
            "Global model built"
        );

        Ok(Self {
            layout,
            tasks: task_net,
            processor,
            thermal,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
