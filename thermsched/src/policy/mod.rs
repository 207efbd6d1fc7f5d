/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduling policies.
//!
//! A policy is plugged into the engine as a `Box<dyn SchedulingPolicy>` and
//! is called at three points:
//!
//! ```text
//! setup ──► offline_stage()  → quantum
//! loop  ──► schedule_policy() at every scheduling point → Decision
//!       └─► aperiodic_arrive() when an aperiodic job is released
//! ```
//!
//! Policies keep whatever private state they need across calls; everything
//! the engine passes in is a read-only snapshot.
//!
//! | Name | Policy |
//! |---|---|
//! | `G-EDF` | Global EDF |
//! | `G-EDF-A` | Global EDF with core affinity |
//! | `JDEDS` | LP-based interval partitioning with DVFS |
//! | `OLDTFS` | Thermal-aware fluid schedule with sliding-mode discretisation |

pub mod edf;
pub mod jdeds;
pub mod lp;
pub mod oldtfs;

pub use edf::GlobalEdf;
pub use jdeds::Jdeds;
pub use oldtfs::Oldtfs;

use crate::scheduler::SimulationError;
use crate::specification::GlobalSpecification;
use crate::task::{JobState, Task, TaskId};

// ── Call context ──────────────────────────────────────────────────────────────

/// Snapshot handed to [`SchedulingPolicy::schedule_policy`].
#[derive(Debug, Clone, Copy)]
pub struct ScheduleContext<'a> {
    /// Current time in seconds.
    pub time: f64,
    /// Jobs that are released and still have pending cycles.
    pub executable: &'a [JobState],
    /// Task running on each core during the previous step.
    pub active: &'a [Option<TaskId>],
    /// Relative frequency of each core.
    pub frequencies: &'a [f64],
    /// Core temperatures, when thermal simulation is on.
    pub temperatures: Option<&'a [f64]>,
}

/// What to run until the next scheduling point.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// One entry per core; `None` idles the core.
    pub assignment: Vec<Option<TaskId>>,
    /// Seconds until the policy wants to be called again.  `None` keeps the
    /// quantum returned by the offline stage.
    pub next_quantum: Option<f64>,
    /// Relative frequency of each core.  `None` keeps the current ones.
    pub frequencies: Option<Vec<f64>>,
}

impl Decision {
    pub fn new(assignment: Vec<Option<TaskId>>) -> Self {
        Self {
            assignment,
            next_quantum: None,
            frequencies: None,
        }
    }

    pub fn with_next_quantum(mut self, seconds: f64) -> Self {
        self.next_quantum = Some(seconds);
        self
    }

    pub fn with_frequencies(mut self, frequencies: Vec<f64>) -> Self {
        self.frequencies = Some(frequencies);
        self
    }
}

// ── Policy contract ───────────────────────────────────────────────────────────

pub trait SchedulingPolicy {
    /// Registry name, used in logs and results.
    fn name(&self) -> &'static str;

    /// Structural pre-check run before anything is simulated.
    ///
    /// Returns `(false, Some(reason))` when the policy cannot handle the
    /// scenario at all.
    fn check_schedulability(&self, _spec: &GlobalSpecification) -> (bool, Option<String>) {
        (true, None)
    }

    /// Pre-computation before the loop.  Returns the scheduling quantum in
    /// seconds.
    ///
    /// # Errors
    /// [`SimulationError::OfflineInfeasible`] (or a wrapped solver failure)
    /// aborts the run.
    fn offline_stage(
        &mut self,
        spec: &GlobalSpecification,
        periodic: &[Task],
        aperiodic: &[Task],
    ) -> Result<f64, SimulationError>;

    /// Decide the assignment at a scheduling point.
    fn schedule_policy(&mut self, ctx: &ScheduleContext<'_>) -> Decision;

    /// Notification that aperiodic jobs were released at `time`.  Returning
    /// `true` forces a scheduling point in the current step.
    fn aperiodic_arrive(
        &mut self,
        time: f64,
        arrived: &[JobState],
        frequencies: &[f64],
        temperatures: Option<&[f64]>,
    ) -> bool;
}

// ── Registry ──────────────────────────────────────────────────────────────────

type PolicyFactory = fn() -> Box<dyn SchedulingPolicy>;

fn global_edf() -> Box<dyn SchedulingPolicy> {
    Box::new(GlobalEdf::new())
}

fn global_edf_affinity() -> Box<dyn SchedulingPolicy> {
    Box::new(GlobalEdf::with_affinity())
}

fn jdeds() -> Box<dyn SchedulingPolicy> {
    Box::new(Jdeds::new())
}

fn oldtfs() -> Box<dyn SchedulingPolicy> {
    Box::new(Oldtfs::new())
}

const REGISTRY: &[(&str, PolicyFactory)] = &[
    ("G-EDF", global_edf),
    ("G-EDF-A", global_edf_affinity),
    ("JDEDS", jdeds),
    ("OLDTFS", oldtfs),
];

/// Instantiate the policy registered under `name`.
///
/// # Errors
/// [`SimulationError::UnknownPolicy`] for a name not in the registry.
pub fn create_policy(name: &str) -> Result<Box<dyn SchedulingPolicy>, SimulationError> {
    REGISTRY
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, factory)| factory())
        .ok_or_else(|| SimulationError::UnknownPolicy(name.to_string()))
}

/// Names of every registered policy.
pub fn available_policies() -> Vec<&'static str> {
    REGISTRY.iter().map(|(n, _)| *n).collect()
}

// ── Helpers shared by the policies ────────────────────────────────────────────

/// Keep tasks on the core they ran on during the previous step.
///
/// For each core whose previous task is selected elsewhere, the two entries
/// are swapped.  Idle previous slots are ignored.
pub(crate) fn apply_affinity(assignment: &mut [Option<TaskId>], active: &[Option<TaskId>]) {
    for (core, prev) in active.iter().enumerate().take(assignment.len()) {
        let Some(prev) = prev else { continue };
        if let Some(pos) = assignment.iter().position(|a| *a == Some(*prev)) {
            if pos != core {
                assignment.swap(pos, core);
            }
        }
    }
}

/// Pad (or cut) `selected` to one entry per core.
pub(crate) fn fill_idle(mut selected: Vec<Option<TaskId>>, cores: usize) -> Vec<Option<TaskId>> {
    selected.resize(cores, None);
    selected
}

// ── Tests ─────────────────────────────────────────────────────────────────────
