/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Task and job data structures for the simulator.
//!
//! Two distinct types model the two sides of a simulation run:
//!
//! ```text
//! scenario ──►  Task (immutable)  ──(engine setup)──►  JobState (engine-owned, per step)
//!                 ↑ spec                                 ↑ arrival / deadline / pending
//! ```
//!
//! # Ownership model
//! A [`TaskSet`] is built once from the scenario and never mutated.  Ids are
//! assigned at construction (periodic tasks first, then aperiodic ones) and are
//! stable for the run: the id is the row index of the task in every
//! allocation vector and the index of its [`JobState`] in the engine's arena.

use crate::scheduler::SimulationError;

/// Stable task identifier.  Index into every per-task table of a run.
pub type TaskId = usize;

// ── Task kind ─────────────────────────────────────────────────────────────────

/// Activation pattern of a task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskKind {
    /// Released at `0, period, 2·period, …` with a relative `deadline`.
    Periodic { period: f64, deadline: f64 },

    /// Released once at `arrival` with an absolute `deadline`.
    ///
    /// The engine renews aperiodic jobs every hyperperiod.
    Aperiodic { arrival: f64, deadline: f64 },
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// Immutable task specification.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    // ── Identity ──────────────────────────────────────────────────────────────
    /// Assigned by [`TaskSet::new`]; any value given before that is replaced.
    pub id: TaskId,

    /// Human readable name, only used in logs.
    pub name: String,

    // ── Demand ────────────────────────────────────────────────────────────────
    /// Worst-case execution cycles.
    pub cycles: f64,

    /// Energy drawn per executed cycle, in joules.  Needed by the
    /// energy-based thermal model only.
    pub energy_per_cycle: Option<f64>,

    // ── Timing ────────────────────────────────────────────────────────────────
    pub kind: TaskKind,
}

impl Task {
    /// Periodic task with a relative deadline.
    pub fn periodic(cycles: f64, period: f64, deadline: f64) -> Self {
        Self {
            id: 0,
            name: String::new(),
            cycles,
            energy_per_cycle: None,
            kind: TaskKind::Periodic { period, deadline },
        }
    }

    /// Aperiodic task released at `arrival` with an absolute `deadline`.
    pub fn aperiodic(cycles: f64, arrival: f64, deadline: f64) -> Self {
        Self {
            id: 0,
            name: String::new(),
            cycles,
            energy_per_cycle: None,
            kind: TaskKind::Aperiodic { arrival, deadline },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_energy_per_cycle(mut self, energy: f64) -> Self {
        self.energy_per_cycle = Some(energy);
        self
    }

    pub fn is_periodic(&self) -> bool {
        matches!(self.kind, TaskKind::Periodic { .. })
    }

    /// Period for periodic tasks, `None` for aperiodic ones.
    pub fn period(&self) -> Option<f64> {
        match self.kind {
            TaskKind::Periodic { period, .. } => Some(period),
            TaskKind::Aperiodic { .. } => None,
        }
    }

    /// Release time of the first job.
    pub fn first_arrival(&self) -> f64 {
        match self.kind {
            TaskKind::Periodic { .. } => 0.0,
            TaskKind::Aperiodic { arrival, .. } => arrival,
        }
    }

    /// Absolute deadline of the first job.
    pub fn first_deadline(&self) -> f64 {
        match self.kind {
            TaskKind::Periodic { deadline, .. } => deadline,
            TaskKind::Aperiodic { deadline, .. } => deadline,
        }
    }

    /// Execution time in seconds when running at `base_frequency` (Hz).
    pub fn execution_time(&self, base_frequency: f64) -> f64 {
        self.cycles / base_frequency
    }

    /// Processor utilisation `c / (f_base · T)`.
    ///
    /// Aperiodic tasks contribute `0.0`: they carry no long-run rate.
    pub fn utilization(&self, base_frequency: f64) -> f64 {
        match self.kind {
            TaskKind::Periodic { period, .. } if period > 0.0 => {
                self.execution_time(base_frequency) / period
            }
            _ => 0.0,
        }
    }

    fn validate(&self) -> Result<(), SimulationError> {
        if !(self.cycles > 0.0) {
            return Err(SimulationError::InvalidSpecification(format!(
                "task {} must have a positive cycle count, got {}",
                self.id, self.cycles
            )));
        }
        match self.kind {
            TaskKind::Periodic { period, deadline } => {
                if !(period > 0.0) || !(deadline > 0.0) {
                    return Err(SimulationError::InvalidSpecification(format!(
                        "periodic task {} needs positive period and deadline (period={period}, deadline={deadline})",
                        self.id
                    )));
                }
            }
            TaskKind::Aperiodic { arrival, deadline } => {
                if arrival < 0.0 || deadline <= arrival {
                    return Err(SimulationError::InvalidSpecification(format!(
                        "aperiodic task {} needs 0 <= arrival < deadline (arrival={arrival}, deadline={deadline})",
                        self.id
                    )));
                }
            }
        }
        Ok(())
    }
}

// ── TaskSet ───────────────────────────────────────────────────────────────────

/// Periodic and aperiodic tasks of one scenario, with ids assigned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskSet {
    periodic: Vec<Task>,
    aperiodic: Vec<Task>,
}

impl TaskSet {
    /// Build a task set, assigning ids `0..n_periodic` to the periodic tasks
    /// and the following ids to the aperiodic ones.
    ///
    /// # Errors
    /// [`SimulationError::InvalidSpecification`] when a task is in the wrong
    /// list or has non-positive timing parameters.
    pub fn new(periodic: Vec<Task>, aperiodic: Vec<Task>) -> Result<Self, SimulationError> {
        let n_periodic = periodic.len();

        let periodic: Vec<Task> = periodic
            .into_iter()
            .enumerate()
            .map(|(i, mut t)| {
                t.id = i;
                t
            })
            .collect();
        let aperiodic: Vec<Task> = aperiodic
            .into_iter()
            .enumerate()
            .map(|(i, mut t)| {
                t.id = n_periodic + i;
                t
            })
            .collect();

        if let Some(t) = periodic.iter().find(|t| !t.is_periodic()) {
            return Err(SimulationError::InvalidSpecification(format!(
                "task {} is listed as periodic but has an aperiodic activation",
                t.id
            )));
        }
        if let Some(t) = aperiodic.iter().find(|t| t.is_periodic()) {
            return Err(SimulationError::InvalidSpecification(format!(
                "task {} is listed as aperiodic but has a period",
                t.id
            )));
        }
        for t in periodic.iter().chain(aperiodic.iter()) {
            t.validate()?;
        }

        Ok(Self {
            periodic,
            aperiodic,
        })
    }

    pub fn periodic(&self) -> &[Task] {
        &self.periodic
    }

    pub fn aperiodic(&self) -> &[Task] {
        &self.aperiodic
    }

    /// All tasks in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.periodic.iter().chain(self.aperiodic.iter())
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        if id < self.periodic.len() {
            self.periodic.get(id)
        } else {
            self.aperiodic.get(id - self.periodic.len())
        }
    }

    pub fn len(&self) -> usize {
        self.periodic.len() + self.aperiodic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the periodic utilisations at `base_frequency`.
    pub fn utilization(&self, base_frequency: f64) -> f64 {
        self.periodic
            .iter()
            .map(|t| t.utilization(base_frequency))
            .sum()
    }
}

// ── JobState (engine-owned) ───────────────────────────────────────────────────

/// Tracking record of the current job of one task.
///
/// Owned by the engine; policies only ever see copies of these records.
#[derive(Debug, Clone, PartialEq)]
pub struct JobState {
    pub task_id: TaskId,

    /// Worst-case cycles of every job of the task.
    pub cycles: f64,

    /// `Some(period)` for periodic tasks.
    pub period: Option<f64>,

    /// Absolute release time of the current job.
    pub next_arrival: f64,

    /// Absolute deadline of the current job.
    pub next_deadline: f64,

    /// Cycles still to execute for the current job.
    pub pending_cycles: f64,
}

impl JobState {
    /// First job of `task`.
    pub fn new(task: &Task) -> Self {
        Self {
            task_id: task.id,
            cycles: task.cycles,
            period: task.period(),
            next_arrival: task.first_arrival(),
            next_deadline: task.first_deadline(),
            pending_cycles: task.cycles,
        }
    }

    pub fn is_periodic(&self) -> bool {
        self.period.is_some()
    }

    /// Laxity at `time` when executing at `frequency` Hz.
    pub fn laxity(&self, time: f64, frequency: f64) -> f64 {
        (self.next_deadline - time) - self.pending_cycles / frequency
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Task ──────────────────────────────────────────────────────────────────

    #[test]
    fn periodic_task_accessors() {
        let t = Task::periodic(3.0, 7.0, 7.0);
        assert!(t.is_periodic());
        assert_eq!(t.period(), Some(7.0));
        assert_eq!(t.first_arrival(), 0.0);
        assert_eq!(t.first_deadline(), 7.0);
    }

    #[test]
    fn aperiodic_task_accessors() {
        let t = Task::aperiodic(2.0, 4.0, 9.0);
        assert!(!t.is_periodic());
        assert_eq!(t.period(), None);
        assert_eq!(t.first_arrival(), 4.0);
        assert_eq!(t.first_deadline(), 9.0);
    }

    #[test]
    fn utilization_uses_base_frequency() {
        // 5 cycles at 1 Hz every 10 s
        let t = Task::periodic(5.0, 10.0, 10.0);
        assert!((t.utilization(1.0) - 0.5).abs() < 1e-12);
        // 1e9 cycles at 1 GHz every 4 s
        let t = Task::periodic(1e9, 4.0, 4.0);
        assert!((t.utilization(1e9) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn aperiodic_utilization_is_zero() {
        assert_eq!(Task::aperiodic(5.0, 0.0, 10.0).utilization(1.0), 0.0);
    }

    // ── TaskSet ───────────────────────────────────────────────────────────────

    #[test]
    fn task_set_assigns_ids_periodic_first() {
        let set = TaskSet::new(
            vec![Task::periodic(1.0, 5.0, 5.0), Task::periodic(1.0, 10.0, 10.0)],
            vec![Task::aperiodic(1.0, 2.0, 4.0)],
        )
        .unwrap();

        let ids: Vec<TaskId> = set.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(set.get(2).map(|t| t.is_periodic()), Some(false));
        assert!(set.get(3).is_none());
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn task_set_rejects_misfiled_tasks() {
        let err = TaskSet::new(vec![Task::aperiodic(1.0, 0.0, 1.0)], vec![]).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidSpecification(_)));

        let err = TaskSet::new(vec![], vec![Task::periodic(1.0, 1.0, 1.0)]).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidSpecification(_)));
    }

    #[test]
    fn task_set_rejects_bad_timing() {
        assert!(TaskSet::new(vec![Task::periodic(1.0, 0.0, 1.0)], vec![]).is_err());
        assert!(TaskSet::new(vec![Task::periodic(0.0, 1.0, 1.0)], vec![]).is_err());
        assert!(TaskSet::new(vec![], vec![Task::aperiodic(1.0, 5.0, 5.0)]).is_err());
    }

    #[test]
    fn task_set_utilization_sums_periodic_only() {
        let set = TaskSet::new(
            vec![Task::periodic(3.0, 7.0, 7.0), Task::periodic(4.0, 7.0, 7.0)],
            vec![Task::aperiodic(100.0, 0.0, 1.0)],
        )
        .unwrap();
        assert!((set.utilization(1.0) - 1.0).abs() < 1e-12);
    }

    // ── JobState ──────────────────────────────────────────────────────────────

    #[test]
    fn job_state_starts_with_full_budget() {
        let set = TaskSet::new(vec![Task::periodic(3.0, 7.0, 6.0)], vec![]).unwrap();
        let job = JobState::new(&set.periodic()[0]);
        assert_eq!(job.pending_cycles, 3.0);
        assert_eq!(job.next_arrival, 0.0);
        assert_eq!(job.next_deadline, 6.0);
        assert!(job.is_periodic());
    }

    #[test]
    fn job_laxity() {
        let job = JobState::new(&Task::periodic(2.0, 10.0, 10.0));
        // 10 s to deadline, 2 s of work at 1 Hz
        assert!((job.laxity(0.0, 1.0) - 8.0).abs() < 1e-12);
        assert!((job.laxity(8.0, 1.0)).abs() < 1e-12);
    }
}
