/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Output of one simulation run.
//!
//! [`SchedulerResult`] is filled step by step by the engine and handed out
//! once the loop is over; the public API is read-only.  Every per-step
//! series has exactly [`SchedulerResult::steps`] rows.

use crate::task::TaskId;

/// A job that reached its deadline with cycles still pending.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadlineMiss {
    pub task: TaskId,
    /// Absolute deadline of the job that missed.
    pub job_deadline: f64,
    pub pending_cycles: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerResult {
    policy: String,
    tasks: usize,
    cores: usize,
    dt: f64,
    quantum: f64,
    hyperperiod: f64,

    time: Vec<f64>,
    assignments: Vec<Vec<Option<TaskId>>>,
    /// Seconds each `(task, core)` pair ran, as counted by the engine.
    execution: Vec<Vec<f64>>,
    /// Same quantity as integrated by the processor net.
    fluid_execution: Vec<Vec<f64>>,
    /// Core frequencies in Hz.
    frequencies: Vec<Vec<f64>>,

    board_temperature: Option<Vec<Vec<f64>>>,
    cores_temperature: Option<Vec<Vec<f64>>>,
    energy: Option<Vec<Vec<f64>>>,

    deadline_misses: Vec<DeadlineMiss>,
    corrections: usize,
}

impl SchedulerResult {
    pub(crate) fn new(
        policy: &str,
        tasks: usize,
        cores: usize,
        dt: f64,
        quantum: f64,
        hyperperiod: f64,
        thermal: bool,
    ) -> Self {
        let series = || thermal.then(Vec::new);
        Self {
            policy: policy.to_string(),
            tasks,
            cores,
            dt,
            quantum,
            hyperperiod,
            time: Vec::new(),
            assignments: Vec::new(),
            execution: Vec::new(),
            fluid_execution: Vec::new(),
            frequencies: Vec::new(),
            board_temperature: series(),
            cores_temperature: series(),
            energy: series(),
            deadline_misses: Vec::new(),
            corrections: 0,
        }
    }

    // ── Recording (engine only) ───────────────────────────────────────────────

    pub(crate) fn record_step(
        &mut self,
        time: f64,
        assignment: Vec<Option<TaskId>>,
        execution: Vec<f64>,
        fluid_execution: Vec<f64>,
        frequencies: Vec<f64>,
    ) {
        self.time.push(time);
        self.assignments.push(assignment);
        self.execution.push(execution);
        self.fluid_execution.push(fluid_execution);
        self.frequencies.push(frequencies);
    }

    pub(crate) fn record_thermal(
        &mut self,
        board: Option<Vec<f64>>,
        cores: Option<Vec<f64>>,
        energy: Option<Vec<f64>>,
    ) {
        if let (Some(series), Some(row)) = (self.board_temperature.as_mut(), board) {
            series.push(row);
        }
        if let (Some(series), Some(row)) = (self.cores_temperature.as_mut(), cores) {
            series.push(row);
        }
        if let (Some(series), Some(row)) = (self.energy.as_mut(), energy) {
            series.push(row);
        }
    }

    pub(crate) fn record_miss(&mut self, miss: DeadlineMiss) {
        self.deadline_misses.push(miss);
    }

    pub(crate) fn record_corrections(&mut self, count: usize) {
        self.corrections += count;
    }

    // ── Run parameters ────────────────────────────────────────────────────────

    pub fn policy(&self) -> &str {
        &self.policy
    }

    pub fn tasks(&self) -> usize {
        self.tasks
    }

    pub fn cores(&self) -> usize {
        self.cores
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Quantum returned by the policy's offline stage.
    pub fn quantum(&self) -> f64 {
        self.quantum
    }

    pub fn hyperperiod(&self) -> f64 {
        self.hyperperiod
    }

    pub fn steps(&self) -> usize {
        self.time.len()
    }

    // ── Series ────────────────────────────────────────────────────────────────

    /// Start time of every step.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Task that ran on each core, per step.
    pub fn assignments(&self) -> &[Vec<Option<TaskId>>] {
        &self.assignments
    }

    /// `1.0` when `task` ran on `core` during `step`.
    pub fn allocation(&self, step: usize, task: TaskId, core: usize) -> f64 {
        match self.assignments.get(step).and_then(|row| row.get(core)) {
            Some(Some(t)) if *t == task => 1.0,
            _ => 0.0,
        }
    }

    /// Accumulated execution seconds per step, ordered `core · n + task`.
    pub fn accumulated_execution(&self) -> &[Vec<f64>] {
        &self.execution
    }

    /// Accumulated execution integrated by the processor net.
    pub fn fluid_execution(&self) -> &[Vec<f64>] {
        &self.fluid_execution
    }

    /// Core frequencies (Hz) per step.
    pub fn frequencies(&self) -> &[Vec<f64>] {
        &self.frequencies
    }

    pub fn board_temperature(&self) -> Option<&[Vec<f64>]> {
        self.board_temperature.as_deref()
    }

    /// Center-cell temperature of every core, per step.
    pub fn cores_temperature(&self) -> Option<&[Vec<f64>]> {
        self.cores_temperature.as_deref()
    }

    /// Joules drawn by every core during each step.
    pub fn energy(&self) -> Option<&[Vec<f64>]> {
        self.energy.as_deref()
    }

    // ── Outcome ───────────────────────────────────────────────────────────────

    pub fn deadline_misses(&self) -> &[DeadlineMiss] {
        &self.deadline_misses
    }

    /// Policy decisions the engine had to correct.
    pub fn corrections(&self) -> usize {
        self.corrections
    }

    /// Total joules per core over the run.
    pub fn energy_per_core(&self) -> Option<Vec<f64>> {
        self.energy.as_ref().map(|series| {
            (0..self.cores)
                .map(|k| series.iter().map(|row| row[k]).sum())
                .collect()
        })
    }

    /// Highest center temperature reached by each core.
    pub fn max_core_temperatures(&self) -> Option<Vec<f64>> {
        self.cores_temperature.as_ref().map(|series| {
            (0..self.cores)
                .map(|k| {
                    series
                        .iter()
                        .map(|row| row[k])
                        .fold(f64::NEG_INFINITY, f64::max)
                })
                .collect()
        })
    }
}
