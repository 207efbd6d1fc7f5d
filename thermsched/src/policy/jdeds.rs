/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! JDEDS: interval-partitioned global scheduling with DVFS.
//!
//! # Offline stage
//! 1. Keep every available frequency at which the task set still fits once
//!    each job is rounded up to whole quanta (`round(f·dt)` cycles).  The
//!    lowest one, `f*`, is used for the whole hyperperiod.
//! 2. Split the hyperperiod at the union of all deadlines and solve an LP
//!    that gives every task a cycle budget in every interval:
//!
//! ```text
//! Σ_i x[i,j]        ≤ m · len_j                      (interval capacity)
//! x[i,j]            ≤ len_j                          (one core per task)
//! Σ_{k≤j} x[i,k]    = q · c_i                        (at a deadline of i)
//! Σ_{k≤j} x[i,k]    ≥ q · c_i + max(0, r − (T_i − c_i))   (elsewhere)
//! ```
//!
//! with `q`, `r` the quotient and remainder of the interval end by `T_i`.
//! A dummy task soaks up the idle capacity so the LP stays tight.
//!
//! # Online stage
//! Every step the cycle budget of the current interval is consumed by the
//! tasks that run.  The assignment is recomputed only on a scheduling
//! interrupt (a running task exhausted its budget, another task reached
//! zero laxity, a new interval started or an aperiodic job was admitted);
//! otherwise the running set is kept.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::hyperperiod::math::round_to;
use crate::hyperperiod::HyperperiodCalculator;
use crate::scheduler::SimulationError;
use crate::specification::GlobalSpecification;
use crate::task::{JobState, Task, TaskId, TaskKind};

use super::lp::{LinearProgram, LpError, Relation};
use super::{apply_affinity, fill_idle, Decision, ScheduleContext, SchedulingPolicy};

const NAME: &str = "JDEDS";

#[derive(Debug, Clone, Default)]
pub struct Jdeds {
    cores: usize,
    dt: f64,
    decimals: u32,
    base_frequency: f64,
    /// Frequencies (Hz, ascending) at which the periodic set fits.
    possible_frequencies: Vec<f64>,
    /// End of every interval in seconds.
    intervals_end: Vec<f64>,
    /// Frequency (Hz) applied to every core during each interval.
    interval_frequencies: Vec<f64>,
    /// Cycle budget per row and interval.  One row per periodic task, then
    /// one per admitted aperiodic job.
    allocation: Vec<Vec<f64>>,
    row_task: Vec<TaskId>,
    /// Budget left in the current interval, per row.
    cycles_left: Vec<f64>,
    interval: usize,
    aperiodic_pending: bool,
}

impl Jdeds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interval ends (seconds) computed by the offline stage.
    pub fn intervals_end(&self) -> &[f64] {
        &self.intervals_end
    }

    /// Cycle budget of `task` in every interval, if it has a row.
    pub fn allocation_of(&self, task: TaskId) -> Option<&[f64]> {
        self.row_task
            .iter()
            .position(|&t| t == task)
            .map(|row| self.allocation[row].as_slice())
    }

    /// Frequency (Hz) chosen for every interval.
    pub fn interval_frequencies(&self) -> &[f64] {
        &self.interval_frequencies
    }

    fn steps(&self, seconds: f64) -> i64 {
        (seconds / self.dt).round() as i64
    }

    fn advance_interval(&mut self, time: f64) {
        while self.interval + 1 < self.intervals_end.len()
            && self.steps(time) >= self.steps(self.intervals_end[self.interval])
        {
            self.interval += 1;
            for (row, left) in self.cycles_left.iter_mut().enumerate() {
                *left = self.allocation[row][self.interval];
            }
            debug!(interval = self.interval, "JDEDS interval started");
        }
    }

    /// Seconds of spare single-task capacity per interval, from `time` up to
    /// `deadline`, when running at `frequency` Hz.
    fn spare_capacity(&self, time: f64, deadline: f64, frequency: f64) -> Vec<f64> {
        let m = self.cores as f64;
        let mut spare = Vec::new();
        let mut start = time;
        for k in self.interval..self.intervals_end.len() {
            if start >= deadline {
                break;
            }
            let end = self.intervals_end[k];
            let stop = end.min(deadline);
            let committed: f64 = if k == self.interval {
                self.cycles_left.iter().sum()
            } else {
                self.allocation.iter().map(|row| row[k]).sum()
            };
            let free = m * (end - start) - committed / frequency;
            spare.push(free.min(stop - start).max(0.0));
            start = end;
        }
        spare
    }

    fn admit(&mut self, time: f64, job: &JobState) -> bool {
        let pending = job.pending_cycles;
        let candidate = self.possible_frequencies.iter().find_map(|&f| {
            let quantum = cycles_per_quantum(f, self.dt);
            let needed = (pending / quantum).ceil() * quantum / f;
            let spare = self.spare_capacity(time, job.next_deadline, f);
            let total: f64 = spare.iter().sum();
            (round_to(total, self.decimals) >= round_to(needed, self.decimals))
                .then_some((f, spare))
        });

        let Some((frequency, spare)) = candidate else {
            warn!(
                task = job.task_id,
                pending_cycles = pending,
                deadline = job.next_deadline,
                "Aperiodic job rejected: no frequency leaves enough spare capacity"
            );
            return false;
        };

        let mut row = vec![0.0; self.intervals_end.len()];
        let mut left = pending;
        for (offset, seconds) in spare.iter().enumerate() {
            if left <= 0.0 {
                break;
            }
            let k = self.interval + offset;
            let cycles = (seconds * frequency).min(left);
            row[k] = cycles;
            left -= cycles;
            self.interval_frequencies[k] = self.interval_frequencies[k].max(frequency);
        }

        self.cycles_left.push(row[self.interval]);
        self.allocation.push(row);
        self.row_task.push(job.task_id);
        info!(
            task = job.task_id,
            frequency,
            deadline = job.next_deadline,
            "Aperiodic job admitted"
        );
        true
    }
}

impl SchedulingPolicy for Jdeds {
    fn name(&self) -> &'static str {
        NAME
    }

    fn check_schedulability(&self, spec: &GlobalSpecification) -> (bool, Option<String>) {
        let constrained = spec.tasks.periodic().iter().find(|t| {
            matches!(t.kind, TaskKind::Periodic { period, deadline } if period != deadline)
        });
        match constrained {
            Some(t) => (
                false,
                Some(format!("task {} does not have an implicit deadline", t.id)),
            ),
            None => (true, None),
        }
    }

    fn offline_stage(
        &mut self,
        spec: &GlobalSpecification,
        periodic: &[Task],
        _aperiodic: &[Task],
    ) -> Result<f64, SimulationError> {
        let sim = &spec.simulation;
        let cores = spec.cpu.number_of_cores();
        let mut frequencies = spec.cpu.cores.available_frequencies.clone();
        frequencies.sort_by(f64::total_cmp);

        let possible =
            feasible_frequencies(periodic, &frequencies, cores, sim.dt, sim.float_decimals);
        let Some(&f_star) = possible.first() else {
            return Err(SimulationError::OfflineInfeasible {
                policy: NAME.into(),
                reason: "no available frequency fits the periodic task set".into(),
            });
        };

        let quantum = cycles_per_quantum(f_star, sim.dt);
        let decimals = sim.float_decimals;
        let mut cycles: Vec<u64> = periodic
            .iter()
            .map(|t| quanta(t.cycles / quantum, decimals))
            .collect();
        let mut periods: Vec<u64> = periodic
            .iter()
            .map(|t| quanta(t.period().unwrap_or(0.0) * f_star / quantum, decimals))
            .collect();

        let hyperperiod = HyperperiodCalculator::new().calculate(periodic)?.hyperperiod;
        let horizon = quanta(hyperperiod * f_star / quantum, decimals);
        let capacity = cores as u64 * horizon;
        let used: u64 = cycles
            .iter()
            .zip(&periods)
            .map(|(&c, &t)| c * (horizon / t.max(1)))
            .sum();
        if used < capacity {
            // idle filler
            cycles.push(capacity - used);
            periods.push(horizon);
        }

        let (mut x, ends) = interval_partition(&cycles, &periods, horizon, cores)
            .map_err(|e| e.into_offline(NAME, "interval LP"))?;
        x.truncate(periodic.len());

        for row in x.iter_mut() {
            for v in row.iter_mut() {
                *v *= quantum;
            }
        }

        // the last quantum of a job is only partly used
        for (i, task) in periodic.iter().enumerate() {
            let remainder = task.cycles % quantum;
            if remainder == 0.0 {
                continue;
            }
            let period = periods[i];
            for job in 0..horizon / period {
                let last = ends
                    .iter()
                    .rposition(|&e| job * period < e && e <= (job + 1) * period);
                if let Some(j) = last {
                    x[i][j] = (x[i][j] - (quantum - remainder)).max(0.0);
                }
            }
        }

        self.cores = cores;
        self.dt = sim.dt;
        self.decimals = decimals;
        self.base_frequency = spec.cpu.cores.base_frequency();
        self.intervals_end = ends.iter().map(|&e| e as f64 * sim.dt).collect();
        self.interval_frequencies = vec![f_star; ends.len()];
        self.cycles_left = x.iter().map(|row| row[0]).collect();
        self.row_task = periodic.iter().map(|t| t.id).collect();
        self.allocation = x;
        self.possible_frequencies = possible;
        self.interval = 0;
        self.aperiodic_pending = false;

        info!(
            policy = NAME,
            frequency = f_star,
            intervals = self.intervals_end.len(),
            "JDEDS offline stage complete"
        );
        Ok(sim.dt)
    }

    fn schedule_policy(&mut self, ctx: &ScheduleContext<'_>) -> Decision {
        let time = ctx.time;
        self.advance_interval(time);
        if self.intervals_end.is_empty() {
            return Decision::new(vec![None; self.cores]);
        }

        let frequency = self.interval_frequencies[self.interval];
        let end = self.intervals_end[self.interval];
        let executable: Vec<TaskId> = ctx.executable.iter().map(|j| j.task_id).collect();
        let active: Vec<TaskId> = ctx.active.iter().flatten().copied().collect();

        let zero_laxity: Vec<TaskId> = self
            .cycles_left
            .iter()
            .zip(&self.row_task)
            .filter(|(left, _)| {
                let left = **left;
                left > 0.0 && ((end - time - left / frequency) / self.dt).trunc() <= 0.0
            })
            .map(|(_, &id)| id)
            .collect();

        let budget_spent = active.iter().any(|id| {
            !executable.contains(id)
                || self
                    .row_task
                    .iter()
                    .zip(&self.cycles_left)
                    .any(|(t, &left)| t == id && left <= 0.0)
        });
        let urgent_waiting = zero_laxity.iter().any(|id| !active.contains(id));
        let interval_start = time == 0.0
            || self
                .intervals_end
                .iter()
                .any(|&e| self.steps(e) == self.steps(time));
        let interrupt =
            budget_spent || urgent_waiting || interval_start || self.aperiodic_pending;
        self.aperiodic_pending = false;

        let mut assignment = if interrupt {
            let mut by_budget: Vec<(f64, TaskId)> = self
                .cycles_left
                .iter()
                .copied()
                .zip(self.row_task.iter().copied())
                .collect();
            by_budget.sort_by(|a, b| b.0.total_cmp(&a.0));

            let has_budget = |id: &TaskId| {
                self.row_task
                    .iter()
                    .zip(&self.cycles_left)
                    .any(|(t, &left)| t == id && left > 0.0)
            };
            let mut order: Vec<TaskId> = Vec::new();
            let candidates = zero_laxity
                .iter()
                .chain(active.iter().filter(|id| has_budget(id)))
                .chain(by_budget.iter().map(|(_, id)| id));
            for &id in candidates {
                if executable.contains(&id) && !order.contains(&id) {
                    order.push(id);
                }
            }
            let selected = order.into_iter().take(self.cores).map(Some).collect();
            fill_idle(selected, self.cores)
        } else {
            fill_idle(ctx.active.to_vec(), self.cores)
        };

        for id in assignment.iter().flatten() {
            let row = self
                .row_task
                .iter()
                .zip(&self.cycles_left)
                .position(|(t, &left)| t == id && left > 0.0);
            if let Some(row) = row {
                self.cycles_left[row] = (self.cycles_left[row] - frequency * self.dt).max(0.0);
            }
        }

        apply_affinity(&mut assignment, ctx.active);
        let relative = frequency / self.base_frequency;
        Decision::new(assignment).with_frequencies(vec![relative; self.cores])
    }

    fn aperiodic_arrive(
        &mut self,
        time: f64,
        arrived: &[JobState],
        _frequencies: &[f64],
        _temperatures: Option<&[f64]>,
    ) -> bool {
        if self.intervals_end.is_empty() {
            return false;
        }
        self.advance_interval(time);
        for job in arrived {
            if self.admit(time, job) {
                self.aperiodic_pending = true;
            }
        }
        self.aperiodic_pending
    }
}

/// Cycles executed in one step at `frequency`, at least one.
fn cycles_per_quantum(frequency: f64, dt: f64) -> f64 {
    (frequency * dt).round().max(1.0)
}

/// `value` rounded to `decimals` places, then up to a whole number.
fn quanta(value: f64, decimals: u32) -> u64 {
    round_to(value, decimals).ceil().max(0.0) as u64
}

/// Available frequencies (ascending) at which the periodic tasks fit on
/// `cores` once every job is rounded up to whole steps.
fn feasible_frequencies(
    periodic: &[Task],
    frequencies: &[f64],
    cores: usize,
    dt: f64,
    decimals: u32,
) -> Vec<f64> {
    frequencies
        .iter()
        .copied()
        .filter(|&f| {
            let quantum = cycles_per_quantum(f, dt);
            let ratios: Vec<f64> = periodic
                .iter()
                .map(|t| {
                    let steps = quanta(t.cycles / quantum, decimals) as f64;
                    round_to(steps * quantum / (t.period().unwrap_or(f64::INFINITY) * f), decimals)
                })
                .collect();
            ratios.iter().all(|&r| r <= 1.0)
                && round_to(ratios.iter().sum(), decimals) <= cores as f64
        })
        .collect()
}

/// Solve the interval LP in quanta.
///
/// Returns the budget `x[task][interval]` and the interval ends (the union
/// of all deadlines up to `horizon`).
fn interval_partition(
    cycles: &[u64],
    periods: &[u64],
    horizon: u64,
    cores: usize,
) -> Result<(Vec<Vec<f64>>, Vec<u64>), LpError> {
    let n = cycles.len();
    let mut deadlines = BTreeSet::new();
    for &t in periods.iter().filter(|&&t| t > 0) {
        for k in 1..=horizon / t {
            deadlines.insert(k * t);
        }
    }
    let ends: Vec<u64> = deadlines.into_iter().collect();
    let lengths: Vec<f64> = ends
        .iter()
        .scan(0u64, |prev, &e| {
            let len = e - *prev;
            *prev = e;
            Some(len as f64)
        })
        .collect();

    let var = |task: usize, interval: usize| interval * n + task;
    let mut lp = LinearProgram::maximize(n * ends.len());

    for (j, &len) in lengths.iter().enumerate() {
        let terms = (0..n).map(|i| (var(i, j), 1.0)).collect();
        lp.add_constraint(terms, Relation::Le, cores as f64 * len);
        for i in 0..n {
            lp.set_objective(var(i, j), 1.0);
            lp.set_bounds(var(i, j), 0.0, len);
        }
    }

    for (j, &end) in ends.iter().enumerate() {
        for i in 0..n {
            let (c, t) = (cycles[i] as i64, periods[i] as i64);
            if t == 0 {
                continue;
            }
            let (q, r) = (end as i64 / t, end as i64 % t);
            let terms: Vec<(usize, f64)> = (0..=j).map(|k| (var(i, k), 1.0)).collect();
            if r == 0 {
                lp.add_constraint(terms, Relation::Eq, (q * c) as f64);
            } else {
                let lag = (r - (t - c)).max(0);
                if q * c + lag > 0 {
                    lp.add_constraint(terms, Relation::Ge, (q * c + lag) as f64);
                }
            }
        }
    }

    let solution = lp.solve()?;
    let x = (0..n)
        .map(|i| {
            (0..ends.len())
                .map(|j| round_to(solution.values[var(i, j)], 6))
                .collect()
        })
        .collect();
    debug!(tasks = n, intervals = ends.len(), "Interval LP solved");
    Ok((x, ends))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn spec(tasks: &[(f64, f64)]) -> GlobalSpecification {
        testutil::scenario(
            testutil::implicit_tasks(tasks),
            vec![],
            2,
            vec![500.0, 1000.0],
            0.01,
        )
    }

    fn offline(spec: &GlobalSpecification) -> Result<Jdeds, SimulationError> {
        let mut p = Jdeds::new();
        p.offline_stage(spec, spec.tasks.periodic(), spec.tasks.aperiodic())?;
        Ok(p)
    }

    fn job(task_id: TaskId, pending: f64, deadline: f64) -> JobState {
        JobState {
            task_id,
            cycles: pending,
            period: None,
            next_arrival: 0.0,
            next_deadline: deadline,
            pending_cycles: pending,
        }
    }

    /// Hand-built online state: one core at 1 Hz, a single interval `[0, 1]`.
    fn single_interval(budgets: &[f64]) -> Jdeds {
        Jdeds {
            cores: 1,
            dt: 0.1,
            decimals: 5,
            base_frequency: 1.0,
            possible_frequencies: vec![1.0],
            intervals_end: vec![1.0],
            interval_frequencies: vec![1.0],
            allocation: budgets.iter().map(|&b| vec![b]).collect(),
            row_task: (0..budgets.len()).collect(),
            cycles_left: budgets.to_vec(),
            interval: 0,
            aperiodic_pending: false,
        }
    }

    fn ctx<'a>(
        time: f64,
        jobs: &'a [JobState],
        active: &'a [Option<TaskId>],
        f: &'a [f64],
    ) -> ScheduleContext<'a> {
        ScheduleContext {
            time,
            executable: jobs,
            active,
            frequencies: f,
            temperatures: None,
        }
    }

    // ── offline ───────────────────────────────────────────────────────────────

    #[test]
    fn lowest_fitting_frequency_is_chosen() {
        // at 500 Hz the set needs 2.2 cores, at 1000 Hz 1.1
        let p = offline(&spec(&[(200.0, 0.5), (300.0, 1.0), (400.0, 1.0)])).unwrap();
        assert_eq!(p.possible_frequencies, vec![1000.0]);
        assert!(p.interval_frequencies().iter().all(|&f| f == 1000.0));
    }

    #[test]
    fn intervals_end_at_every_deadline() {
        let p = offline(&spec(&[(200.0, 0.5), (300.0, 1.0), (400.0, 1.0)])).unwrap();
        let ends = p.intervals_end();
        assert_eq!(ends.len(), 2);
        assert!((ends[0] - 0.5).abs() < 1e-9);
        assert!((ends[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn every_job_receives_its_cycles() {
        let p = offline(&spec(&[(200.0, 0.5), (300.0, 1.0), (400.0, 1.0)])).unwrap();
        let short = p.allocation_of(0).unwrap();
        assert!((short[0] - 200.0).abs() < 1e-6, "{short:?}");
        assert!((short[1] - 200.0).abs() < 1e-6, "{short:?}");
        for (task, cycles) in [(1, 300.0), (2, 400.0)] {
            let total: f64 = p.allocation_of(task).unwrap().iter().sum();
            assert!((total - cycles).abs() < 1e-6, "task {task}: {total}");
        }
    }

    #[test]
    fn interval_capacity_is_respected() {
        let p = offline(&spec(&[(200.0, 0.5), (300.0, 1.0), (400.0, 1.0)])).unwrap();
        // 2 cores · 0.5 s · 1000 Hz
        for j in 0..2 {
            let used: f64 = (0..3).map(|t| p.allocation_of(t).unwrap()[j]).sum();
            assert!(used <= 1000.0 + 1e-6);
            for t in 0..3 {
                assert!(p.allocation_of(t).unwrap()[j] <= 500.0 + 1e-6);
            }
        }
    }

    #[test]
    fn partial_last_quantum_is_trimmed() {
        // 205 cycles take 21 steps of 10 cycles; the last step is half empty
        let p = offline(&spec(&[(205.0, 0.5), (300.0, 1.0), (400.0, 1.0)])).unwrap();
        let row = p.allocation_of(0).unwrap();
        assert!((row[0] - 205.0).abs() < 1e-6, "{row:?}");
        assert!((row[1] - 205.0).abs() < 1e-6, "{row:?}");
    }

    #[test]
    fn offline_stage_is_deterministic() {
        let s = spec(&[(200.0, 0.5), (300.0, 1.0), (400.0, 1.0)]);
        let a = offline(&s).unwrap();
        let b = offline(&s).unwrap();
        assert_eq!(a.allocation, b.allocation);
        assert_eq!(a.intervals_end, b.intervals_end);
    }

    #[test]
    fn overloaded_set_is_offline_infeasible() {
        let err = offline(&spec(&[(500.0, 0.5), (500.0, 0.5), (500.0, 0.5)])).unwrap_err();
        assert!(matches!(err, SimulationError::OfflineInfeasible { .. }), "{err}");
    }

    #[test]
    fn constrained_deadlines_are_rejected() {
        let mut s = spec(&[(200.0, 0.5)]);
        s.tasks = crate::task::TaskSet::new(vec![Task::periodic(200.0, 0.5, 0.4)], vec![]).unwrap();
        let (ok, reason) = Jdeds::new().check_schedulability(&s);
        assert!(!ok);
        assert!(reason.unwrap().contains("implicit deadline"));
    }

    // ── online ────────────────────────────────────────────────────────────────

    #[test]
    fn frequencies_are_relative_to_base() {
        let s = spec(&[(200.0, 0.5), (300.0, 1.0), (400.0, 1.0)]);
        let mut p = offline(&s).unwrap();
        let jobs: Vec<JobState> = s.tasks.iter().map(JobState::new).collect();
        let d = p.schedule_policy(&ctx(0.0, &jobs, &[None, None], &[1.0, 1.0]));
        assert_eq!(d.frequencies, Some(vec![1.0, 1.0]));
        let picked: Vec<TaskId> = d.assignment.iter().flatten().copied().collect();
        assert_eq!(picked.len(), 2);
        assert_ne!(picked[0], picked[1]);
    }

    #[test]
    fn zero_laxity_task_preempts() {
        let mut p = single_interval(&[0.2, 0.9]);
        let jobs = [job(0, 0.2, 1.0), job(1, 0.9, 1.0)];
        let d = p.schedule_policy(&ctx(0.1, &jobs, &[Some(0)], &[1.0]));
        assert_eq!(d.assignment, vec![Some(1)]);
        assert!((p.cycles_left[1] - 0.8).abs() < 1e-9);
        assert!((p.cycles_left[0] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn running_set_is_kept_without_interrupt() {
        let mut p = single_interval(&[0.2, 0.3]);
        let jobs = [job(0, 0.2, 1.0), job(1, 0.3, 1.0)];
        let d = p.schedule_policy(&ctx(0.1, &jobs, &[Some(0)], &[1.0]));
        assert_eq!(d.assignment, vec![Some(0)]);
    }

    #[test]
    fn exhausted_budget_hands_the_core_over() {
        let mut p = single_interval(&[0.0, 0.3]);
        let jobs = [job(0, 0.2, 1.0), job(1, 0.3, 1.0)];
        let d = p.schedule_policy(&ctx(0.1, &jobs, &[Some(0)], &[1.0]));
        assert_eq!(d.assignment, vec![Some(1)]);
    }

    // ── aperiodic admission ───────────────────────────────────────────────────

    fn two_intervals() -> Jdeds {
        Jdeds {
            cores: 1,
            dt: 0.1,
            decimals: 5,
            base_frequency: 100.0,
            possible_frequencies: vec![50.0, 100.0],
            intervals_end: vec![1.0, 2.0],
            interval_frequencies: vec![50.0, 50.0],
            allocation: vec![vec![20.0, 20.0]],
            row_task: vec![0],
            cycles_left: vec![20.0],
            interval: 0,
            aperiodic_pending: false,
        }
    }

    #[test]
    fn aperiodic_job_is_admitted_at_a_higher_frequency() {
        let mut p = two_intervals();
        // 40 cycles before t = 1: 0.8 s at 50 Hz, only 0.6 s spare
        assert!(p.aperiodic_arrive(0.0, &[job(1, 40.0, 1.0)], &[0.5], None));
        let row = p.allocation_of(1).unwrap();
        assert!((row[0] - 40.0).abs() < 1e-9);
        assert_eq!(row[1], 0.0);
        assert_eq!(p.interval_frequencies(), &[100.0, 50.0]);
        assert_eq!(p.cycles_left, vec![20.0, 40.0]);
    }

    #[test]
    fn admission_forces_a_scheduling_point() {
        let mut p = two_intervals();
        p.aperiodic_arrive(0.0, &[job(1, 40.0, 1.0)], &[0.5], None);
        let jobs = [job(0, 20.0, 1.0), job(1, 40.0, 1.0)];
        let d = p.schedule_policy(&ctx(0.3, &jobs, &[Some(0)], &[0.5]));
        assert_eq!(d.frequencies, Some(vec![1.0]));
        assert!(!p.aperiodic_pending);
        assert_eq!(d.assignment, vec![Some(0)]);
    }

    #[test]
    fn oversized_aperiodic_job_is_rejected() {
        let mut p = two_intervals();
        assert!(!p.aperiodic_arrive(0.0, &[job(1, 200.0, 1.0)], &[0.5], None));
        assert!(p.allocation_of(1).is_none());
    }
}
