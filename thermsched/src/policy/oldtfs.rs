/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! OLDTFS: thermal-aware fluid schedule with sliding-mode discretisation.
//!
//! The offline stage solves an LP for `j_b[core·n + task]`, the number of
//! jobs of each task executed on each core over a hyperperiod:
//!
//! ```text
//! Σ_core j_b[·, i]                       = H / T_i
//! Σ_i  j_b[k, i] · c_i / (f_base · H)    ≤ 1                       per core
//! −S_T A⁻¹ CT · (j_b ∘ ch)               ≤ T_max + S_T A⁻¹ (b_env T_env + b_const)
//! ```
//!
//! The last block, present only with thermal simulation on, bounds the
//! steady-state temperature of every core center.  `j_b ∘ ch` is the fair
//! share `fsc` of every `(task, core)` pair.
//!
//! Online, a sliding-mode controller drives a continuous execution marker
//! of every pair towards `fsc · t`; the pairs whose continuous marker is
//! ahead of the discrete one are eligible, and each core picks the eligible
//! task with the largest lag at the next deadline.

use nalgebra::DMatrix;
use tracing::{debug, info};

use crate::hyperperiod::math::{gcd_of_slice, round_to};
use crate::hyperperiod::HyperperiodCalculator;
use crate::model::ThermalModel;
use crate::scheduler::SimulationError;
use crate::specification::GlobalSpecification;
use crate::task::{JobState, Task, TaskId, TaskKind};

use super::lp::{LinearProgram, Relation};
use super::{Decision, ScheduleContext, SchedulingPolicy};

const NAME: &str = "OLDTFS";

/// Fixed-point scale used when taking the GCD of the fair-share slices.
const QUANTUM_SCALE: f64 = 1e4;

#[derive(Debug, Clone, Default)]
pub struct Oldtfs {
    cores: usize,
    tasks: usize,
    dt: f64,
    decimals: u32,
    quantum: f64,
    /// Fair share of every `(task, core)` pair, `core · n + task`.
    fsc: Vec<f64>,
    /// Absolute deadlines of the hyperperiod, ascending, `0` excluded.
    deadlines: Vec<f64>,
    /// Continuous execution marker of the sliding-mode controller.
    fluid_exec: Vec<f64>,
    /// Execution of the last micro-step.
    fluid_busy: Vec<f64>,
    /// Execution actually granted by the discretisation.
    granted: Vec<f64>,
}

impl Oldtfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fair shares computed by the offline stage, `core · n + task`.
    pub fn fair_shares(&self) -> &[f64] {
        &self.fsc
    }

    fn next_deadline(&self, time: f64) -> f64 {
        let now = round_to(time, self.decimals);
        self.deadlines
            .iter()
            .copied()
            .find(|&d| round_to(d, self.decimals) > now)
            .or_else(|| self.deadlines.last().copied())
            .unwrap_or(0.0)
    }

    /// Advance the continuous markers over one quantum starting at `time`.
    fn slide(&mut self, time: f64) {
        let steps = ((self.quantum / self.dt).round() as usize).max(1);
        for step in 0..steps {
            let t = time + step as f64 * self.dt;
            for v in 0..self.fsc.len() {
                let error = self.fsc[v] * t - self.fluid_exec[v];
                let surface = error - self.fluid_busy[v] + self.fsc[v];
                let w = self.fsc[v] * (sign(surface) + 1.0) / 2.0;
                self.fluid_busy[v] = w * self.dt;
                self.fluid_exec[v] += w * self.dt;
            }
        }
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl SchedulingPolicy for Oldtfs {
    fn name(&self) -> &'static str {
        NAME
    }

    fn check_schedulability(&self, spec: &GlobalSpecification) -> (bool, Option<String>) {
        if !spec.tasks.aperiodic().is_empty() {
            return (false, Some("aperiodic tasks are not supported".into()));
        }
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
        let n = periodic.len();
        let m = spec.cpu.number_of_cores();
        let base = spec.cpu.cores.base_frequency();
        let dt = spec.simulation.dt;
        let decimals = spec.simulation.float_decimals;
        let h = HyperperiodCalculator::new().calculate(periodic)?.hyperperiod;

        // execution-time share of one job over the hyperperiod
        let share: Vec<f64> = (0..n * m)
            .map(|v| periodic[v % n].execution_time(base) / h)
            .collect();

        let mut lp = LinearProgram::minimize(n * m);
        for v in 0..n * m {
            lp.set_objective(v, 1.0);
        }
        for (i, task) in periodic.iter().enumerate() {
            let jobs = round_to(h / task.period().unwrap_or(h), decimals);
            let terms = (0..m).map(|k| (k * n + i, 1.0)).collect();
            lp.add_constraint(terms, Relation::Eq, jobs);
        }
        for k in 0..m {
            let terms = (0..n).map(|i| (k * n + i, share[k * n + i])).collect();
            lp.add_constraint(terms, Relation::Le, 1.0);
        }
        if spec.simulation.simulate_thermal {
            for (terms, rhs) in thermal_rows(spec, &share)? {
                lp.add_constraint(terms, Relation::Le, rhs);
            }
        }

        let solution = lp
            .solve()
            .map_err(|e| e.into_offline(NAME, "fair-share LP"))?;
        let fsc: Vec<f64> = solution
            .values
            .iter()
            .zip(&share)
            .map(|(jobs, s)| round_to(jobs * s, 9))
            .collect();

        let deadlines = deadline_boundaries(periodic, h, decimals);
        let interior = deadlines.len().saturating_sub(1);
        let slices: Vec<u64> = deadlines[..interior]
            .iter()
            .flat_map(|&d| fsc.iter().map(move |&f| (d * f * QUANTUM_SCALE).round() as u64))
            .collect();
        let quantum = (gcd_of_slice(&slices) as f64 / QUANTUM_SCALE).max(dt);

        self.cores = m;
        self.tasks = n;
        self.dt = dt;
        self.decimals = decimals;
        self.quantum = quantum;
        self.fsc = fsc;
        self.deadlines = deadlines;
        self.fluid_exec = vec![0.0; n * m];
        self.fluid_busy = vec![0.0; n * m];
        self.granted = vec![0.0; n * m];

        info!(
            policy = NAME,
            quantum,
            hyperperiod = h,
            thermal = spec.simulation.simulate_thermal,
            "OLDTFS offline stage complete"
        );
        Ok(quantum)
    }

    fn schedule_policy(&mut self, ctx: &ScheduleContext<'_>) -> Decision {
        let (m, n) = (self.cores, self.tasks);
        self.slide(ctx.time);

        let executable: Vec<TaskId> = ctx.executable.iter().map(|j| j.task_id).collect();
        let mut eligible: Vec<Vec<bool>> = (0..m)
            .map(|k| {
                (0..n)
                    .map(|i| {
                        let v = k * n + i;
                        round_to(self.fluid_exec[v] - self.granted[v], 4) > 0.0
                            && executable.contains(&i)
                    })
                    .collect()
            })
            .collect();

        let sd = self.next_deadline(ctx.time);
        let mut assignment = vec![None; m];
        for k in 0..m {
            let lag = |i: usize| self.fsc[k * n + i] * sd - self.granted[k * n + i];
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by(|&a, &b| lag(b).total_cmp(&lag(a)).then(a.cmp(&b)));
            let Some(task) = order.into_iter().find(|&i| eligible[k][i]) else {
                continue;
            };
            // no task runs on two cores at once
            for (other, row) in eligible.iter_mut().enumerate() {
                if other != k {
                    row[task] = false;
                }
            }
            assignment[k] = Some(task);
            self.granted[k * n + task] += self.quantum;
        }

        debug!(time = ctx.time, ?assignment, "OLDTFS decision");
        Decision::new(assignment)
    }

    fn aperiodic_arrive(
        &mut self,
        _time: f64,
        _arrived: &[JobState],
        _frequencies: &[f64],
        _temperatures: Option<&[f64]>,
    ) -> bool {
        false
    }
}

/// Sorted absolute deadlines `k · T_i` up to `h`, deduplicated after
/// rounding to `decimals` places.
fn deadline_boundaries(periodic: &[Task], h: f64, decimals: u32) -> Vec<f64> {
    let mut deadlines: Vec<f64> = periodic
        .iter()
        .filter_map(Task::period)
        .flat_map(|t| {
            let jobs = round_to(h / t, decimals).round() as usize;
            (1..=jobs).map(move |k| round_to(k as f64 * t, decimals))
        })
        .collect();
    deadlines.sort_by(f64::total_cmp);
    deadlines.dedup();
    deadlines
}

/// Steady-state temperature rows, one per core.
fn thermal_rows(
    spec: &GlobalSpecification,
    share: &[f64],
) -> Result<Vec<(Vec<(usize, f64)>, f64)>, SimulationError> {
    let model = ThermalModel::build(spec)?;
    let op = model.linear_operator();
    let selector = model.core_selector();
    SimulationError::check_len("thermal power inputs", share.len(), op.ct.ncols())?;

    let singular = || SimulationError::SingularMatrix {
        context: "steady-state thermal operator".into(),
    };
    let lu = op.a.clone().lu();
    let heat = lu.solve(&op.ct).ok_or_else(singular)?;
    let forcing = &op.b_env * spec.environment.t_env + &op.b_const;
    let offset = lu.solve(&forcing).ok_or_else(singular)?;

    let gain: DMatrix<f64> = -(&selector * heat);
    let ambient = &selector * offset;

    let rows = (0..model.cores())
        .map(|k| {
            let terms = share
                .iter()
                .enumerate()
                .map(|(v, s)| (v, gain[(k, v)] * s))
                .collect();
            (terms, spec.environment.t_max + ambient[k])
        })
        .collect();
    debug!(cores = model.cores(), "Thermal LP rows built");
    Ok(rows)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
