/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Global earliest-deadline-first.
//!
//! Every step the `m` executable jobs with the earliest absolute deadlines
//! run; ties go to the lower task id.  The affinity variant (`G-EDF-A`)
//! additionally prefers, among equal deadlines, jobs that were already
//! running, and keeps every job that stays selected on the core it used in
//! the previous step.

use std::cmp::Ordering;

use tracing::debug;

use crate::scheduler::SimulationError;
use crate::specification::GlobalSpecification;
use crate::task::{JobState, Task, TaskId};

use super::{apply_affinity, fill_idle, Decision, ScheduleContext, SchedulingPolicy};

#[derive(Debug, Clone, Default)]
pub struct GlobalEdf {
    affinity: bool,
    cores: usize,
}

impl GlobalEdf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_affinity() -> Self {
        Self {
            affinity: true,
            cores: 0,
        }
    }

    /// The `cores` earliest-deadline jobs, padded with idle.
    pub fn select(&self, ctx: &ScheduleContext<'_>) -> Vec<Option<TaskId>> {
        let running = |id: TaskId| ctx.active.contains(&Some(id));
        let mut order: Vec<&JobState> = ctx.executable.iter().collect();
        order.sort_by(|a, b| {
            a.next_deadline
                .total_cmp(&b.next_deadline)
                .then_with(|| {
                    if self.affinity {
                        // running first
                        running(b.task_id).cmp(&running(a.task_id))
                    } else {
                        Ordering::Equal
                    }
                })
                .then_with(|| a.task_id.cmp(&b.task_id))
        });

        let selected = order
            .iter()
            .take(self.cores)
            .map(|job| Some(job.task_id))
            .collect();
        fill_idle(selected, self.cores)
    }
}

impl SchedulingPolicy for GlobalEdf {
    fn name(&self) -> &'static str {
        if self.affinity {
            "G-EDF-A"
        } else {
            "G-EDF"
        }
    }

    fn offline_stage(
        &mut self,
        spec: &GlobalSpecification,
        _periodic: &[Task],
        _aperiodic: &[Task],
    ) -> Result<f64, SimulationError> {
        self.cores = spec.cpu.number_of_cores();
        debug!(policy = self.name(), cores = self.cores, "EDF offline stage");
        Ok(spec.simulation.dt)
    }

    fn schedule_policy(&mut self, ctx: &ScheduleContext<'_>) -> Decision {
        let mut assignment = self.select(ctx);
        if self.affinity {
            apply_affinity(&mut assignment, ctx.active);
        }
        Decision::new(assignment)
    }

    fn aperiodic_arrive(
        &mut self,
        _time: f64,
        _arrived: &[JobState],
        _frequencies: &[f64],
        _temperatures: Option<&[f64]>,
    ) -> bool {
        // rescheduled every step anyway
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn job(task_id: TaskId, deadline: f64) -> JobState {
        JobState {
            task_id,
            cycles: 1.0,
            period: Some(deadline),
            next_arrival: 0.0,
            next_deadline: deadline,
            pending_cycles: 1.0,
        }
    }

    fn policy(affinity: bool, cores: usize) -> GlobalEdf {
        let spec = testutil::edf_scenario(&[(1.0, 10.0)], cores, 1.0);
        let mut p = if affinity {
            GlobalEdf::with_affinity()
        } else {
            GlobalEdf::new()
        };
        p.offline_stage(&spec, spec.tasks.periodic(), spec.tasks.aperiodic())
            .unwrap();
        p
    }

    fn ctx<'a>(jobs: &'a [JobState], active: &'a [Option<TaskId>], f: &'a [f64]) -> ScheduleContext<'a> {
        ScheduleContext {
            time: 0.0,
            executable: jobs,
            active,
            frequencies: f,
            temperatures: None,
        }
    }

    #[test]
    fn two_earliest_deadlines_win() {
        let mut p = policy(false, 2);
        let jobs = [job(0, 9.0), job(1, 3.0), job(2, 5.0)];
        let d = p.schedule_policy(&ctx(&jobs, &[None, None], &[1.0, 1.0]));
        assert_eq!(d.assignment, vec![Some(1), Some(2)]);
        assert_eq!(d.next_quantum, None);
        assert_eq!(d.frequencies, None);
    }

    #[test]
    fn idle_fills_spare_cores() {
        let mut p = policy(false, 3);
        let jobs = [job(4, 2.0)];
        let d = p.schedule_policy(&ctx(&jobs, &[None; 3], &[1.0; 3]));
        assert_eq!(d.assignment, vec![Some(4), None, None]);
    }

    #[test]
    fn equal_deadlines_break_on_task_id() {
        let mut p = policy(false, 1);
        let jobs = [job(1, 7.0), job(0, 7.0)];
        let d = p.schedule_policy(&ctx(&jobs, &[Some(1)], &[1.0]));
        assert_eq!(d.assignment, vec![Some(0)]);
    }

    #[test]
    fn affinity_variant_keeps_running_job_on_ties() {
        let mut p = policy(true, 1);
        let jobs = [job(0, 7.0), job(1, 7.0)];
        let d = p.schedule_policy(&ctx(&jobs, &[Some(1)], &[1.0]));
        assert_eq!(d.assignment, vec![Some(1)]);
    }

    #[test]
    fn affinity_variant_keeps_cores() {
        let mut p = policy(true, 2);
        let jobs = [job(0, 3.0), job(1, 4.0)];
        // job 1 ran on core 0, job 0 on core 1
        let d = p.schedule_policy(&ctx(&jobs, &[Some(1), Some(0)], &[1.0, 1.0]));
        assert_eq!(d.assignment, vec![Some(1), Some(0)]);
    }

    #[test]
    fn quantum_is_the_simulation_step() {
        let spec = testutil::edf_scenario(&[(1.0, 10.0)], 1, 0.25);
        let mut p = GlobalEdf::new();
        let q = p
            .offline_stage(&spec, spec.tasks.periodic(), spec.tasks.aperiodic())
            .unwrap();
        assert_eq!(q, 0.25);
        assert!(!p.aperiodic_arrive(0.0, &[], &[1.0], None));
    }
}
