/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduling engine.
//!
//! [`Simulator`] drives one run: it validates the scenario, builds the
//! global model, lets the policy prepare in its offline stage and then
//! advances time in steps of `dt` over one hyperperiod.
//!
//! ```text
//! setup:  validate ─► utilisation gate ─► policy pre-check ─► hyperperiod
//!         ─► GlobalModel + solver ─► offline_stage() → quantum
//! step:   aperiodic arrivals ─► scheduling point? ─► validate decision
//!         ─► execute + solver.run_step() ─► record ─► deadlines / renewal
//! ```
//!
//! # Design decisions
//!
//! | Topic | Choice |
//! |---|---|
//! | Job state | Arena of [`JobState`] indexed by task id, owned by the engine |
//! | Policy state | Owned by the policy, mutated only through its own calls |
//! | Bad decisions | Corrected and counted, never fatal |
//! | Float comparisons | Times compared in whole steps, cycles after rounding |
//! | Aperiodic jobs | Renewed every hyperperiod |
//!
//! # Example
//! ```rust,ignore
//! let spec = ScenarioLoader::load_from_file(Path::new("scenario.yaml"))?;
//! let result = Simulator::new(spec)?.run_by_name("G-EDF")?;
//! println!("{} deadline misses", result.deadline_misses().len());
//! ```

pub mod error;
pub mod feasibility;
pub mod result;

pub use error::SimulationError;
pub use result::{DeadlineMiss, SchedulerResult};

use tracing::{debug, info, warn};

use crate::hyperperiod::HyperperiodCalculator;
use crate::model::GlobalModel;
use crate::policy::{create_policy, Decision, ScheduleContext, SchedulingPolicy};
use crate::solver::GlobalModelSolver;
use crate::specification::GlobalSpecification;
use crate::task::{JobState, TaskId};

use feasibility::check_utilization;

/// Relative tolerance when matching a requested frequency to the platform.
const FREQUENCY_TOLERANCE: f64 = 1e-9;

// ── Simulator ─────────────────────────────────────────────────────────────────

/// Runs scheduling policies against one validated scenario.
///
/// The scenario is immutable; every [`run`](Self::run) starts from scratch,
/// so the same `Simulator` can compare several policies.
#[derive(Debug, Clone)]
pub struct Simulator {
    spec: GlobalSpecification,
}

impl Simulator {
    /// # Errors
    /// [`SimulationError::NoTasks`] or
    /// [`SimulationError::InvalidSpecification`] when the scenario is not
    /// usable.
    pub fn new(spec: GlobalSpecification) -> Result<Self, SimulationError> {
        spec.validate()?;
        Ok(Self { spec })
    }

    pub fn spec(&self) -> &GlobalSpecification {
        &self.spec
    }

    /// Run the policy registered under `name`.
    pub fn run_by_name(&self, name: &str) -> Result<SchedulerResult, SimulationError> {
        self.run(create_policy(name)?)
    }

    /// Simulate one hyperperiod under `policy`.
    ///
    /// # Errors
    /// Every error aborts the run before the first step; policy mistakes
    /// made during the loop are corrected instead (see
    /// [`SchedulerResult::corrections`]).
    pub fn run(
        &self,
        mut policy: Box<dyn SchedulingPolicy>,
    ) -> Result<SchedulerResult, SimulationError> {
        let spec = &self.spec;
        let sim = &spec.simulation;
        let periodic = spec.tasks.periodic();
        let aperiodic = spec.tasks.aperiodic();
        let cores = spec.cpu.number_of_cores();
        let base = spec.cpu.cores.base_frequency();

        info!(
            policy = policy.name(),
            periodic = periodic.len(),
            aperiodic = aperiodic.len(),
            cores,
            "=== Simulator::run() ==="
        );

        // ── Preconditions ─────────────────────────────────────────────────────
        if sim.utilization_gate {
            check_utilization(&spec.tasks, cores, base, sim.float_decimals)?;
        }
        if let (false, reason) = policy.check_schedulability(spec) {
            return Err(SimulationError::NotSchedulable {
                policy: policy.name().to_string(),
                reason: reason.unwrap_or_else(|| "rejected by policy".into()),
            });
        }

        let hyperperiod = if periodic.is_empty() {
            aperiodic
                .iter()
                .map(|t| t.first_deadline())
                .fold(0.0, f64::max)
        } else {
            HyperperiodCalculator::new().calculate(periodic)?.hyperperiod
        };

        // ── Setup ─────────────────────────────────────────────────────────────
        let model = GlobalModel::build(spec)?;
        let mut solver = GlobalModelSolver::new(model, spec)?;
        let mut jobs: Vec<JobState> = spec.tasks.iter().map(JobState::new).collect();

        let quantum = policy.offline_stage(spec, periodic, aperiodic)?;
        let quantum_steps = self.steps_ceil(quantum);
        let total_steps = self.steps(hyperperiod).max(0) as usize;
        info!(
            policy = policy.name(),
            quantum,
            quantum_steps,
            hyperperiod,
            steps = total_steps,
            "Offline stage complete"
        );

        let mut result = SchedulerResult::new(
            policy.name(),
            jobs.len(),
            cores,
            sim.dt,
            quantum,
            hyperperiod,
            sim.simulate_thermal,
        );

        let layout = *solver.layout();
        let available = spec.cpu.cores.relative_frequencies();
        let mut frequencies = spec.cpu.cores.initial_relative_frequencies();
        let mut active: Vec<Option<TaskId>> = vec![None; cores];
        let mut assignment: Vec<Option<TaskId>> = vec![None; cores];
        let mut execution = vec![0.0; layout.allocations()];
        let mut temperatures: Option<Vec<f64>> = None;
        let mut countdown = 0usize;

        // ── Main loop ─────────────────────────────────────────────────────────
        for step in 0..total_steps {
            let time = spec.round(step as f64 * sim.dt);

            let arrived: Vec<JobState> = jobs
                .iter()
                .filter(|j| !j.is_periodic() && self.steps(j.next_arrival) == step as i64)
                .cloned()
                .collect();
            if !arrived.is_empty() {
                debug!(time, count = arrived.len(), "Aperiodic arrival");
                let temps = temperatures.as_deref();
                if policy.aperiodic_arrive(time, &arrived, &frequencies, temps) {
                    countdown = 0;
                }
            }

            if countdown == 0 {
                let executable: Vec<JobState> = jobs
                    .iter()
                    .filter(|j| self.is_executable(j, step))
                    .cloned()
                    .collect();
                let decision = policy.schedule_policy(&ScheduleContext {
                    time,
                    executable: &executable,
                    active: &active,
                    frequencies: &frequencies,
                    temperatures: temperatures.as_deref(),
                });
                countdown = decision
                    .next_quantum
                    .map(|q| self.steps_ceil(q))
                    .unwrap_or(quantum_steps);

                let corrected = self.apply_decision(
                    decision,
                    &executable,
                    &available,
                    &mut assignment,
                    &mut frequencies,
                );
                if corrected > 0 {
                    result.record_corrections(corrected);
                }
                debug!(time, ?assignment, ?frequencies, "Scheduling point");
            }

            // ── Execution ─────────────────────────────────────────────────────
            let mut w_alloc = vec![0.0; layout.allocations()];
            let mut ran: Vec<Option<TaskId>> = vec![None; cores];
            for (core, slot) in assignment.iter().enumerate() {
                let Some(id) = *slot else { continue };
                let job = &mut jobs[id];
                if !self.is_executable(job, step) {
                    continue;
                }
                let executed = sim.dt * frequencies[core] * base;
                job.pending_cycles = (job.pending_cycles - executed).max(0.0);
                let idx = layout.alloc_index(id, core);
                w_alloc[idx] = 1.0;
                execution[idx] += sim.dt;
                ran[core] = Some(id);
            }

            let out = solver.run_step(&w_alloc, &frequencies)?;
            result.record_step(
                time,
                ran.clone(),
                execution.clone(),
                out.accumulated_exec.iter().copied().collect(),
                frequencies.iter().map(|f| f * base).collect(),
            );
            result.record_thermal(
                out.board_temperature,
                out.cores_temperature.clone(),
                out.energy_consumption,
            );
            temperatures = out.cores_temperature;
            active = ran;
            countdown = countdown.saturating_sub(1);

            // ── Deadlines and renewal ─────────────────────────────────────────
            for job in jobs.iter_mut() {
                while self.steps(job.next_deadline) <= step as i64 + 1 {
                    if spec.round(job.pending_cycles) > 0.0 {
                        warn!(
                            task = job.task_id,
                            deadline = job.next_deadline,
                            pending_cycles = job.pending_cycles,
                            "Deadline miss"
                        );
                        result.record_miss(DeadlineMiss {
                            task: job.task_id,
                            job_deadline: job.next_deadline,
                            pending_cycles: job.pending_cycles,
                        });
                    }
                    let shift = job.period.unwrap_or(hyperperiod);
                    if shift <= 0.0 {
                        break;
                    }
                    job.next_arrival += shift;
                    job.next_deadline += shift;
                    job.pending_cycles = job.cycles;
                }
            }
        }

        info!(
            policy = result.policy(),
            steps = result.steps(),
            deadline_misses = result.deadline_misses().len(),
            corrections = result.corrections(),
            "=== Simulation complete ==="
        );
        Ok(result)
    }

    // ── Step arithmetic ───────────────────────────────────────────────────────

    /// `seconds` as a whole number of steps.
    fn steps(&self, seconds: f64) -> i64 {
        self.spec.round(seconds / self.spec.simulation.dt).round() as i64
    }

    /// `seconds` rounded up to whole steps, at least one.
    fn steps_ceil(&self, seconds: f64) -> usize {
        (self.spec.round(seconds / self.spec.simulation.dt).ceil() as usize).max(1)
    }

    fn is_executable(&self, job: &JobState, step: usize) -> bool {
        self.steps(job.next_arrival) <= step as i64 && self.spec.round(job.pending_cycles) > 0.0
    }

    // ── Decision validation ───────────────────────────────────────────────────

    /// Install `decision` into `assignment` and `frequencies`, correcting
    /// what the platform cannot run.  Returns the number of corrections.
    fn apply_decision(
        &self,
        decision: Decision,
        executable: &[JobState],
        available: &[f64],
        assignment: &mut Vec<Option<TaskId>>,
        frequencies: &mut [f64],
    ) -> usize {
        let cores = frequencies.len();
        let tasks = self.spec.tasks.len();
        let validate = self.spec.simulation.validate_decisions;
        let mut corrections = 0usize;

        let mut next = decision.assignment;
        if next.len() != cores {
            warn!(expected = cores, found = next.len(), "Assignment length corrected");
            next.resize(cores, None);
            corrections += 1;
        }

        for core in 0..cores {
            let Some(id) = next[core] else { continue };
            let runnable = executable.iter().any(|j| j.task_id == id);
            let duplicate = next[..core].contains(&Some(id));
            if id >= tasks || (validate && (!runnable || duplicate)) {
                warn!(core, task = id, runnable, duplicate, "Invalid assignment set to idle");
                next[core] = None;
                corrections += 1;
            }
        }
        *assignment = next;

        let Some(requested) = decision.frequencies else {
            return corrections;
        };
        if requested.len() != cores {
            warn!(expected = cores, found = requested.len(), "Frequency vector ignored");
            return corrections + 1;
        }
        for (core, f) in requested.into_iter().enumerate() {
            let valid = available
                .iter()
                .any(|a| (a - f).abs() <= FREQUENCY_TOLERANCE * a.abs().max(1.0));
            if validate && !valid {
                warn!(core, frequency = f, kept = frequencies[core], "Invalid frequency ignored");
                corrections += 1;
                continue;
            }
            frequencies[core] = f;
        }
        corrections
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::GlobalEdf;
    use crate::task::Task;
    use crate::testutil;

    fn run(spec: GlobalSpecification, policy: &str) -> Result<SchedulerResult, SimulationError> {
        Simulator::new(spec)?.run_by_name(policy)
    }

    /// Policy that always asks for something the platform cannot do.
    struct Unruly;

    impl SchedulingPolicy for Unruly {
        fn name(&self) -> &'static str {
            "unruly"
        }

        fn offline_stage(
            &mut self,
            spec: &GlobalSpecification,
            _periodic: &[Task],
            _aperiodic: &[Task],
        ) -> Result<f64, SimulationError> {
            Ok(spec.simulation.dt)
        }

        fn schedule_policy(&mut self, _ctx: &ScheduleContext<'_>) -> Decision {
            // too long, unknown task, unavailable frequency
            Decision::new(vec![Some(42), Some(0), Some(0)]).with_frequencies(vec![0.3, 1.0])
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

    // ── EDF behaviour ─────────────────────────────────────────────────────────

    #[test]
    fn edf_runs_tasks_back_to_back() {
        let spec = testutil::edf_scenario(&[(3.0, 7.0), (4.0, 7.0)], 1, 1.0);
        let r = run(spec, "G-EDF").unwrap();
        assert_eq!(r.steps(), 7);
        let expected = [0, 0, 0, 1, 1, 1, 1];
        for (step, task) in expected.iter().enumerate() {
            assert_eq!(r.assignments()[step], vec![Some(*task)], "step {step}");
        }
        assert!(r.deadline_misses().is_empty());
        let last = r.accumulated_execution().last().unwrap();
        assert_eq!(last, &vec![3.0, 4.0]);
    }

    #[test]
    fn idle_core_when_nothing_is_pending() {
        let spec = testutil::edf_scenario(&[(1.0, 4.0)], 2, 1.0);
        let r = run(spec, "G-EDF").unwrap();
        assert_eq!(r.assignments()[0], vec![Some(0), None]);
        assert_eq!(r.assignments()[1], vec![None, None]);
    }

    #[test]
    fn periodic_jobs_are_renewed() {
        let spec = testutil::edf_scenario(&[(1.0, 2.0), (1.0, 4.0)], 1, 1.0);
        let r = run(spec, "G-EDF").unwrap();
        let ran: Vec<Option<TaskId>> = r.assignments().iter().map(|a| a[0]).collect();
        assert_eq!(ran, vec![Some(0), Some(1), Some(0), None]);
        assert!(r.deadline_misses().is_empty());
    }

    // ── Feasibility ───────────────────────────────────────────────────────────

    #[test]
    fn half_loaded_core_passes_the_gate() {
        assert!(run(testutil::edf_scenario(&[(5.0, 10.0)], 1, 1.0), "G-EDF").is_ok());
    }

    #[test]
    fn overloaded_core_fails_before_simulating() {
        let err = run(testutil::edf_scenario(&[(11.0, 10.0)], 1, 1.0), "G-EDF").unwrap_err();
        assert!(matches!(err, SimulationError::UtilizationExceeded { .. }), "{err}");
    }

    #[test]
    fn overload_without_gate_records_misses() {
        let mut spec = testutil::edf_scenario(&[(6.0, 5.0)], 1, 1.0);
        spec.simulation.utilization_gate = false;
        let r = run(spec, "G-EDF").unwrap();
        assert!(!r.deadline_misses().is_empty());
        let miss = &r.deadline_misses()[0];
        assert_eq!(miss.task, 0);
        assert_eq!(miss.job_deadline, 5.0);
        assert!((miss.pending_cycles - 1.0).abs() < 1e-9);
    }

    #[test]
    fn policy_pre_check_rejects_scenario() {
        let spec = testutil::scenario(
            testutil::implicit_tasks(&[(1.0, 4.0)]),
            vec![Task::aperiodic(1.0, 0.0, 2.0)],
            1,
            vec![1.0],
            1.0,
        );
        let err = run(spec, "OLDTFS").unwrap_err();
        assert!(matches!(err, SimulationError::NotSchedulable { .. }), "{err}");
    }

    #[test]
    fn unknown_policy_is_an_error() {
        let spec = testutil::edf_scenario(&[(1.0, 4.0)], 1, 1.0);
        assert!(matches!(
            run(spec, "LLF"),
            Err(SimulationError::UnknownPolicy(_))
        ));
    }

    // ── Result properties ─────────────────────────────────────────────────────

    #[test]
    fn accumulated_execution_is_monotone_and_matches_allocation() {
        let spec = testutil::edf_scenario(&[(2.0, 4.0), (3.0, 8.0), (1.0, 8.0)], 2, 0.5);
        let r = run(spec, "G-EDF-A").unwrap();
        let n = r.tasks();
        for pair in r.accumulated_execution().windows(2) {
            assert!(pair[0].iter().zip(&pair[1]).all(|(a, b)| a <= b));
        }
        let last = r.accumulated_execution().last().unwrap();
        for core in 0..r.cores() {
            for task in 0..n {
                let allocated: f64 = (0..r.steps())
                    .map(|s| r.allocation(s, task, core) * r.dt())
                    .sum();
                assert!((last[core * n + task] - allocated).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn fluid_execution_tracks_engine_execution() {
        let spec = testutil::edf_scenario(&[(2.0, 4.0)], 1, 0.5);
        let r = run(spec, "G-EDF").unwrap();
        let exact = r.accumulated_execution().last().unwrap()[0];
        let fluid = r.fluid_execution().last().unwrap()[0];
        assert!((exact - fluid).abs() < 0.1, "exact {exact}, fluid {fluid}");
    }

    #[test]
    fn recorded_frequencies_are_available() {
        let spec = testutil::scenario(
            testutil::implicit_tasks(&[(200.0, 0.5), (300.0, 1.0), (400.0, 1.0)]),
            vec![],
            2,
            vec![500.0, 1000.0],
            0.01,
        );
        let r = run(spec, "JDEDS").unwrap();
        assert!(r
            .frequencies()
            .iter()
            .flatten()
            .all(|f| *f == 500.0 || *f == 1000.0));
    }

    #[test]
    fn invalid_decisions_are_corrected() {
        let spec = testutil::scenario(
            testutil::implicit_tasks(&[(1.0, 2.0)]),
            vec![],
            2,
            vec![0.5, 1.0],
            1.0,
        );
        let r = Simulator::new(spec).unwrap().run(Box::new(Unruly)).unwrap();
        // step 0: length, unknown id, frequency 0.3
        // step 1: the same plus the finished job
        assert_eq!(r.steps(), 2);
        assert_eq!(r.corrections(), 7);
        assert_eq!(r.assignments()[0], vec![None, Some(0)]);
        assert_eq!(r.frequencies()[0], vec![1.0, 1.0]);
    }

    #[test]
    fn runs_are_deterministic() {
        let spec = testutil::edf_scenario(&[(2.0, 4.0), (3.0, 6.0), (1.0, 12.0)], 2, 0.5);
        let sim = Simulator::new(spec).unwrap();
        let a = sim.run(Box::new(GlobalEdf::with_affinity())).unwrap();
        let b = sim.run(Box::new(GlobalEdf::with_affinity())).unwrap();
        assert_eq!(a, b);
    }

    // ── Aperiodic jobs ────────────────────────────────────────────────────────

    #[test]
    fn aperiodic_job_runs_after_arrival() {
        let spec = testutil::scenario(
            testutil::implicit_tasks(&[(1.0, 4.0)]),
            vec![Task::aperiodic(1.0, 2.0, 4.0)],
            1,
            vec![1.0],
            1.0,
        );
        let r = run(spec, "G-EDF").unwrap();
        let ran: Vec<Option<TaskId>> = r.assignments().iter().map(|a| a[0]).collect();
        assert_eq!(ran, vec![Some(0), None, Some(1), None]);
    }

    #[test]
    fn jdeds_admits_aperiodic_job() {
        let spec = testutil::scenario(
            testutil::implicit_tasks(&[(200.0, 0.5), (300.0, 1.0)]),
            vec![Task::aperiodic(100.0, 0.2, 0.5)],
            2,
            vec![500.0, 1000.0],
            0.01,
        );
        let r = run(spec, "JDEDS").unwrap();
        let aperiodic_ran = r.assignments().iter().flatten().any(|a| *a == Some(2));
        assert!(aperiodic_ran);
    }

    // ── Thermal ───────────────────────────────────────────────────────────────

    #[test]
    fn thermal_run_records_every_series() {
        let r = run(testutil::thermal_scenario(), "G-EDF").unwrap();
        let steps = r.steps();
        assert_eq!(r.cores_temperature().map(|s| s.len()), Some(steps));
        assert_eq!(r.board_temperature().map(|s| s.len()), Some(steps));
        assert_eq!(r.energy().map(|s| s.len()), Some(steps));
        let hottest = r.max_core_temperatures().unwrap();
        assert!(hottest.iter().all(|t| *t >= 45.0 - 1e-6), "{hottest:?}");
        assert!(r.energy_per_core().unwrap().iter().any(|e| *e > 0.0));
    }

    #[test]
    fn oldtfs_completes_a_thermal_run() {
        let mut spec = testutil::thermal_scenario();
        // the fixture board cannot shed watts within the default limit
        spec.environment.t_max = 1e6;
        let r = run(spec, "OLDTFS").unwrap();
        assert!(r.steps() > 0);
        assert!(r.quantum() >= 0.01);
    }
}
