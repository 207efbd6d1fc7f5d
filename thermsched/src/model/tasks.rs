/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Task net: job arrivals and remaining-cycle places.

use crate::scheduler::SimulationError;
use crate::task::TaskSet;
use crate::tcpn::PetriNet;

use super::ProcessorLayout;

/// Fill the task net.
///
/// * periodic task `i`: `p_w` holds one token; `t_w` (rate `1/T`) keeps it
///   and adds `c/f_base` to `p_cc`, the fluid arrival of one job per period.
/// * every task: `p_cc` starts at `c/f_base` (seconds of work at base
///   frequency).  One `t_cc` per core drains it at rate 1, so under control
///   `w·f` the place loses `w·f` seconds of work per second until empty.
///
/// The transitions of this net compete for `p_cc`, so it is stepped with
/// marking-dependent priorities.
pub fn add_tasks_model(
    net: &mut PetriNet,
    layout: &ProcessorLayout,
    tasks: &TaskSet,
    base_frequency: f64,
) -> Result<(), SimulationError> {
    SimulationError::check_len("task net places", layout.places(), net.places())?;
    SimulationError::check_len(
        "task net transitions",
        layout.task_transitions(),
        net.transitions(),
    )?;

    for task in tasks.periodic() {
        let (p_w, p_cc) = (layout.waiting_place(task.id), layout.cycles_place(task.id));
        let t_w = layout.arrival_transition(task.id);
        let period = task.period().unwrap_or(f64::INFINITY);

        net.pre[(p_w, t_w)] = 1.0;
        net.post[(p_w, t_w)] = 1.0;
        net.post[(p_cc, t_w)] = task.execution_time(base_frequency);
        net.pi[(t_w, p_w)] = 1.0;
        net.lambda[t_w] = 1.0 / period;
        net.mo[p_w] = 1.0;
    }

    for task in tasks.iter() {
        let p_cc = layout.cycles_place(task.id);
        net.mo[p_cc] = task.execution_time(base_frequency);
        for core in 0..layout.cores {
            let t_cc = layout.consume_transition(task.id, core);
            net.pre[(p_cc, t_cc)] = 1.0;
            net.pi[(t_cc, p_cc)] = 1.0;
            net.lambda[t_cc] = 1.0;
        }
    }
    Ok(())
}
