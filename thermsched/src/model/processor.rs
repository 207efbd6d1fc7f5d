/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Processor sub-net: one idle token per core cycling through busy places.
//!
//! Per core and task, `t_alloc` moves the idle token to the busy place and
//! `t_exec` returns it while depositing progress in the exec place.  Both
//! run at the same rate, so with a task fully allocated the busy place
//! settles at `1/2` and an exec arc of `2/rate` accrues one second of work
//! per second at relative frequency 1.
//!
//! Every transition has a single input place, so `pi` is constant and the
//! net is stepped with the cached matrix power.

use crate::scheduler::SimulationError;
use crate::tcpn::PetriNet;

use super::ProcessorLayout;

pub fn add_processor_model(
    net: &mut PetriNet,
    layout: &ProcessorLayout,
    rate: f64,
) -> Result<(), SimulationError> {
    SimulationError::check_len("processor places", layout.places(), net.places())?;
    SimulationError::check_len("processor transitions", layout.transitions(), net.transitions())?;

    for core in 0..layout.cores {
        let idle = layout.idle_place(core);
        net.mo[idle] = 1.0;

        for task in 0..layout.tasks() {
            let busy = layout.busy_place(task, core);
            let exec = layout.exec_place(task, core);

            let t_alloc = layout.alloc_transition(task, core);
            net.pre[(idle, t_alloc)] = 1.0;
            net.post[(busy, t_alloc)] = 1.0;
            net.pi[(t_alloc, idle)] = 1.0;
            net.lambda[t_alloc] = rate;

            let t_exec = layout.exec_transition(task, core);
            net.pre[(busy, t_exec)] = 1.0;
            net.post[(exec, t_exec)] = 2.0 / rate;
            net.post[(idle, t_exec)] = 1.0;
            net.pi[(t_exec, busy)] = 1.0;
            net.lambda[t_exec] = rate;
        }
    }
    Ok(())
}
