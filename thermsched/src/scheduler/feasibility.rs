/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Utilisation feasibility gate.
//!
//! # Theory
//! On `m` identical cores no schedule can meet every deadline of a periodic
//! task set whose total utilisation exceeds the platform capacity:
//!
//! $$U = \sum_{i=1}^{n} \frac{C_i}{f_{base} \, T_i} > m$$
//!
//! The gate is a necessary condition only.  A set that passes may still miss
//! deadlines under a given policy; the engine records those misses.
//!
//! `U` is rounded to the simulation's decimal precision before comparing, so
//! a set loading the cores exactly (`U == m`) is accepted.
//!
//! The gate is often stated as "fail on `U ≥ m`".  Here only `U > m` fails:
//! a fully loaded platform is still schedulable by a fluid policy, and a set
//! such as `3/7 + 4/7` on one core has to reach the policy and run.

use tracing::{debug, warn};

use crate::hyperperiod::math::round_to;
use crate::task::TaskSet;

use super::SimulationError;

// ── Public API ────────────────────────────────────────────────────────────────

/// Total periodic utilisation rounded to `decimals`.
pub fn total_utilization(tasks: &TaskSet, base_frequency: f64, decimals: u32) -> f64 {
    round_to(tasks.utilization(base_frequency), decimals)
}

/// Reject task sets whose utilisation exceeds `cores`.
///
/// Returns the rounded utilisation on success.
pub fn check_utilization(
    tasks: &TaskSet,
    cores: usize,
    base_frequency: f64,
    decimals: u32,
) -> Result<f64, SimulationError> {
    let utilization = total_utilization(tasks, base_frequency, decimals);

    if utilization > cores as f64 {
        warn!(utilization, cores, "Utilization gate rejected task set");
        return Err(SimulationError::UtilizationExceeded { utilization, cores });
    }

    debug!(utilization, cores, "Utilization gate passed");
    Ok(utilization)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
