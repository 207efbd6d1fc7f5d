/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the simulator.
//!
//! [`SimulationError`] is the single error type of the library: model
//! builders, the solver, the engine and the policies' offline stages all
//! return it.  Every variant aborts the run before the main loop starts, so
//! no partial [`SchedulerResult`](super::SchedulerResult) is ever produced.
//!
//! Bad decisions taken by a policy *during* the run are not errors: the
//! engine corrects them and logs a warning.

use thiserror::Error;

use crate::hyperperiod::HyperperiodError;

// ── Top-level simulation errors ───────────────────────────────────────────────

/// Top-level error type returned by
/// [`Simulator::run()`](super::Simulator::run).
///
/// | Variant | Raised by |
/// |---|---|
/// | `NoTasks` / `InvalidSpecification` | scenario validation |
/// | `UtilizationExceeded` | utilisation gate |
/// | `NotSchedulable` | policy pre-check |
/// | `OfflineInfeasible` | LP / thermal infeasibility in `offline_stage` |
/// | `SingularMatrix` | thermal operator inversion |
/// | `ShapeMismatch` | model builders / solver |
/// | `UnknownPolicy` | policy registry |
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The task set is empty.
    #[error("no tasks provided, task set is empty")]
    NoTasks,

    /// The scenario is structurally invalid (bad timing, frequencies, layout).
    #[error("invalid specification: {0}")]
    InvalidSpecification(String),

    /// Total utilisation does not fit on the available cores.
    #[error("task set is infeasible: utilization {utilization:.5} exceeds {cores} core(s)")]
    UtilizationExceeded { utilization: f64, cores: usize },

    /// The policy's own schedulability pre-check rejected the scenario.
    #[error("policy '{policy}' cannot schedule this scenario: {reason}")]
    NotSchedulable { policy: String, reason: String },

    /// The offline stage found no feasible solution (LP infeasible,
    /// thermal constraint violated, no usable frequency).
    #[error("policy '{policy}' offline stage is infeasible: {reason}")]
    OfflineInfeasible { policy: String, reason: String },

    /// A matrix that must be inverted is singular.
    #[error("singular matrix while computing {context}")]
    SingularMatrix { context: String },

    /// Task count, core count and matrix dimensions disagree.
    #[error("shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    /// The policy name is not in the registry.
    #[error("unknown scheduling policy: '{0}' (valid: G-EDF, G-EDF-A, JDEDS, OLDTFS)")]
    UnknownPolicy(String),

    /// The hyperperiod could not be computed.
    #[error("hyperperiod: {0}")]
    Hyperperiod(#[from] HyperperiodError),
}

impl SimulationError {
    /// Shorthand used by builders when checking a dimension.
    pub(crate) fn check_len(what: &str, expected: usize, found: usize) -> Result<(), Self> {
        if expected == found {
            Ok(())
        } else {
            Err(SimulationError::ShapeMismatch {
                what: what.to_string(),
                expected,
                found,
            })
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_len_accepts_equal_sizes() {
        assert!(SimulationError::check_len("alloc vector", 4, 4).is_ok());
    }

    #[test]
    fn check_len_reports_both_sizes() {
        let err = SimulationError::check_len("alloc vector", 4, 3).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("alloc vector"), "{msg}");
        assert!(msg.contains("expected 4"), "{msg}");
        assert!(msg.contains("found 3"), "{msg}");
    }

    #[test]
    fn hyperperiod_error_converts() {
        let err: SimulationError = HyperperiodError::NoValidPeriods.into();
        assert!(matches!(err, SimulationError::Hyperperiod(_)));
    }

    #[test]
    fn utilization_message_names_core_count() {
        let err = SimulationError::UtilizationExceeded {
            utilization: 1.1,
            cores: 1,
        };
        assert!(err.to_string().contains("1 core(s)"));
    }
}
