/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Time-continuous Petri nets.
//!
//! A [`PetriNet`] is pure data: incidence matrices `Pre`/`Post`
//! (places × transitions), the firing-rate vector `lambda`, the priority
//! matrix `pi` (transitions × places) and the initial marking `mo`.
//!
//! Two simulators advance a marking by one step `dt` under a control vector
//! (one multiplier per transition, `0` disables):
//!
//! * [`MatrixPowerSimulator`]: `pi` constant.  The update matrix
//!   `(I + A·dt/k)^k` with `A = C·diag(lambda ∘ control)·pi` is cached and
//!   recomputed only when the control (or `Post`/`lambda`) changes.
//! * [`MarkingDependentSimulator`]: `pi` rebuilt from the current marking on
//!   every micro-step, flow `min(lambda·control·h, pi·m)` clamped jointly so
//!   competing transitions never overdraw a place.

pub mod marking_dependent;
pub mod matrix_power;

pub use marking_dependent::MarkingDependentSimulator;
pub use matrix_power::MatrixPowerSimulator;

use nalgebra::{DMatrix, DVector};

use crate::scheduler::SimulationError;

// ── PetriNet ──────────────────────────────────────────────────────────────────

/// Matrices and initial marking of a continuous Petri net.
#[derive(Debug, Clone, PartialEq)]
pub struct PetriNet {
    /// places × transitions
    pub pre: DMatrix<f64>,
    /// places × transitions
    pub post: DMatrix<f64>,
    /// transitions × places
    pub pi: DMatrix<f64>,
    /// one rate per transition
    pub lambda: DVector<f64>,
    /// one marking per place
    pub mo: DVector<f64>,
}

impl PetriNet {
    /// Net with `places` places and `transitions` transitions, all zero.
    pub fn zeros(places: usize, transitions: usize) -> Self {
        Self {
            pre: DMatrix::zeros(places, transitions),
            post: DMatrix::zeros(places, transitions),
            pi: DMatrix::zeros(transitions, places),
            lambda: DVector::zeros(transitions),
            mo: DVector::zeros(places),
        }
    }

    /// Assemble a net and check every dimension.
    pub fn new(
        pre: DMatrix<f64>,
        post: DMatrix<f64>,
        pi: DMatrix<f64>,
        lambda: DVector<f64>,
        mo: DVector<f64>,
    ) -> Result<Self, SimulationError> {
        let net = Self {
            pre,
            post,
            pi,
            lambda,
            mo,
        };
        net.check_shapes()?;
        Ok(net)
    }

    pub fn places(&self) -> usize {
        self.pre.nrows()
    }

    pub fn transitions(&self) -> usize {
        self.pre.ncols()
    }

    /// `C = Post − Pre`
    pub fn incidence(&self) -> DMatrix<f64> {
        &self.post - &self.pre
    }

    /// `pi = Preᵀ` with every nonzero entry replaced by its reciprocal.
    ///
    /// Valid when each transition has a single input place.
    pub fn structural_pi(pre: &DMatrix<f64>) -> DMatrix<f64> {
        pre.transpose().map(|w| if w != 0.0 { 1.0 / w } else { 0.0 })
    }

    pub fn check_shapes(&self) -> Result<(), SimulationError> {
        let (p, t) = (self.places(), self.transitions());
        SimulationError::check_len("post rows", p, self.post.nrows())?;
        SimulationError::check_len("post columns", t, self.post.ncols())?;
        SimulationError::check_len("pi rows", t, self.pi.nrows())?;
        SimulationError::check_len("pi columns", p, self.pi.ncols())?;
        SimulationError::check_len("lambda", t, self.lambda.len())?;
        SimulationError::check_len("initial marking", p, self.mo.len())?;
        Ok(())
    }
}

// ── Simulator contract ────────────────────────────────────────────────────────

/// One-step advance of a marking under a control vector.
pub trait TcpnSimulator {
    /// Replace the control vector (length = transitions).
    fn set_control(&mut self, control: &DVector<f64>) -> Result<(), SimulationError>;

    /// Advance `mo` by one step `dt`.
    fn simulate_step(&mut self, mo: &DVector<f64>) -> DVector<f64>;

    /// Replace `Post` and `lambda` (the thermal net changes both when core
    /// frequencies change).
    fn set_post_and_lambda(
        &mut self,
        post: &DMatrix<f64>,
        lambda: &DVector<f64>,
    ) -> Result<(), SimulationError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_has_consistent_shapes() {
        let net = PetriNet::zeros(3, 2);
        assert_eq!(net.places(), 3);
        assert_eq!(net.transitions(), 2);
        assert!(net.check_shapes().is_ok());
    }

    #[test]
    fn new_rejects_wrong_lambda_length() {
        let err = PetriNet::new(
            DMatrix::zeros(2, 2),
            DMatrix::zeros(2, 2),
            DMatrix::zeros(2, 2),
            DVector::zeros(3),
            DVector::zeros(2),
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::ShapeMismatch { .. }));
    }

    #[test]
    fn structural_pi_inverts_arc_weights() {
        let pre = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 0.5]);
        let pi = PetriNet::structural_pi(&pre);
        assert_eq!(pi[(0, 0)], 0.5);
        assert_eq!(pi[(1, 1)], 2.0);
        assert_eq!(pi[(0, 1)], 0.0);
    }

    #[test]
    fn incidence_is_post_minus_pre() {
        let mut net = PetriNet::zeros(2, 1);
        net.pre[(0, 0)] = 1.0;
        net.post[(1, 0)] = 1.0;
        let c = net.incidence();
        assert_eq!(c[(0, 0)], -1.0);
        assert_eq!(c[(1, 0)], 1.0);
    }
}
