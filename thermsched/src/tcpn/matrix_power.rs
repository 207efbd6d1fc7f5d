/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fixed-priority stepping with a cached update matrix.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::scheduler::SimulationError;
use crate::specification::SimulationPrecision;

use super::{PetriNet, TcpnSimulator};

/// Integrates `ṁ = C·diag(lambda ∘ control)·pi·m` with `k` explicit Euler
/// micro-steps composed into a single matrix `(I + A·dt/k)^k`.
///
/// The matrix is rebuilt only when the control vector differs from the last
/// one (exact equality), or when `Post`/`lambda` are replaced.
#[derive(Debug, Clone)]
pub struct MatrixPowerSimulator {
    pre: DMatrix<f64>,
    incidence: DMatrix<f64>,
    pi: DMatrix<f64>,
    lambda: DVector<f64>,
    control: DVector<f64>,
    step: f64,
    fragmentation: u32,
    precision: SimulationPrecision,
    step_matrix: DMatrix<f64>,
    recomputations: usize,
}

impl MatrixPowerSimulator {
    /// Simulator for `net` with all transitions enabled at nominal rate.
    pub fn new(
        net: &PetriNet,
        step: f64,
        fragmentation: u32,
        precision: SimulationPrecision,
    ) -> Result<Self, SimulationError> {
        net.check_shapes()?;
        let mut sim = Self {
            pre: net.pre.clone(),
            incidence: net.incidence(),
            pi: net.pi.clone(),
            lambda: net.lambda.clone(),
            control: DVector::from_element(net.transitions(), 1.0),
            step,
            fragmentation: fragmentation.max(1),
            precision,
            step_matrix: DMatrix::identity(net.places(), net.places()),
            recomputations: 0,
        };
        sim.recompute();
        Ok(sim)
    }

    /// Number of times the update matrix has been built.
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    /// Current control vector.
    pub fn control(&self) -> &DVector<f64> {
        &self.control
    }

    fn recompute(&mut self) {
        let places = self.incidence.nrows();
        let h = self.step / self.fragmentation as f64;

        let rates = self.lambda.component_mul(&self.control);
        let mut weighted = self.incidence.clone();
        for (j, mut col) in weighted.column_iter_mut().enumerate() {
            col *= rates[j] * h;
        }

        let mut one_step = &weighted * &self.pi;
        for i in 0..places {
            one_step[(i, i)] += 1.0;
        }
        self.precision.quantize_matrix(&mut one_step);

        self.step_matrix = matrix_power(&one_step, self.fragmentation);
        self.precision.quantize_matrix(&mut self.step_matrix);
        self.recomputations += 1;

        debug!(
            places,
            fragmentation = self.fragmentation,
            recomputations = self.recomputations,
            "TCPN step matrix recomputed"
        );
    }
}

impl TcpnSimulator for MatrixPowerSimulator {
    fn set_control(&mut self, control: &DVector<f64>) -> Result<(), SimulationError> {
        SimulationError::check_len("control vector", self.control.len(), control.len())?;
        if *control != self.control {
            self.control = control.clone();
            self.recompute();
        }
        Ok(())
    }

    fn simulate_step(&mut self, mo: &DVector<f64>) -> DVector<f64> {
        let mut next = &self.step_matrix * mo;
        self.precision.quantize_vector(&mut next);
        next
    }

    fn set_post_and_lambda(
        &mut self,
        post: &DMatrix<f64>,
        lambda: &DVector<f64>,
    ) -> Result<(), SimulationError> {
        SimulationError::check_len("post rows", self.pre.nrows(), post.nrows())?;
        SimulationError::check_len("post columns", self.pre.ncols(), post.ncols())?;
        SimulationError::check_len("lambda", self.lambda.len(), lambda.len())?;
        self.incidence = post - &self.pre;
        self.lambda = lambda.clone();
        self.recompute();
        Ok(())
    }
}

/// `base^exp` by repeated squaring.  `exp = 0` gives the identity.
pub fn matrix_power(base: &DMatrix<f64>, mut exp: u32) -> DMatrix<f64> {
    let n = base.nrows();
    let mut result = DMatrix::identity(n, n);
    let mut square = base.clone();
    while exp > 0 {
        if exp & 1 == 1 {
            result = &result * &square;
        }
        exp >>= 1;
        if exp > 0 {
            square = &square * &square;
        }
    }
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────
