/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Marking-dependent stepping for nets whose transitions compete for tokens.

use nalgebra::{DMatrix, DVector};

use crate::scheduler::SimulationError;
use crate::specification::SimulationPrecision;

use super::{PetriNet, TcpnSimulator};

/// Euler stepping with `pi` rebuilt from the marking on every micro-step.
///
/// For each transition the tightest input place (minimum `marking / arc`) is
/// selected and `pi[t, place] = 1 / arc`; an empty input place disables the
/// transition.  The flow of a micro-step of length `h` is
/// `min(lambda·control·h, pi·m)`: a transition fires at its constant rate
/// until the enabling degree runs out.  When several transitions drain the
/// same place their flows are scaled down together so the place never goes
/// negative.
#[derive(Debug, Clone)]
pub struct MarkingDependentSimulator {
    pre: DMatrix<f64>,
    incidence: DMatrix<f64>,
    lambda: DVector<f64>,
    control: DVector<f64>,
    step: f64,
    fragmentation: u32,
    precision: SimulationPrecision,
}

impl MarkingDependentSimulator {
    pub fn new(
        net: &PetriNet,
        step: f64,
        fragmentation: u32,
        precision: SimulationPrecision,
    ) -> Result<Self, SimulationError> {
        net.check_shapes()?;
        Ok(Self {
            pre: net.pre.clone(),
            incidence: net.incidence(),
            lambda: net.lambda.clone(),
            control: DVector::from_element(net.transitions(), 1.0),
            step,
            fragmentation: fragmentation.max(1),
            precision,
        })
    }

    /// Priority matrix for the marking `mo`.
    pub fn priority_matrix(&self, mo: &DVector<f64>) -> DMatrix<f64> {
        let (places, transitions) = self.pre.shape();
        let mut pi = DMatrix::zeros(transitions, places);

        for t in 0..transitions {
            let mut tightest: Option<(usize, f64)> = None;
            for p in 0..places {
                let arc = self.pre[(p, t)];
                if arc <= 0.0 {
                    continue;
                }
                let ratio = mo[p] / arc;
                if tightest.map_or(true, |(_, best)| ratio < best) {
                    tightest = Some((p, ratio));
                }
            }
            if let Some((p, ratio)) = tightest {
                if ratio > 0.0 {
                    pi[(t, p)] = 1.0 / self.pre[(p, t)];
                }
            }
        }
        pi
    }

    fn micro_step(&self, mo: &DVector<f64>, h: f64) -> DVector<f64> {
        let pi = self.priority_matrix(mo);
        let available = &pi * mo;
        let transitions = self.lambda.len();

        let mut flow = DVector::from_fn(transitions, |t, _| {
            (self.lambda[t] * self.control[t] * h)
                .min(available[t])
                .max(0.0)
        });

        // joint bound: Σ_t Pre[p,t]·flow[t] ≤ m[p]
        let demand = &self.pre * &flow;
        let mut scale = DVector::from_element(transitions, 1.0);
        for p in 0..mo.len() {
            if demand[p] > mo[p] && demand[p] > 0.0 {
                let ratio = (mo[p] / demand[p]).max(0.0);
                for t in 0..transitions {
                    if self.pre[(p, t)] > 0.0 && ratio < scale[t] {
                        scale[t] = ratio;
                    }
                }
            }
        }
        flow.component_mul_assign(&scale);

        let mut next = &self.incidence * &flow + mo;
        self.precision.quantize_vector(&mut next);
        next
    }
}

impl TcpnSimulator for MarkingDependentSimulator {
    fn set_control(&mut self, control: &DVector<f64>) -> Result<(), SimulationError> {
        SimulationError::check_len("control vector", self.control.len(), control.len())?;
        self.control = control.clone();
        Ok(())
    }

    fn simulate_step(&mut self, mo: &DVector<f64>) -> DVector<f64> {
        let h = self.step / self.fragmentation as f64;
        let mut current = mo.clone();
        for _ in 0..self.fragmentation {
            current = self.micro_step(&current, h);
        }
        current
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
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
