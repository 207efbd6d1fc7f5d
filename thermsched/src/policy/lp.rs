/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Thin linear-programming layer over `minilp`.
//!
//! Policies describe a problem with dense variable indices and get back a
//! plain vector of values, so the solver crate stays an implementation
//! detail of this module.

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};
use thiserror::Error;
use tracing::debug;

use crate::scheduler::SimulationError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LpError {
    #[error("linear program is infeasible")]
    Infeasible,

    #[error("linear program is unbounded")]
    Unbounded,

    #[error("linear program solver failed: {0}")]
    Solver(String),
}

impl LpError {
    /// Wrap as the offline-stage failure of `policy`.
    pub fn into_offline(self, policy: &str, what: &str) -> SimulationError {
        SimulationError::OfflineInfeasible {
            policy: policy.to_string(),
            reason: format!("{what}: {self}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Le,
    Eq,
    Ge,
}

#[derive(Debug, Clone)]
struct Row {
    terms: Vec<(usize, f64)>,
    relation: Relation,
    rhs: f64,
}

/// Linear program over `n` variables.  Variables default to `[0, +∞)`.
#[derive(Debug, Clone)]
pub struct LinearProgram {
    maximize: bool,
    objective: Vec<f64>,
    bounds: Vec<(f64, f64)>,
    rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    pub values: Vec<f64>,
    pub objective: f64,
}

impl LinearProgram {
    pub fn maximize(variables: usize) -> Self {
        Self::new(true, variables)
    }

    pub fn minimize(variables: usize) -> Self {
        Self::new(false, variables)
    }

    fn new(maximize: bool, variables: usize) -> Self {
        Self {
            maximize,
            objective: vec![0.0; variables],
            bounds: vec![(0.0, f64::INFINITY); variables],
            rows: Vec::new(),
        }
    }

    pub fn variables(&self) -> usize {
        self.objective.len()
    }

    pub fn constraints(&self) -> usize {
        self.rows.len()
    }

    pub fn set_objective(&mut self, var: usize, coefficient: f64) {
        self.objective[var] = coefficient;
    }

    pub fn set_bounds(&mut self, var: usize, lower: f64, upper: f64) {
        self.bounds[var] = (lower, upper);
    }

    /// Add `Σ coef·x[var] (relation) rhs`.  Terms on the same variable add up.
    pub fn add_constraint(&mut self, terms: Vec<(usize, f64)>, relation: Relation, rhs: f64) {
        self.rows.push(Row {
            terms,
            relation,
            rhs,
        });
    }

    pub fn solve(&self) -> Result<LpSolution, LpError> {
        let direction = if self.maximize {
            OptimizationDirection::Maximize
        } else {
            OptimizationDirection::Minimize
        };
        let mut problem = Problem::new(direction);
        let vars: Vec<_> = self
            .objective
            .iter()
            .zip(&self.bounds)
            .map(|(&c, &bounds)| problem.add_var(c, bounds))
            .collect();

        for row in &self.rows {
            let mut expr = LinearExpr::empty();
            for &(var, coef) in &row.terms {
                if coef != 0.0 {
                    expr.add(vars[var], coef);
                }
            }
            let op = match row.relation {
                Relation::Le => ComparisonOp::Le,
                Relation::Eq => ComparisonOp::Eq,
                Relation::Ge => ComparisonOp::Ge,
            };
            problem.add_constraint(expr, op, row.rhs);
        }

        let solution = problem.solve().map_err(|e| match e {
            minilp::Error::Infeasible => LpError::Infeasible,
            minilp::Error::Unbounded => LpError::Unbounded,
            #[allow(unreachable_patterns)]
            other => LpError::Solver(format!("{other:?}")),
        })?;

        let values: Vec<f64> = vars.iter().map(|&v| solution[v]).collect();
        debug!(
            variables = values.len(),
            constraints = self.rows.len(),
            objective = solution.objective(),
            "Linear program solved"
        );
        Ok(LpSolution {
            values,
            objective: solution.objective(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maximize_simple_program() {
        // max x + y  s.t.  x + 2y <= 4,  3x + y <= 6
        let mut lp = LinearProgram::maximize(2);
        lp.set_objective(0, 1.0);
        lp.set_objective(1, 1.0);
        lp.add_constraint(vec![(0, 1.0), (1, 2.0)], Relation::Le, 4.0);
        lp.add_constraint(vec![(0, 3.0), (1, 1.0)], Relation::Le, 6.0);
        let s = lp.solve().unwrap();
        assert!((s.values[0] - 1.6).abs() < 1e-6);
        assert!((s.values[1] - 1.2).abs() < 1e-6);
        assert!((s.objective - 2.8).abs() < 1e-6);
    }

    #[test]
    fn equality_and_bounds_are_honoured() {
        let mut lp = LinearProgram::minimize(2);
        lp.set_objective(0, 1.0);
        lp.set_bounds(1, 0.0, 1.0);
        lp.add_constraint(vec![(0, 1.0), (1, 1.0)], Relation::Eq, 3.0);
        let s = lp.solve().unwrap();
        assert!((s.values[1] - 1.0).abs() < 1e-9);
        assert!((s.values[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn infeasible_program_is_reported() {
        let mut lp = LinearProgram::maximize(1);
        lp.add_constraint(vec![(0, 1.0)], Relation::Ge, 2.0);
        lp.add_constraint(vec![(0, 1.0)], Relation::Le, 1.0);
        assert_eq!(lp.solve().unwrap_err(), LpError::Infeasible);
    }

    #[test]
    fn offline_wrapping_keeps_the_reason() {
        let err = LpError::Infeasible.into_offline("JDEDS", "interval LP");
        let msg = err.to_string();
        assert!(msg.contains("JDEDS") && msg.contains("interval LP"), "{msg}");
    }
}
