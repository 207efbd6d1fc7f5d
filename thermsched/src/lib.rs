/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! thermsched – discrete-time simulator of multiprocessor real-time
//! scheduling with a time-continuous Petri net (TCPN) processor and thermal
//! model.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── task            – task / job records and the task set
//! ├── specification   – cpu, environment and simulation parameters
//! ├── config/         – YAML scenario loading
//! ├── hyperperiod/    – float LCM / GCD helpers
//! ├── tcpn/           – marking model and the two TCPN steppers
//! ├── model/          – processor and thermal net builders
//! ├── solver/         – GlobalModelSolver, one step of both nets
//! ├── scheduler/      – simulation engine, result, errors, feasibility gate
//! └── policy/         – policy trait, registry, EDF, JDEDS, OLDTFS
//! ```

pub mod config;
pub mod hyperperiod;
pub mod model;
pub mod policy;
pub mod scheduler;
pub mod solver;
pub mod specification;
pub mod task;
pub mod tcpn;

#[cfg(test)]
mod testutil;
