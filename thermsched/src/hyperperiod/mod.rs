/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hyperperiod calculation.
//!
//! The hyperperiod of a set of periodic tasks is the Least Common Multiple
//! (LCM) of all their periods.  It is the length of one simulation run.
//!
//! Periods are real numbers (seconds).  They are resolved to 10 µs ticks
//! ([`TICKS_PER_SECOND`]): each one is rounded to an integer count of ticks, reduced with the overflow-checked
//! integer LCM from [`math`] and scaled back.  Decimal periods such as `0.1`
//! and `0.3` are whole tick counts, so their LCM is exact (`0.3`); a binary
//! scale would round `0.1` to a tick count that shares no factors with the
//! others and inflate the hyperperiod.

pub mod math;

use tracing::{debug, info, warn};

use crate::task::Task;
use math::lcm_of_slice;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Ticks per second periods are rounded to before the integer LCM.
pub const TICKS_PER_SECOND: f64 = 100_000.0;

/// Default upper limit on the hyperperiod (1 hour, in seconds).
pub const DEFAULT_HYPERPERIOD_LIMIT_S: f64 = 3_600.0;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that can occur during hyperperiod calculation.
#[derive(Debug, PartialEq)]
pub enum HyperperiodError {
    /// The task slice contained no periodic task with a positive period.
    NoValidPeriods,

    /// LCM calculation overflowed `u64` on the period tick counts.
    Overflow { a: u64, b: u64 },

    /// The calculated hyperperiod exceeded the configured limit.
    TooLarge { value_s: f64, limit_s: f64 },
}

impl std::fmt::Display for HyperperiodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyperperiodError::NoValidPeriods => {
                write!(f, "no periodic tasks with a valid (positive) period")
            }
            HyperperiodError::Overflow { a, b } => {
                write!(f, "LCM overflow computing lcm({a}, {b}) on period ticks")
            }
            HyperperiodError::TooLarge { value_s, limit_s } => write!(
                f,
                "hyperperiod {value_s:.3}s exceeds limit {limit_s:.3}s"
            ),
        }
    }
}

impl std::error::Error for HyperperiodError {}

// ── HyperperiodInfo ───────────────────────────────────────────────────────────

/// Calculated hyperperiod of a task set.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperperiodInfo {
    /// Hyperperiod in seconds.
    pub hyperperiod: f64,

    /// Unique periods present in the task set (sorted, deduplicated).
    pub unique_periods: Vec<f64>,

    /// Number of periodic tasks that contributed.
    pub task_count: usize,
}

// ── HyperperiodCalculator ─────────────────────────────────────────────────────

/// Computes the hyperperiod of a task set against a configurable limit.
///
/// # Example
/// ```rust
/// use thermsched::hyperperiod::HyperperiodCalculator;
/// use thermsched::task::Task;
///
/// let tasks = vec![Task::periodic(1.0, 2.0, 2.0), Task::periodic(1.0, 3.0, 3.0)];
/// let info = HyperperiodCalculator::new().calculate(&tasks).unwrap();
/// assert!((info.hyperperiod - 6.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct HyperperiodCalculator {
    limit_s: f64,
}

impl HyperperiodCalculator {
    /// Calculator with the default 1-hour limit.
    pub fn new() -> Self {
        Self {
            limit_s: DEFAULT_HYPERPERIOD_LIMIT_S,
        }
    }

    /// Calculator with a custom limit in seconds.
    pub fn with_limit(limit_s: f64) -> Self {
        Self { limit_s }
    }

    /// Hyperperiod of the periodic tasks in `tasks`; aperiodic tasks are
    /// ignored.
    ///
    /// # Errors
    /// * [`HyperperiodError::NoValidPeriods`] – no periodic task.
    /// * [`HyperperiodError::Overflow`] – the LCM of the tick counts exceeded `u64`.
    /// * [`HyperperiodError::TooLarge`] – result exceeds the configured limit.
    pub fn calculate(&self, tasks: &[Task]) -> Result<HyperperiodInfo, HyperperiodError> {
        let periods: Vec<f64> = tasks
            .iter()
            .filter_map(Task::period)
            .filter(|p| *p > 0.0)
            .collect();

        if periods.is_empty() {
            warn!("No periodic tasks with valid periods found");
            return Err(HyperperiodError::NoValidPeriods);
        }

        let unique_periods: Vec<f64> = {
            let mut v = periods.clone();
            v.sort_by(f64::total_cmp);
            v.dedup_by(|a, b| math::is_equal(*a, *b));
            v
        };

        let ticks: Vec<u64> = unique_periods
            .iter()
            .map(|p| ((p * TICKS_PER_SECOND).round() as u64).max(1))
            .collect();
        let hyperperiod = lcm_of_slice(&ticks)? as f64 / TICKS_PER_SECOND;

        if hyperperiod > self.limit_s {
            warn!(
                hyperperiod,
                limit_s = self.limit_s,
                "Hyperperiod exceeds configured limit"
            );
            return Err(HyperperiodError::TooLarge {
                value_s: hyperperiod,
                limit_s: self.limit_s,
            });
        }

        info!(
            task_count = periods.len(),
            unique_count = unique_periods.len(),
            hyperperiod,
            "Calculated hyperperiod"
        );
        for p in &unique_periods {
            debug!(period = p, "  unique period");
        }

        Ok(HyperperiodInfo {
            hyperperiod,
            unique_periods,
            task_count: periods.len(),
        })
    }
}

impl Default for HyperperiodCalculator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
