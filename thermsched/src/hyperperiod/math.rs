/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure arithmetic helpers: integer GCD/LCM, tolerant float GCD/LCM and
//! decimal rounding.
//!
//! These are free functions rather than methods so they can be used by the
//! engine, the model builders and the policies without going through
//! [`HyperperiodCalculator`](super::HyperperiodCalculator).

use super::HyperperiodError;

/// Relative tolerance used by [`float_gcd`] / [`is_equal`].
pub const DEFAULT_RTOL: f64 = 1e-05;

/// Absolute tolerance used by [`float_gcd`] / [`is_equal`].
pub const DEFAULT_ATOL: f64 = 1e-08;

/// Iterative Euclidean GCD.  Returns the other operand when one input is `0`.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Checked LCM: returns `Err(HyperperiodError::Overflow { a, b })` if the
/// result would overflow `u64`.
///
/// Returns `Ok(0)` when either input is `0`.
pub fn lcm(a: u64, b: u64) -> Result<u64, HyperperiodError> {
    if a == 0 || b == 0 {
        return Ok(0);
    }

    let g = gcd(a, b);
    let reduced = a / g;

    reduced
        .checked_mul(b)
        .ok_or(HyperperiodError::Overflow { a, b })
}

/// Reduce a slice of integers to their overall LCM.
///
/// Returns `Ok(0)` for an empty slice and `Err` on the first overflow.
pub fn lcm_of_slice(values: &[u64]) -> Result<u64, HyperperiodError> {
    values
        .iter()
        .try_fold(values.first().copied().unwrap_or(0), |acc, &v| lcm(acc, v))
}

/// GCD of a slice of integers; `0` for an empty slice.
pub fn gcd_of_slice(values: &[u64]) -> u64 {
    values.iter().fold(0, |acc, &v| gcd(acc, v))
}

/// `true` when `a` and `b` are equal within `atol + rtol * |b|`.
pub fn is_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= DEFAULT_ATOL + DEFAULT_RTOL * b.abs()
}

/// Euclidean GCD over floats, stopping once the remainder is below the
/// tolerance band of the smaller operand.
pub fn float_gcd(a: f64, b: f64) -> f64 {
    let (mut a, mut b) = if a.abs() >= b.abs() {
        (a.abs(), b.abs())
    } else {
        (b.abs(), a.abs())
    };
    while b > DEFAULT_ATOL + DEFAULT_RTOL * a {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Float LCM built on [`float_gcd`].  Returns `0.0` when either input is `0`.
pub fn float_lcm(a: f64, b: f64) -> f64 {
    let g = float_gcd(a, b);
    if g == 0.0 {
        return 0.0;
    }
    (a * b).abs() / g
}

/// Round `value` to `decimals` decimal places (half away from zero).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── gcd ───────────────────────────────────────────────────────────────────

    #[test]
    fn gcd_basic_cases() {
        assert_eq!(gcd(12, 8), 4);
        assert_eq!(gcd(7, 3), 1);
        assert_eq!(gcd(100, 25), 25);
    }

    #[test]
    fn gcd_with_zero() {
        assert_eq!(gcd(0, 5), 5);
        assert_eq!(gcd(5, 0), 5);
        assert_eq!(gcd(0, 0), 0);
    }

    #[test]
    fn gcd_of_slice_ignores_zeros() {
        assert_eq!(gcd_of_slice(&[0, 12, 18, 0]), 6);
        assert_eq!(gcd_of_slice(&[]), 0);
    }

    // ── lcm ───────────────────────────────────────────────────────────────────

    #[test]
    fn lcm_basic_cases() {
        assert_eq!(lcm(4, 6).unwrap(), 12);
        assert_eq!(lcm(3, 5).unwrap(), 15);
        assert_eq!(lcm(12, 18).unwrap(), 36);
    }

    #[test]
    fn lcm_with_zero_returns_zero() {
        assert_eq!(lcm(0, 5).unwrap(), 0);
        assert_eq!(lcm(5, 0).unwrap(), 0);
    }

    #[test]
    fn lcm_overflow_returns_error() {
        let a = u64::MAX / 2 + 1;
        let b = u64::MAX / 2 + 3;
        assert!(matches!(lcm(a, b), Err(HyperperiodError::Overflow { .. })));
    }

    #[test]
    fn lcm_of_slice_multiple_values() {
        assert_eq!(lcm_of_slice(&[]).unwrap(), 0);
        assert_eq!(lcm_of_slice(&[42]).unwrap(), 42);
        assert_eq!(lcm_of_slice(&[2, 3, 4]).unwrap(), 12);
    }

    // ── floats ────────────────────────────────────────────────────────────────

    #[test]
    fn float_gcd_of_decimal_multiples() {
        let g = float_gcd(0.6, 0.4);
        assert!((g - 0.2).abs() < 1e-6, "gcd(0.6, 0.4) ≈ 0.2, got {g}");
    }

    #[test]
    fn float_gcd_is_symmetric() {
        assert!((float_gcd(0.4, 0.6) - float_gcd(0.6, 0.4)).abs() < 1e-9);
    }

    #[test]
    fn float_lcm_of_decimal_periods() {
        let l = float_lcm(0.4, 0.6);
        assert!((l - 1.2).abs() < 1e-6, "lcm(0.4, 0.6) ≈ 1.2, got {l}");
    }

    #[test]
    fn is_equal_respects_tolerances() {
        assert!(is_equal(1.0, 1.0 + 1e-9));
        assert!(!is_equal(1.0, 1.001));
    }

    #[test]
    fn round_to_decimals() {
        assert_eq!(round_to(1.234_567, 5), 1.23457);
        assert_eq!(round_to(-0.000_001, 5), 0.0);
        assert_eq!(round_to(2.5, 0), 3.0);
    }
}
