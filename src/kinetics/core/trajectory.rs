//! Closed-form solutions of the transcription/splicing/degradation system.
//!
//! Purpose
//! -------
//! Evaluate the two-piece analytic trajectory of the linear ODE system
//!
//! ```text
//!     du/dt = alpha - beta * u
//!     ds/dt = beta * u - gamma * s
//! ```
//!
//! and invert it for time. Before the switching event a gene transcribes at
//! rate `alpha` (induction); afterwards production drops to a basal rate
//! (repression) and the trajectory decays from the expression reached at the
//! switch. Both branches share these formulas, differing only in the
//! production rate and the initial conditions passed in.
//!
//! Conventions
//! -----------
//! - `tau` is branch-local time, i.e. time elapsed since the start of the
//!   active branch, never absolute trajectory time.
//! - Divisions by possibly-zero rate differences go through [`inv`], which
//!   maps a zero denominator to zero instead of producing infinities; the
//!   initializer adds a small epsilon to `gamma` so `beta == gamma` does not
//!   occur in practice.
//! - Logarithms of non-positive ratios in [`tau_inv`] are clamped via a small
//!   floor, so inversion at or beyond a steady-state boundary yields a large
//!   finite time rather than infinity.
//! - This module is purely numeric; it performs no I/O and emits no logging.

use ndarray::Array1;

/// Floor applied to log arguments in [`tau_inv`] so boundary expression
/// levels invert to a large finite time.
const LOG_FLOOR: f64 = 1e-10;

/// Zero-guarded reciprocal: `1 / x` for nonzero `x`, `0` otherwise.
#[inline]
pub(crate) fn inv(x: f64) -> f64 {
    if x != 0.0 { 1.0 / x } else { 0.0 }
}

#[inline]
fn log_guard(x: f64) -> f64 {
    x.max(LOG_FLOOR).ln()
}

/// Unspliced abundance after branch-local time `tau`, starting from `u0`
/// with production rate `alpha` and splicing rate `beta`.
#[inline]
pub fn unspliced(tau: f64, u0: f64, alpha: f64, beta: f64) -> f64 {
    let expu = (-beta * tau).exp();
    u0 * expu + alpha * inv(beta) * (1.0 - expu)
}

/// Spliced abundance after branch-local time `tau`, starting from `(u0, s0)`
/// with production rate `alpha`, splicing rate `beta`, and degradation rate
/// `gamma`.
#[inline]
pub fn spliced(tau: f64, s0: f64, u0: f64, alpha: f64, beta: f64, gamma: f64) -> f64 {
    let c = (alpha - u0 * beta) * inv(gamma - beta);
    let expu = (-beta * tau).exp();
    let exps = (-gamma * tau).exp();
    s0 * exps + alpha * inv(gamma) * (1.0 - exps) + c * (exps - expu)
}

/// Joint `(u, s)` abundance after branch-local time `tau`.
#[inline]
pub fn mrna(tau: f64, u0: f64, s0: f64, alpha: f64, beta: f64, gamma: f64) -> (f64, f64) {
    (unspliced(tau, u0, alpha, beta), spliced(tau, s0, u0, alpha, beta, gamma))
}

/// Evaluate both trajectory coordinates over a vector of branch-local times.
pub fn mrna_curve(
    tau: &Array1<f64>, u0: f64, s0: f64, alpha: f64, beta: f64, gamma: f64,
) -> (Array1<f64>, Array1<f64>) {
    let u = tau.mapv(|t| unspliced(t, u0, alpha, beta));
    let s = tau.mapv(|t| spliced(t, s0, u0, alpha, beta, gamma));
    (u, s)
}

/// Invert the unspliced solution for time: the branch-local time at which
/// the trajectory starting from `u0` reaches level `u`.
///
/// Levels at or beyond the asymptote `alpha / beta` hit the internal log
/// floor and return a large finite time.
pub fn tau_inv_u(u: f64, u0: f64, alpha: f64, beta: f64) -> f64 {
    let uinf = alpha * inv(beta);
    -inv(beta) * log_guard((u - uinf) * inv(u0 - uinf))
}

/// Invert the joint `(u, s)` solution for time along the direction in which
/// the dynamics are exponential with rate `gamma`.
///
/// Used when `gamma < beta`, where the unspliced coordinate alone does not
/// identify time reliably.
pub fn tau_inv_us(u: f64, s: f64, u0: f64, s0: f64, alpha: f64, beta: f64, gamma: f64) -> f64 {
    let beta_ = beta * inv(gamma - beta);
    let xinf = alpha * inv(gamma) - beta_ * alpha * inv(beta);
    -inv(gamma) * log_guard((s - beta_ * u - xinf) * inv(s0 - beta_ * u0 - xinf))
}

/// Approximate branch-local time for an observation `(u, s)` on the branch
/// starting at `(u0, s0)` with the given rates.
///
/// Selects the unspliced-only inversion when `gamma >= beta` and the joint
/// inversion otherwise.
pub fn tau_inv(u: f64, s: f64, u0: f64, s0: f64, alpha: f64, beta: f64, gamma: f64) -> f64 {
    if gamma >= beta {
        tau_inv_u(u, u0, alpha, beta)
    } else {
        tau_inv_us(u, s, u0, s0, alpha, beta, gamma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Boundary values and asymptotes of the closed-form solutions.
    // - Consistency between the forward trajectory and its inversions.
    // - Zero-guard behavior of `inv` and the log floor in `tau_inv`.
    //
    // They intentionally DO NOT cover:
    // - Time assignment over observation sets (tested in `assignment`).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify the induction branch starts at the initial condition and
    // approaches the steady state alpha / beta for large tau.
    //
    // Given
    // -----
    // - u0 = 0, alpha = 2, beta = 0.5.
    //
    // Expect
    // ------
    // - unspliced(0) == u0.
    // - unspliced(large tau) approaches alpha / beta = 4 from below.
    fn unspliced_interpolates_between_initial_value_and_asymptote() {
        let (u0, alpha, beta) = (0.0, 2.0, 0.5);

        assert_eq!(unspliced(0.0, u0, alpha, beta), u0);

        let near_ss = unspliced(50.0, u0, alpha, beta);
        assert!((near_ss - 4.0).abs() < 1e-9, "expected ~4.0, got {near_ss}");
        assert!(near_ss < 4.0);
    }

    #[test]
    // Purpose
    // -------
    // Verify the spliced solution starts at s0 and approaches alpha / gamma.
    //
    // Given
    // -----
    // - s0 = 0.5, u0 = 0, alpha = 2, beta = 1, gamma = 0.25.
    //
    // Expect
    // ------
    // - spliced(0) == s0.
    // - spliced(large tau) is within 1e-6 of alpha / gamma = 8.
    fn spliced_interpolates_between_initial_value_and_asymptote() {
        let (s0, u0, alpha, beta, gamma) = (0.5, 0.0, 2.0, 1.0, 0.25);

        assert_eq!(spliced(0.0, s0, u0, alpha, beta, gamma), s0);

        let near_ss = spliced(200.0, s0, u0, alpha, beta, gamma);
        assert!((near_ss - 8.0).abs() < 1e-6, "expected ~8.0, got {near_ss}");
    }

    #[test]
    // Purpose
    // -------
    // Verify that tau_inv recovers the time at which the forward trajectory
    // produced a given expression pair, on both inversion paths.
    //
    // Given
    // -----
    // - A forward evaluation at tau = 1.7 for gamma < beta and gamma > beta.
    //
    // Expect
    // ------
    // - tau_inv of the forward values returns ~1.7 in both regimes.
    fn tau_inv_recovers_forward_time_in_both_regimes() {
        let tau = 1.7;

        // gamma < beta: joint inversion path
        let (alpha, beta, gamma) = (2.0, 1.0, 0.4);
        let (u, s) = mrna(tau, 0.0, 0.0, alpha, beta, gamma);
        let t = tau_inv(u, s, 0.0, 0.0, alpha, beta, gamma);
        assert!((t - tau).abs() < 1e-8, "joint inversion drifted: {t}");

        // gamma > beta: unspliced-only inversion path
        let (alpha, beta, gamma) = (2.0, 0.5, 0.9);
        let (u, s) = mrna(tau, 0.0, 0.0, alpha, beta, gamma);
        let t = tau_inv(u, s, 0.0, 0.0, alpha, beta, gamma);
        assert!((t - tau).abs() < 1e-8, "unspliced inversion drifted: {t}");
    }

    #[test]
    // Purpose
    // -------
    // Verify that inverting an expression level at the asymptote yields a
    // large finite time rather than infinity.
    //
    // Given
    // -----
    // - u equal to the steady-state level alpha / beta.
    //
    // Expect
    // ------
    // - tau_inv_u is finite and strictly positive.
    fn tau_inv_is_finite_at_the_steady_state_boundary() {
        let (alpha, beta) = (2.0, 1.0);
        let t = tau_inv_u(alpha / beta, 0.0, alpha, beta);
        assert!(t.is_finite(), "expected finite inversion, got {t}");
        assert!(t > 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Verify the zero-guarded reciprocal maps zero to zero.
    //
    // Expect
    // ------
    // - inv(0) == 0, inv(2) == 0.5.
    fn inv_guards_division_by_zero() {
        assert_eq!(inv(0.0), 0.0);
        assert_eq!(inv(2.0), 0.5);
    }
}
