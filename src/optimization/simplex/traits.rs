//! Public API surface for derivative-free local search.
//!
//! - [`CandidateUpdate`]: trait the model layer implements; the optimizer
//!   feeds it every candidate vertex it proposes.
//! - [`SimplexOptions`]: validated solver configuration.
//! - [`OptimOutcome`]: normalized result returned by the high-level
//!   `minimize` API.
//!
//! Convention: the optimizer *minimizes* whatever scalar `propose` returns.
//! The receiver decides internally whether a candidate is accepted into its
//! state; the returned value is the candidate's own cost either way, so
//! non-improving vertices still steer the simplex.

use argmin::core::TerminationStatus;

use crate::optimization::errors::{OptError, OptResult};

/// Receiver of candidate-parameter events emitted by the optimizer.
///
/// Each call carries one proposed parameter vector. The implementor routes
/// the candidate through its own accept/reject transition and returns the
/// candidate's cost. Acceptance authority stays entirely with the receiver;
/// the optimizer only ever observes costs.
///
/// Returning a non-finite cost (for an out-of-domain candidate) is
/// permitted; `f64::INFINITY` makes the vertex maximally unattractive
/// without aborting the search. NaN costs abort with [`OptError::NanCost`].
pub trait CandidateUpdate {
    fn propose(&mut self, theta: &[f64]) -> OptResult<f64>;
}

/// Simplex solver configuration.
///
/// Fields
/// ------
/// - `max_iter`: hard cap on solver iterations; must be positive.
/// - `sd_tolerance`: terminate when the standard deviation of the simplex
///   vertex costs falls below this threshold; must be positive and finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexOptions {
    pub max_iter: u64,
    pub sd_tolerance: f64,
}

impl SimplexOptions {
    /// Construct validated options.
    ///
    /// # Errors
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    /// - [`OptError::InvalidSdTolerance`] for a non-finite or non-positive
    ///   tolerance.
    pub fn new(max_iter: u64, sd_tolerance: f64) -> OptResult<Self> {
        if max_iter == 0 {
            return Err(OptError::InvalidMaxIter {
                max_iter,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        if !sd_tolerance.is_finite() || sd_tolerance <= 0.0 {
            return Err(OptError::InvalidSdTolerance {
                tol: sd_tolerance,
                reason: "Tolerance must be finite and strictly positive.",
            });
        }
        Ok(SimplexOptions { max_iter, sd_tolerance })
    }
}

impl Default for SimplexOptions {
    fn default() -> Self {
        SimplexOptions { max_iter: 100, sd_tolerance: 1e-4 }
    }
}

/// Canonical result returned by `minimize`.
///
/// - `theta`: best parameter vector found.
/// - `cost`: best cost value.
/// - `converged`: `true` if the solver reported a terminating status other
///   than `NotTerminated`.
/// - `status`: human-readable termination status string.
/// - `iterations`: number of solver iterations performed.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta: Vec<f64>,
    pub cost: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: u64,
}

impl OptimOutcome {
    /// Build a validated [`OptimOutcome`] from raw solver state.
    ///
    /// # Errors
    /// - [`OptError::MissingBestParam`] when the solver kept no best vertex.
    /// - [`OptError::InvalidBestParam`] for non-finite best coordinates.
    pub fn new(
        theta: Option<Vec<f64>>, cost: f64, termination: TerminationStatus, iterations: u64,
    ) -> OptResult<Self> {
        let theta = theta.ok_or(OptError::MissingBestParam)?;
        for (index, &value) in theta.iter().enumerate() {
            if !value.is_finite() {
                return Err(OptError::InvalidBestParam { index, value });
            }
        }
        let status: String;
        let converged = match termination {
            TerminationStatus::NotTerminated => {
                status = "Not terminated".to_string();
                false
            }
            _ => {
                status = format!("{termination:?}");
                true
            }
        };
        Ok(OptimOutcome { theta, cost, converged, status, iterations })
    }
}
