//! Estimation-time configuration for kinetics recovery.

use ndarray::Array1;

use crate::kinetics::{
    core::{assignment::AssignmentMode, validation::validate_percentile},
    errors::{KineticError, KineticResult},
};

/// RecoveryOptions — configuration for per-gene kinetics recovery.
///
/// Purpose
/// -------
/// Bundle the knobs of the per-gene fitting state machine: the optimizer
/// iteration budget, the time-assignment mode used for the final refinement,
/// the independent fitting toggles, the upper-quantile percentile used by the
/// initializer, an optional steady-state prior mask, and the flag to reuse
/// previously persisted parameters instead of re-initializing.
///
/// Fields
/// ------
/// - `max_iter`: total simplex iteration budget, split evenly across the
///   fitting stages. A budget of 0 skips optimization entirely and keeps the
///   initialization-only estimates.
/// - `assignment_mode`: time-assignment mode for the final fitting pass;
///   earlier stages use the inverse-formula approximation.
/// - `fit_scaling`: whether the signal scaling factor is a free parameter.
/// - `fit_time`: whether latent times are re-assigned during updates, or the
///   current assignment is kept fixed.
/// - `fit_steady_states`: whether explicit steady states compete with the
///   transient branches during time assignment, and whether the
///   switching-time extension heuristic may fire.
/// - `fit_connected_states`: whether fitted times are smoothed with the
///   cell-cell connectivity matrix after recovery.
/// - `fit_basal_transcription`: whether the repression branch keeps a basal
///   production rate and basal initial conditions taken from the signal
///   minima.
/// - `steady_state_prior`: optional per-observation mask widening the subset
///   used for the degradation-rate regression.
/// - `percentile`: upper-quantile threshold for the initializer, in (0, 100).
/// - `reuse_params`: seed from previously persisted parameters when a prior
///   table is supplied, instead of re-initializing.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryOptions {
    pub max_iter: usize,
    pub assignment_mode: AssignmentMode,
    pub fit_scaling: bool,
    pub fit_time: bool,
    pub fit_steady_states: bool,
    pub fit_connected_states: bool,
    pub fit_basal_transcription: bool,
    pub steady_state_prior: Option<Array1<bool>>,
    pub percentile: f64,
    pub reuse_params: bool,
}

impl RecoveryOptions {
    /// Validate the option set against an observation count.
    ///
    /// Errors
    /// ------
    /// - `KineticError::InvalidPercentile` for a percentile outside (0, 100).
    /// - `KineticError::PriorLengthMismatch` when the steady-state prior mask
    ///   does not match the observation count.
    pub fn validate(&self, n_obs: usize) -> KineticResult<()> {
        validate_percentile(self.percentile)?;
        if let Some(prior) = &self.steady_state_prior {
            if prior.len() != n_obs {
                return Err(KineticError::PriorLengthMismatch {
                    expected: n_obs,
                    actual: prior.len(),
                });
            }
        }
        Ok(())
    }
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        RecoveryOptions {
            max_iter: 10,
            assignment_mode: AssignmentMode::Projection,
            fit_scaling: true,
            fit_time: true,
            fit_steady_states: true,
            fit_connected_states: true,
            fit_basal_transcription: false,
            steady_state_prior: None,
            percentile: 98.0,
            reuse_params: false,
        }
    }
}
