//! Kinetic parameter state and candidate updates.
//!
//! Purpose
//! -------
//! Own the per-gene parameter vector `(alpha, beta, gamma, t_, scaling)` and
//! express candidate transitions as a sparse overlay: a [`ParamUpdate`] names
//! only the parameters a caller wants to change, and [`ParamUpdate::resolve`]
//! produces a fully validated candidate with the remaining parameters held at
//! their current values.
//!
//! Invariants & assumptions
//! ------------------------
//! - A successfully resolved [`KineticParams`] has finite, non-negative
//!   rates, a finite strictly positive switching time, and a finite strictly
//!   positive scaling factor. Negative candidate rates are rejected, never
//!   clamped into range silently.
//! - `beta` is canonically 1 up to the scaling factor; nothing in this module
//!   enforces that normalization, it is a convention of the initializer.

use crate::kinetics::{
    core::validation::{validate_rate, validate_scaling, validate_switch_time},
    errors::KineticResult,
};

/// One gene's kinetic parameter state.
///
/// Fields
/// ------
/// - `alpha`: transcription (production) rate on the induction branch.
/// - `beta`: splicing rate; canonically 1 up to `scaling`.
/// - `gamma`: degradation rate.
/// - `t_`: switching time separating induction from repression.
/// - `scaling`: unit-scaling factor between the unspliced and spliced signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KineticParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub t_: f64,
    pub scaling: f64,
}

impl KineticParams {
    /// Validate every component of the parameter vector.
    ///
    /// Errors
    /// ------
    /// - `KineticError::InvalidRate` for a non-finite or negative rate.
    /// - `KineticError::InvalidSwitchTime` for a non-finite or non-positive
    ///   switching time.
    /// - `KineticError::InvalidScaling` for a non-finite or non-positive
    ///   scaling factor.
    pub fn validate(&self) -> KineticResult<()> {
        validate_rate("alpha", self.alpha)?;
        validate_rate("beta", self.beta)?;
        validate_rate("gamma", self.gamma)?;
        validate_switch_time(self.t_)?;
        validate_scaling(self.scaling)?;
        Ok(())
    }
}

/// Candidate parameter subset fed into the model's update transition.
///
/// Unset fields are held at the current accepted values. The two flags
/// control how the transition treats the candidate:
/// - `keep_time`: evaluate the candidate against the currently assigned
///   times instead of re-assigning them.
/// - `adjust_switch`: allow the switching-time extension heuristic to
///   propose a stretched alternative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamUpdate {
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
    pub t_: Option<f64>,
    pub scaling: Option<f64>,
    pub keep_time: bool,
    pub adjust_switch: bool,
}

impl Default for ParamUpdate {
    fn default() -> Self {
        ParamUpdate {
            alpha: None,
            beta: None,
            gamma: None,
            t_: None,
            scaling: None,
            keep_time: false,
            adjust_switch: true,
        }
    }
}

impl ParamUpdate {
    /// Overlay the candidate subset onto `current` and validate the result.
    ///
    /// Returns
    /// -------
    /// The fully resolved candidate parameter vector, or the first
    /// validation error encountered. Callers driving an optimizer treat a
    /// validation error as a rejected candidate rather than a failure.
    pub fn resolve(&self, current: &KineticParams) -> KineticResult<KineticParams> {
        let candidate = KineticParams {
            alpha: self.alpha.unwrap_or(current.alpha),
            beta: self.beta.unwrap_or(current.beta),
            gamma: self.gamma.unwrap_or(current.gamma),
            t_: self.t_.unwrap_or(current.t_),
            scaling: self.scaling.unwrap_or(current.scaling),
        };
        candidate.validate()?;
        Ok(candidate)
    }

    /// True when the candidate proposes a new scaling factor.
    pub fn rescales(&self) -> bool {
        self.scaling.is_some()
    }
}
