//! Validation helpers for kinetic parameters, signals, and options.
//!
//! All helpers return [`KineticResult`] rather than panicking; invalid user
//! input is never a panic in this crate.

use ndarray::Array1;

use crate::kinetics::errors::{KineticError, KineticResult};

/// Reject non-finite or negative rate candidates.
pub fn validate_rate(name: &'static str, value: f64) -> KineticResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(KineticError::InvalidRate { name, value });
    }
    Ok(())
}

/// Reject non-finite or non-positive switching times.
pub fn validate_switch_time(value: f64) -> KineticResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(KineticError::InvalidSwitchTime { value });
    }
    Ok(())
}

/// Reject non-finite or non-positive scaling factors.
pub fn validate_scaling(value: f64) -> KineticResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(KineticError::InvalidScaling { value });
    }
    Ok(())
}

/// Reject percentiles outside the open interval (0, 100).
pub fn validate_percentile(value: f64) -> KineticResult<()> {
    if !value.is_finite() || value <= 0.0 || value >= 100.0 {
        return Err(KineticError::InvalidPercentile { value });
    }
    Ok(())
}

/// Check a paired signal for equal lengths and finite, non-negative values.
pub fn validate_signal_pair(u: &Array1<f64>, s: &Array1<f64>) -> KineticResult<()> {
    if u.len() != s.len() {
        return Err(KineticError::SignalLengthMismatch { unspliced: u.len(), spliced: s.len() });
    }
    for (index, &value) in u.iter().chain(s.iter()).enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(KineticError::InvalidSignal { index: index % u.len().max(1), value });
        }
    }
    Ok(())
}
