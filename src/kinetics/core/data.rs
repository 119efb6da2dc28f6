//! Per-gene observation data and the summary statistics used to seed fits.
//!
//! Purpose
//! -------
//! Hold one gene's paired abundance vectors together with the observation
//! weight mask and the masked standard deviations, and decide up front
//! whether the gene carries enough signal to be fit at all. Also provides
//! the small statistical helpers (quantiles, masked moments, through-origin
//! regression) the initializer builds its starting estimates from.
//!
//! Invariants & assumptions
//! ------------------------
//! - Observations enter as finite, non-negative reals of equal length; this
//!   is validated on construction.
//! - The weight mask marks observations that are strictly positive in both
//!   signals, intersected with an optional caller-supplied mask. Loss and
//!   summary statistics are computed over this mask only; time assignment
//!   covers all observations.
//! - A gene with fewer than [`MIN_RECOVERABLE_OBS`] weighted observations is
//!   flagged not recoverable instead of raising; degenerate input is a data
//!   property, not an error.

use ndarray::Array1;

use crate::kinetics::{core::validation::validate_signal_pair, errors::KineticResult};

/// Minimum number of weighted observations required for a meaningful fit.
pub const MIN_RECOVERABLE_OBS: usize = 5;

/// One gene's observed signal pair plus derived weights and moments.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneProfile {
    /// Unspliced abundance, length N.
    pub u: Array1<f64>,
    /// Spliced abundance, length N.
    pub s: Array1<f64>,
    /// Observation weight mask; false entries are excluded from the loss.
    pub weights: Array1<bool>,
    /// Standard deviation of the weighted unspliced signal.
    pub std_u: f64,
    /// Standard deviation of the weighted spliced signal.
    pub std_s: f64,
    /// Whether the gene carries enough signal for a fit.
    pub recoverable: bool,
}

impl GeneProfile {
    /// Build a profile from a validated signal pair.
    ///
    /// Parameters
    /// ----------
    /// - `u`, `s`: paired abundance vectors of equal length.
    /// - `cell_mask`: optional caller mask intersected with the positivity
    ///   mask; `None` keeps every doubly-positive observation.
    ///
    /// Errors
    /// ------
    /// - `KineticError::SignalLengthMismatch` / `InvalidSignal` from input
    ///   validation.
    /// - `KineticError::MaskLengthMismatch` when the caller mask length does
    ///   not match the signals.
    ///
    /// A degenerate gene (too few weighted observations, e.g. constant-zero
    /// signal) is NOT an error; it is returned with `recoverable == false`.
    pub fn new(
        u: Array1<f64>, s: Array1<f64>, cell_mask: Option<&Array1<bool>>,
    ) -> KineticResult<Self> {
        validate_signal_pair(&u, &s)?;
        if let Some(mask) = cell_mask {
            if mask.len() != u.len() {
                return Err(crate::kinetics::errors::KineticError::MaskLengthMismatch {
                    expected: u.len(),
                    actual: mask.len(),
                });
            }
        }

        let weights = Array1::from_iter((0..u.len()).map(|i| {
            u[i] > 0.0 && s[i] > 0.0 && cell_mask.map_or(true, |m| m[i])
        }));
        let n_weighted = weights.iter().filter(|&&w| w).count();
        let recoverable = n_weighted >= MIN_RECOVERABLE_OBS;

        let std_u = masked_std(&u, &weights);
        let std_s = masked_std(&s, &weights);

        Ok(GeneProfile { u, s, weights, std_u, std_s, recoverable })
    }

    /// Number of observations, including unweighted ones.
    pub fn n_obs(&self) -> usize {
        self.u.len()
    }

    /// Number of weighted observations.
    pub fn n_weighted(&self) -> usize {
        self.weights.iter().filter(|&&w| w).count()
    }
}

/// Values of `x` where `mask` is true, in observation order.
pub fn masked(x: &Array1<f64>, mask: &Array1<bool>) -> Vec<f64> {
    x.iter().zip(mask.iter()).filter(|(_, &m)| m).map(|(&v, _)| v).collect()
}

/// Mean of the masked values; 0 for an empty mask.
pub fn masked_mean(x: &Array1<f64>, mask: &Array1<bool>) -> f64 {
    let values = masked(x, mask);
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation of the masked values; 0 for an empty mask.
pub fn masked_std(x: &Array1<f64>, mask: &Array1<bool>) -> f64 {
    let values = masked(x, mask);
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Linearly interpolated percentile of `values`, `q` in (0, 100).
///
/// Returns 0 for an empty slice so degenerate genes flow into the
/// recoverability check instead of panicking.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

/// Through-origin regression slope of `u` on `s` over the masked subset:
/// `sum(u * s) / sum(s * s)`, zero-guarded.
pub fn masked_slope(u: &[f64], s: &[f64], mask: &[bool]) -> f64 {
    let mut us = 0.0;
    let mut ss = 0.0;
    for i in 0..u.len().min(s.len()) {
        if mask[i] {
            us += u[i] * s[i];
            ss += s[i] * s[i];
        }
    }
    if ss != 0.0 { us / ss } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Verify the weight mask keeps only observations positive in both
    // signals, intersected with a caller mask when given.
    fn weights_require_positive_signal_in_both_channels() {
        let u = array![1.0, 0.0, 2.0, 3.0, 1.0, 2.0];
        let s = array![1.0, 1.0, 0.0, 2.0, 1.0, 3.0];

        let profile = GeneProfile::new(u.clone(), s.clone(), None).unwrap();
        assert_eq!(
            profile.weights.to_vec(),
            vec![true, false, false, true, true, true]
        );

        let mask = array![true, true, true, false, true, true];
        let profile = GeneProfile::new(u, s, Some(&mask)).unwrap();
        assert_eq!(
            profile.weights.to_vec(),
            vec![true, false, false, false, true, true]
        );
    }

    #[test]
    // Purpose
    // -------
    // Verify a constant-zero gene is flagged not recoverable instead of
    // erroring out.
    fn constant_zero_signal_is_not_recoverable() {
        let zeros = Array1::<f64>::zeros(40);
        let profile = GeneProfile::new(zeros.clone(), zeros, None).unwrap();

        assert!(!profile.recoverable);
        assert_eq!(profile.n_weighted(), 0);
        assert_eq!(profile.std_u, 0.0);
        assert_eq!(profile.std_s, 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Verify percentile interpolates linearly between order statistics.
    fn percentile_matches_linear_interpolation() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 50.0), 2.5);
        assert_eq!(percentile(&values, 100.0), 4.0);
        assert!((percentile(&values, 98.0) - 3.94).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Verify the through-origin slope on exactly proportional data recovers
    // the proportionality constant over the masked subset.
    fn masked_slope_recovers_proportionality_constant() {
        let s = vec![1.0, 2.0, 3.0, 4.0];
        let u = vec![0.3, 0.6, 0.9, 100.0];
        let mask = vec![true, true, true, false];

        let slope = masked_slope(&u, &s, &mask);
        assert!((slope - 0.3).abs() < 1e-12, "expected 0.3, got {slope}");
    }
}
