//! statistical_tests::bimodality — kernel-density bimodality screen.
//!
//! Purpose
//! -------
//! Decide whether a non-negative abundance sample splits into two expression
//! populations (a transient and a steady-state group), and estimate the two
//! group means. The kinetics initializer consumes the result as a black box:
//! a test statistic, a p-value, and two group means.
//!
//! Key behaviors
//! -------------
//! - Build a density profile of the sample on a uniform grid spanning the
//!   minimum to the 99.9th percentile, by Gaussian kernel density estimation
//!   (Scott bandwidth) or by a normalized histogram.
//! - Split the grid at the local density minimum near its midpoint and
//!   locate the dominant peak on each side.
//! - Form the statistic `(peak - mean) / max(std, 1)` over the upper half
//!   and convert it to an upper-tail normal p-value.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are validated by [`validation::validate_input`]; degenerate
//!   samples (too short, non-finite, flat) surface as [`BimodError`] values
//!   rather than panics. Callers that treat the test as optional substitute
//!   neutral defaults on error.
//! - `stat` is finite whenever the computation succeeds and `p_value` lies
//!   in [0, 1].
//!
//! Downstream usage
//! ----------------
//! - `kinetics::models` runs the test on both signals during initialization;
//!   a small p-value marks a detectable steady-state subpopulation whose
//!   upper mean blends into the production-rate estimate.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::statistical_tests::{
    errors::{BimodError, BimodResult},
    validation::validate_input,
};

/// Default grid size of the density profile.
pub const DEFAULT_BINS: usize = 30;

/// BimodalityOutcome — outcome of the kernel-density bimodality screen.
///
/// Fields
/// ------
/// - `stat`: peak-over-background statistic of the upper density half.
/// - `p_value`: upper-tail normal probability of `stat`.
/// - `means`: estimated lower and upper group means, in sample units.
///
/// Invariants
/// ----------
/// - `stat` is finite and `p_value` lies in the closed interval [0, 1]
///   whenever construction succeeds.
/// - `means[0] <= means[1]` holds by construction of the grid split.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BimodalityOutcome {
    stat: f64,
    p_value: f64,
    means: [f64; 2],
}

impl BimodalityOutcome {
    /// Run the bimodality screen on a sample.
    ///
    /// Parameters
    /// ----------
    /// - `sample`: observed values; at least 8 finite entries.
    /// - `bins`: grid size of the density profile, at least 8
    ///   ([`DEFAULT_BINS`] is the usual choice).
    /// - `kde`: use Gaussian kernel density estimation when true, a
    ///   normalized histogram otherwise.
    ///
    /// Returns
    /// -------
    /// `BimodResult<BimodalityOutcome>` with the statistic, its upper-tail
    /// normal p-value, and the two group means.
    ///
    /// Errors
    /// ------
    /// - `BimodError::SampleTooShort` / `NonFiniteSample` / `InvalidBins`
    ///   from input validation.
    /// - `BimodError::FlatSample` when the sample has no spread.
    /// - `BimodError::DegenerateBandwidth` when the kernel bandwidth
    ///   collapses to zero.
    pub fn test_bimodality(sample: &[f64], bins: usize, kde: bool) -> BimodResult<Self> {
        validate_input(sample, bins)?;

        let lb = sample.iter().copied().fold(f64::INFINITY, f64::min);
        let ub = upper_percentile(sample, 99.9);
        if !(ub > lb) {
            return Err(BimodError::FlatSample);
        }

        let grid: Vec<f64> = (0..bins)
            .map(|k| lb + (ub - lb) * k as f64 / (bins - 1) as f64)
            .collect();
        let density = if kde {
            kde_profile(sample, &grid)?
        } else {
            histogram_profile(sample, lb, ub, bins)
        };

        // Split at the local minimum nearest the grid midpoint.
        let mut idx = bins / 2 - 2;
        idx += argmin(&density[idx..idx + 4]);

        let lower = &density[..idx];
        let upper = &density[idx..];
        let peak_lower = argmax(lower);
        let peak_upper = argmax(upper);

        let peak = upper[peak_upper];
        let background = mean(upper);
        let spread = std(upper).max(1.0);
        let stat = (peak - background) / spread;

        let normal = Normal::new(0.0, 1.0).expect("unit normal");
        let p_value = (1.0 - normal.cdf(stat)).clamp(0.0, 1.0);

        let means = [
            (grid[peak_lower] + grid[(peak_lower + 1).min(idx.saturating_sub(1))]) / 2.0,
            (grid[idx + peak_upper] + grid[(idx + peak_upper + 1).min(bins - 1)]) / 2.0,
        ];

        Ok(BimodalityOutcome { stat, p_value, means })
    }

    /// Neutral outcome used when the test fails on a degenerate sample:
    /// statistic 0, p-value 1, group means 0.
    pub fn neutral() -> Self {
        BimodalityOutcome { stat: 0.0, p_value: 1.0, means: [0.0, 0.0] }
    }

    /// Peak-over-background statistic.
    pub fn stat(&self) -> f64 {
        self.stat
    }

    /// Upper-tail normal p-value of [`stat`](Self::stat).
    pub fn p_value(&self) -> f64 {
        self.p_value
    }

    /// Estimated lower and upper group means.
    pub fn means(&self) -> [f64; 2] {
        self.means
    }
}

//
// ---------- Private helpers (compact docs) ----------
//

/// Linearly interpolated upper percentile of the sample.
fn upper_percentile(sample: &[f64], q: f64) -> f64 {
    let mut sorted = sample.to_vec();
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

/// Gaussian kernel density estimate on the grid, Scott bandwidth.
fn kde_profile(sample: &[f64], grid: &[f64]) -> BimodResult<Vec<f64>> {
    let n = sample.len() as f64;
    let bandwidth = std(sample) * n.powf(-0.2);
    if bandwidth <= 0.0 || !bandwidth.is_finite() {
        return Err(BimodError::DegenerateBandwidth);
    }
    let norm = 1.0 / ((2.0 * std::f64::consts::PI).sqrt() * bandwidth * n);
    Ok(grid
        .iter()
        .map(|&g| {
            sample
                .iter()
                .map(|&x| {
                    let z = (g - x) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                * norm
        })
        .collect())
}

/// Normalized histogram density over `bins` equal-width cells.
fn histogram_profile(sample: &[f64], lb: f64, ub: f64, bins: usize) -> Vec<f64> {
    let width = (ub - lb) / bins as f64;
    let mut counts = vec![0.0; bins];
    for &x in sample {
        if x < lb || x > ub {
            continue;
        }
        let cell = (((x - lb) / width) as usize).min(bins - 1);
        counts[cell] += 1.0;
    }
    let total = sample.len() as f64 * width;
    counts.iter().map(|&c| c / total).collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn std(values: &[f64]) -> f64 {
    let m = mean(values);
    (values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64).sqrt()
}

fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v < values[best] {
            best = i;
        }
    }
    best
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
