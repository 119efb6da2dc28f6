//! Input validation for the bimodality test.

use crate::statistical_tests::errors::{BimodError, BimodResult};

/// Minimum sample size for a meaningful density estimate.
pub const MIN_SAMPLE_LEN: usize = 8;

/// Minimum grid size; the mid-grid split needs room on both sides.
pub const MIN_BINS: usize = 8;

/// Validate the sample and bin count before running the test.
///
/// # Rules
/// - The sample must hold at least [`MIN_SAMPLE_LEN`] values.
/// - Every value must be finite.
/// - The bin count must be at least [`MIN_BINS`].
///
/// # Errors
/// - [`BimodError::SampleTooShort`], [`BimodError::NonFiniteSample`], or
///   [`BimodError::InvalidBins`] accordingly.
pub fn validate_input(sample: &[f64], bins: usize) -> BimodResult<()> {
    if sample.len() < MIN_SAMPLE_LEN {
        return Err(BimodError::SampleTooShort { len: sample.len(), required: MIN_SAMPLE_LEN });
    }
    for (index, &value) in sample.iter().enumerate() {
        if !value.is_finite() {
            return Err(BimodError::NonFiniteSample { index, value });
        }
    }
    if bins < MIN_BINS {
        return Err(BimodError::InvalidBins { bins, required: MIN_BINS });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_samples_are_rejected() {
        let short = vec![1.0; MIN_SAMPLE_LEN - 1];
        assert!(matches!(
            validate_input(&short, 30),
            Err(BimodError::SampleTooShort { .. })
        ));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut sample = vec![1.0; MIN_SAMPLE_LEN];
        sample[3] = f64::NAN;
        assert!(matches!(
            validate_input(&sample, 30),
            Err(BimodError::NonFiniteSample { index: 3, .. })
        ));
    }

    #[test]
    fn small_bin_counts_are_rejected() {
        let sample = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        assert!(matches!(
            validate_input(&sample, MIN_BINS - 1),
            Err(BimodError::InvalidBins { .. })
        ));
        assert!(validate_input(&sample, MIN_BINS).is_ok());
    }
}
