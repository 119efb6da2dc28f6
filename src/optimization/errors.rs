use argmin::core::{ArgminError, Error};

use crate::kinetics::errors::KineticError;

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- SimplexOptions ----
    /// Simplex standard-deviation tolerance needs to be positive and finite.
    InvalidSdTolerance {
        tol: f64,
        reason: &'static str,
    },
    /// Maximum iterations needs to be positive.
    InvalidMaxIter {
        max_iter: u64,
        reason: &'static str,
    },

    // ---- Simplex seed ----
    /// The seed vertex must be non-empty.
    EmptySimplexSeed,
    /// Seed coordinates need to be finite.
    InvalidSimplexSeed {
        index: usize,
        value: f64,
    },

    // ---- Cost function ----
    /// Cost function returned NaN.
    NanCost,

    // ---- Optimizer outcome ----
    /// The solver finished without a best parameter vector.
    MissingBestParam,

    /// Best parameters must be finite.
    InvalidBestParam {
        index: usize,
        value: f64,
    },

    // ---- Model transition ----
    /// A candidate transition failed inside the model.
    CandidateRejected {
        text: String,
    },

    // ---- Argmin ----
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter {
        text: String,
    },
    /// Wrapper for argmin::NotImplemented
    NotImplemented {
        text: String,
    },
    /// Wrapper for argmin::NotInitialized
    NotInitialized {
        text: String,
    },
    /// Wrapper for argmin::ConditionViolated
    ConditionViolated {
        text: String,
    },
    /// Wrapper for argmin::CheckPointNotFound
    CheckPointNotFound {
        text: String,
    },
    /// Wrapper for argmin::PotentialBug
    PotentialBug {
        text: String,
    },
    /// Wrapper for argmin::ImpossibleError
    ImpossibleError {
        text: String,
    },
    /// Wrapper for other argmin::Error types
    BackendError {
        text: String,
    },

    // ---- Fallback ----
    UnknownError,
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptError::InvalidSdTolerance { tol, reason } => {
                write!(f, "Invalid simplex sd tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::EmptySimplexSeed => {
                write!(f, "Simplex seed vertex must be non-empty")
            }
            OptError::InvalidSimplexSeed { index, value } => {
                write!(f, "Invalid simplex seed at index {index}: {value}, must be finite")
            }
            OptError::NanCost => {
                write!(f, "Cost function returned NaN")
            }
            OptError::MissingBestParam => {
                write!(f, "Missing best parameter vector")
            }
            OptError::InvalidBestParam { index, value } => {
                write!(f, "Invalid best parameter at index {index}: {value}, must be finite")
            }
            OptError::CandidateRejected { text } => {
                write!(f, "Candidate transition failed: {text}")
            }
            OptError::InvalidParameter { text } => {
                write!(f, "Invalid parameter: {text}")
            }
            OptError::NotImplemented { text } => {
                write!(f, "Not implemented: {text}")
            }
            OptError::NotInitialized { text } => {
                write!(f, "Not initialized: {text}")
            }
            OptError::ConditionViolated { text } => {
                write!(f, "Condition violated: {text}")
            }
            OptError::CheckPointNotFound { text } => {
                write!(f, "Checkpoint not found: {text}")
            }
            OptError::PotentialBug { text } => {
                write!(f, "Potential bug: {text}")
            }
            OptError::ImpossibleError { text } => {
                write!(f, "Impossible error: {text}")
            }
            OptError::BackendError { text } => {
                write!(f, "Backend error: {text}")
            }
            OptError::UnknownError => {
                write!(f, "Unknown error")
            }
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        match original_err.downcast() {
            Ok(opt_err) => match opt_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

impl From<KineticError> for OptError {
    fn from(err: KineticError) -> Self {
        OptError::CandidateRejected { text: err.to_string() }
    }
}
