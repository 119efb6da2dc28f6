/// Crate-wide result alias for kinetics operations.
pub type KineticResult<T> = Result<T, KineticError>;

#[derive(Debug, Clone, PartialEq)]
pub enum KineticError {
    // ---- Data ----
    /// Paired signal vectors must have equal length.
    SignalLengthMismatch {
        unspliced: usize,
        spliced: usize,
    },

    /// Observation mask length must match the signal length.
    MaskLengthMismatch {
        expected: usize,
        actual: usize,
    },

    /// Signal values need to be finite and non-negative.
    InvalidSignal {
        index: usize,
        value: f64,
    },

    // ---- Parameters ----
    /// Rate parameters need to be finite and non-negative.
    InvalidRate {
        name: &'static str,
        value: f64,
    },

    /// Switching time must be finite and strictly positive.
    InvalidSwitchTime {
        value: f64,
    },

    /// Scaling factor must be finite and strictly positive.
    InvalidScaling {
        value: f64,
    },

    // ---- Options ----
    /// Upper-quantile percentile must lie strictly inside (0, 100).
    InvalidPercentile {
        value: f64,
    },

    /// Steady-state prior mask length must match the observation count.
    PriorLengthMismatch {
        expected: usize,
        actual: usize,
    },

    // ---- Model state ----
    /// Fit requested before initialization.
    NotInitialized,

    /// Loss evaluated to a non-finite value.
    NonFiniteLoss {
        value: f64,
    },

    /// The optimizer failed while driving the fit.
    FitFailed {
        text: String,
    },

    // ---- Differential kinetics ----
    /// Group membership vector length must match the observation count.
    GroupLengthMismatch {
        expected: usize,
        actual: usize,
    },

    /// At least one group label is required.
    EmptyGroupSet,
}

impl std::error::Error for KineticError {}

impl std::fmt::Display for KineticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KineticError::SignalLengthMismatch { unspliced, spliced } => {
                write!(
                    f,
                    "Signal length mismatch: unspliced has {unspliced} observations, spliced has {spliced}"
                )
            }
            KineticError::MaskLengthMismatch { expected, actual } => {
                write!(f, "Observation mask length mismatch: expected {expected}, actual {actual}")
            }
            KineticError::InvalidSignal { index, value } => {
                write!(f, "Invalid signal at index {index}: {value}, must be finite and >= 0")
            }
            KineticError::InvalidRate { name, value } => {
                write!(f, "Invalid rate {name}: {value}, must be finite and non-negative")
            }
            KineticError::InvalidSwitchTime { value } => {
                write!(f, "Invalid switching time: {value}, must be finite and > 0")
            }
            KineticError::InvalidScaling { value } => {
                write!(f, "Invalid scaling factor: {value}, must be finite and > 0")
            }
            KineticError::InvalidPercentile { value } => {
                write!(f, "Invalid percentile {value}: must lie strictly between 0 and 100")
            }
            KineticError::PriorLengthMismatch { expected, actual } => {
                write!(
                    f,
                    "Steady-state prior length mismatch: expected {expected}, actual {actual}"
                )
            }
            KineticError::NotInitialized => {
                write!(f, "Model must be initialized before fitting")
            }
            KineticError::NonFiniteLoss { value } => {
                write!(f, "Non-finite loss value: {value}")
            }
            KineticError::FitFailed { text } => {
                write!(f, "Fit failed: {text}")
            }
            KineticError::GroupLengthMismatch { expected, actual } => {
                write!(f, "Group membership length mismatch: expected {expected}, actual {actual}")
            }
            KineticError::EmptyGroupSet => {
                write!(f, "At least one group label is required")
            }
        }
    }
}
