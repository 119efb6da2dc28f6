/// Result alias for the bimodality test.
pub type BimodResult<T> = Result<T, BimodError>;

#[derive(Debug, Clone, PartialEq)]
pub enum BimodError {
    /// The input sample is too short for a density estimate.
    SampleTooShort {
        len: usize,
        required: usize,
    },

    /// Sample values need to be finite.
    NonFiniteSample {
        index: usize,
        value: f64,
    },

    /// The sample has no spread; the density grid would be degenerate.
    FlatSample,

    /// The kernel bandwidth collapsed to zero.
    DegenerateBandwidth,

    /// The grid needs enough bins to locate a mid-grid split.
    InvalidBins {
        bins: usize,
        required: usize,
    },
}

impl std::error::Error for BimodError {}

impl std::fmt::Display for BimodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BimodError::SampleTooShort { len, required } => {
                write!(f, "Sample too short for bimodality test: {len} values, need {required}")
            }
            BimodError::NonFiniteSample { index, value } => {
                write!(f, "Non-finite sample value at index {index}: {value}")
            }
            BimodError::FlatSample => {
                write!(f, "Sample has no spread; density grid is degenerate")
            }
            BimodError::DegenerateBandwidth => {
                write!(f, "Kernel bandwidth collapsed to zero")
            }
            BimodError::InvalidBins { bins, required } => {
                write!(f, "Invalid bin count {bins}: need at least {required}")
            }
        }
    }
}
