use crate::engine::errors::EngineError;

/// Result alias for recovery orchestration.
pub type RecoveryResultOf<T> = Result<T, RecoveryError>;

#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryError {
    // ---- Dataset ----
    /// The two abundance matrices must share one shape.
    MatrixShapeMismatch {
        unspliced: (usize, usize),
        spliced: (usize, usize),
    },

    /// One gene name per matrix column is required.
    GeneNameCountMismatch {
        expected: usize,
        actual: usize,
    },

    /// Abundance entries need to be finite and non-negative.
    InvalidAbundance {
        row: usize,
        col: usize,
        value: f64,
    },

    /// The connectivity matrix must be square over the observations.
    ConnectivityShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    // ---- Gene selection (fatal before any task is dispatched) ----
    /// A requested gene name does not exist in the dataset.
    UnknownGene {
        name: String,
    },

    /// A requested gene index lies outside the dataset.
    GeneIndexOutOfRange {
        index: usize,
        n_genes: usize,
    },

    /// The resolved gene set is empty.
    EmptyGeneSet,

    // ---- Engine ----
    /// Wrapper for engine failures.
    Engine(EngineError),
}

impl std::error::Error for RecoveryError {}

impl std::fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryError::MatrixShapeMismatch { unspliced, spliced } => {
                write!(
                    f,
                    "Abundance matrix shape mismatch: unspliced {unspliced:?}, spliced {spliced:?}"
                )
            }
            RecoveryError::GeneNameCountMismatch { expected, actual } => {
                write!(f, "Gene name count mismatch: expected {expected}, actual {actual}")
            }
            RecoveryError::InvalidAbundance { row, col, value } => {
                write!(
                    f,
                    "Invalid abundance at ({row}, {col}): {value}, must be finite and >= 0"
                )
            }
            RecoveryError::ConnectivityShapeMismatch { expected, actual } => {
                write!(
                    f,
                    "Connectivity shape mismatch: expected {expected:?}, actual {actual:?}"
                )
            }
            RecoveryError::UnknownGene { name } => {
                write!(f, "Gene name not found in the dataset: '{name}'")
            }
            RecoveryError::GeneIndexOutOfRange { index, n_genes } => {
                write!(f, "Gene index {index} out of range for {n_genes} genes")
            }
            RecoveryError::EmptyGeneSet => {
                write!(f, "The resolved gene set is empty; nothing to fit")
            }
            RecoveryError::Engine(err) => {
                write!(f, "Engine failure: {err}")
            }
        }
    }
}

impl From<EngineError> for RecoveryError {
    fn from(err: EngineError) -> Self {
        RecoveryError::Engine(err)
    }
}
