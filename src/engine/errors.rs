/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Worker count needs to be at least one.
    InvalidWorkerCount {
        n_workers: usize,
    },

    /// Batch size needs to be at least one.
    InvalidBatchSize {
        batch_size: usize,
    },

    /// Every worker exited before all results arrived.
    ResultChannelClosed {
        missing: usize,
    },
}

impl std::error::Error for EngineError {}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidWorkerCount { n_workers } => {
                write!(f, "Invalid worker count {n_workers}: must be at least 1")
            }
            EngineError::InvalidBatchSize { batch_size } => {
                write!(f, "Invalid batch size {batch_size}: must be at least 1")
            }
            EngineError::ResultChannelClosed { missing } => {
                write!(
                    f,
                    "Result channel closed with {missing} outstanding results; a worker exited early"
                )
            }
        }
    }
}
