use crate::subject::TableError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Batch capacity must be positive")]
    ZeroCapacity,

    #[error("Batch count must be positive")]
    ZeroBatches,

    #[error("Trial count must be positive")]
    ZeroTrials,

    #[error("At least one covariate is required for balance scoring")]
    NoCovariates,

    #[error("Covariate listed more than once: {0}")]
    DuplicateCovariate(String),

    #[error("Covariate not present in the subject table: {0}")]
    UnknownCovariate(String),

    #[error("Deadline must be a positive number of seconds (got {0})")]
    InvalidDeadline(f64),

    #[error("Invalid subject table: {0}")]
    Table(#[from] TableError),
}
