//! Error types for tree, forest and polynomial regression
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegressionError>;

/// An error when fitting or configuring one of the regressors
#[derive(Error, Debug)]
pub enum RegressionError {
    /// A hyperparameter was set to an unusable value
    #[error("invalid parameter: {0}")]
    InvalidParams(String),
    /// Records and targets disagree on the number of samples
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    /// A fit was attempted on an empty sample
    #[error("degenerate sample: {0}")]
    DegenerateSample(String),
    #[error(transparent)]
    BaseCrate(#[from] linfa::Error),
    /// Errors from the least-squares solver
    #[error(transparent)]
    Linalg(#[from] linfa_linalg::LinalgError),
}
