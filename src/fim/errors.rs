//! Errors for FIM computation and experiment evaluation.
//!
//! ## Conventions
//! - Time-point indices are 0-based positions in the FIM library.
//! - A rank-deficient total FIM is **not** an error; it is reported as
//!   `CovarianceEstimate::Undefined` by the metrics layer.
use crate::likelihood::errors::LikelihoodError;

/// Result alias for FIM operations.
pub type FimResult<T> = Result<T, FimError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FimError {
    // ---- Library shape ----
    /// No per-time FIMs were supplied.
    #[error("FIM error: the FIM library is empty")]
    EmptyLibrary,

    /// Per-time FIMs have no parameters.
    #[error("FIM error: FIMs must cover at least one parameter")]
    EmptyMatrix,

    /// A per-time FIM is not square.
    #[error("FIM error: FIM at time index {index} is {rows}x{cols}, expected a square matrix")]
    NotSquare { index: usize, rows: usize, cols: usize },

    /// Per-time FIMs disagree on the parameter count.
    #[error("FIM error: FIM at time index {index} has dimension {found}, expected {expected}")]
    DimensionMismatch { index: usize, expected: usize, found: usize },

    /// A per-time FIM contains NaN or infinite entries.
    #[error("FIM error: FIM at time index {index} has non-finite entries")]
    NonFinite { index: usize },

    /// Allocation length differs from the number of time points.
    #[error("FIM error: {counts} cell counts supplied for {fims} time points")]
    CountLengthMismatch { fims: usize, counts: usize },

    // ---- Sensitivity input ----
    /// Sensitivity solution holds a different number of entries than times.
    #[error("FIM error: {times} time points but {found} sensitivity sets")]
    SensitivityLengthMismatch { times: usize, found: usize },

    /// Reduction of distributions or sensitivities failed.
    #[error(transparent)]
    Likelihood(#[from] LikelihoodError),

    // ---- Collaborators ----
    /// Failure raised by a single-cell FIM calculator or PDO.
    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

impl From<anyhow::Error> for FimError {
    fn from(err: anyhow::Error) -> Self {
        FimError::Collaborator(err.to_string())
    }
}

#[cfg(feature = "python-bindings")]
impl From<FimError> for pyo3::PyErr {
    fn from(err: FimError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
