//! Errors for experiment-design search.
use crate::fim::errors::FimError;

/// Result alias for experiment-design operations.
pub type DesignResult<T> = Result<T, DesignError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DesignError {
    // ---- Budget and seed ----
    /// The measurement budget must be positive.
    #[error("Design error: budget must be positive")]
    ZeroBudget,

    /// Seed allocation length differs from the number of time points.
    #[error("Design error: seed allocation has {found} entries, expected {expected}")]
    SeedLengthMismatch { expected: usize, found: usize },

    /// Seed allocation does not spend exactly the budget.
    #[error("Design error: seed allocation sums to {found}, budget is {expected}")]
    SeedBudgetMismatch { expected: u64, found: u64 },

    // ---- Criterion ----
    /// Subspace criterion lists no parameters.
    #[error("Design error: subspace criterion needs at least one parameter index")]
    EmptySubspace,

    /// Subspace index outside the FIM dimension, or repeated.
    #[error("Design error: subspace index {index} invalid for {dim} parameters: {reason}")]
    InvalidSubspaceIndex { index: usize, dim: usize, reason: &'static str },

    /// Unrecognized criterion name.
    #[error("Design error: unknown criterion '{0}'")]
    UnknownCriterion(String),

    // ---- FIM ----
    #[error(transparent)]
    Fim(#[from] FimError),
}

#[cfg(feature = "python-bindings")]
impl From<DesignError> for pyo3::PyErr {
    fn from(err: DesignError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
