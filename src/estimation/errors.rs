//! Errors for parameter estimation.
//!
//! [`EstimationError`] covers option validation, objective failures, the
//! argmin back-ends and the Metropolis–Hastings chains. Backend errors reach
//! this type through `From<argmin::core::Error>`, which first recovers an
//! `EstimationError` that was boxed on its way through argmin, then maps
//! argmin's own error kinds, and otherwise keeps the display text.
use argmin::core::{ArgminError, Error};

use crate::likelihood::errors::LikelihoodError;

/// Result alias for estimation operations.
pub type EstimResult<T> = Result<T, EstimationError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimationError {
    // ---- Gradient ----
    /// The objective has no analytic gradient; finite differences are used.
    #[error("Gradient not implemented")]
    GradientNotImplemented,

    #[error("Gradient dimension mismatch: expected {expected}, found {found}")]
    GradientDimMismatch { expected: usize, found: usize },

    #[error("Invalid gradient at index {index}: {value}: {reason}")]
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    // ---- Options ----
    #[error("Invalid gradient tolerance {tol}: {reason}")]
    InvalidTolGrad { tol: f64, reason: &'static str },

    #[error("Invalid cost function change tolerance {tol}: {reason}")]
    InvalidTolCost { tol: f64, reason: &'static str },

    #[error("Invalid maximum iterations {max_iter}: {reason}")]
    InvalidMaxIter { max_iter: usize, reason: &'static str },

    #[error("No tolerances provided")]
    NoTolerancesProvided,

    #[error("Invalid line searcher '{name}': {reason}")]
    InvalidLineSearch { name: String, reason: &'static str },

    #[error("Invalid L-BFGS memory {mem}: {reason}")]
    InvalidLBFGSMem { mem: usize, reason: &'static str },

    /// A numeric back-end setting is out of range.
    #[error("Invalid setting '{name}' = {value}: {reason}")]
    InvalidSetting { name: &'static str, value: f64, reason: &'static str },

    /// A named option could not be parsed.
    #[error("Invalid option '{name}' = '{value}': {reason}")]
    InvalidOption { name: String, value: String, reason: &'static str },

    #[error("Unknown back-end '{0}'")]
    UnknownBackend(String),

    // ---- Initial guess ----
    #[error("Initial guess has {found} entries, the model has {expected} parameters")]
    GuessLengthMismatch { expected: usize, found: usize },

    #[error("Invalid initial guess at index {index}: {value}: {reason}")]
    InvalidGuess { index: usize, value: f64, reason: &'static str },

    // ---- Objective ----
    #[error("Non-finite cost value: {value}")]
    NonFiniteCost { value: f64 },

    // ---- Outcome ----
    #[error("Invalid estimated parameter at index {index}: {value}: {reason}")]
    InvalidPointEstimate { index: usize, value: f64, reason: &'static str },

    #[error("Missing estimated parameters")]
    MissingPointEstimate,

    /// Every Metropolis–Hastings chain failed; the first failure is kept.
    #[error("All {n_chains} chains failed, first failure: {first}")]
    AllChainsFailed { n_chains: usize, first: String },

    // ---- Argmin ----
    #[error("Invalid parameter: {text}")]
    InvalidParameter { text: String },

    #[error("Not implemented: {text}")]
    NotImplemented { text: String },

    #[error("Not initialized: {text}")]
    NotInitialized { text: String },

    #[error("Condition violated: {text}")]
    ConditionViolated { text: String },

    #[error("Checkpoint not found: {text}")]
    CheckPointNotFound { text: String },

    #[error("Potential bug: {text}")]
    PotentialBug { text: String },

    #[error("Impossible error: {text}")]
    ImpossibleError { text: String },

    #[error("Backend error: {text}")]
    BackendError { text: String },

    // ---- Likelihood ----
    #[error(transparent)]
    Likelihood(#[from] LikelihoodError),
}

impl From<Error> for EstimationError {
    fn from(original_err: Error) -> Self {
        let original_err = match original_err.downcast::<EstimationError>() {
            Ok(own) => return own,
            Err(err) => err,
        };
        match original_err.downcast::<ArgminError>() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => {
                    EstimationError::InvalidParameter { text }
                }
                ArgminError::NotImplemented { text } => EstimationError::NotImplemented { text },
                ArgminError::NotInitialized { text } => EstimationError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => {
                    EstimationError::ConditionViolated { text }
                }
                ArgminError::CheckpointNotFound { text } => {
                    EstimationError::CheckPointNotFound { text }
                }
                ArgminError::PotentialBug { text } => EstimationError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => EstimationError::ImpossibleError { text },
                other => EstimationError::BackendError { text: other.to_string() },
            },
            Err(err) => EstimationError::BackendError { text: err.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Errors boxed into argmin's error type come back out unchanged.
    //
    // Given
    // -----
    // - An `EstimationError`, an `ArgminError`, and a plain anyhow message,
    //   each converted into `argmin::core::Error`.
    //
    // Expect
    // ------
    // - The own error round-trips, argmin kinds map to their variants, and
    //   anything else becomes `BackendError` with the message text.
    fn argmin_errors_downcast_in_order() {
        // Arrange
        let own: Error = EstimationError::NonFiniteCost { value: f64::INFINITY }.into();
        let argmin: Error = ArgminError::NotInitialized { text: "state".into() }.into();
        let other: Error = anyhow::anyhow!("line search failed");

        // Act / Assert
        assert_eq!(
            EstimationError::from(own),
            EstimationError::NonFiniteCost { value: f64::INFINITY }
        );
        assert_eq!(
            EstimationError::from(argmin),
            EstimationError::NotInitialized { text: "state".into() }
        );
        assert_eq!(
            EstimationError::from(other),
            EstimationError::BackendError { text: "line search failed".into() }
        );
    }
}
