//! Input and output checks shared by the estimation back-ends.
use crate::estimation::{
    errors::{EstimResult, EstimationError},
    types::{Grad, Theta},
};

/// Validate the optional gradient-norm tolerance (finite, strictly positive).
///
/// # Errors
/// [`EstimationError::InvalidTolGrad`].
pub fn verify_tol_grad(tol: Option<f64>) -> EstimResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(EstimationError::InvalidTolGrad {
                tol,
                reason: "Tolerance must be finite.",
            });
        }
        if tol <= 0.0 {
            return Err(EstimationError::InvalidTolGrad {
                tol,
                reason: "Tolerance must be positive.",
            });
        }
    }
    Ok(())
}

/// Validate the optional cost-change tolerance (finite, strictly positive).
///
/// # Errors
/// [`EstimationError::InvalidTolCost`].
pub fn verify_tol_cost(tol: Option<f64>) -> EstimResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(EstimationError::InvalidTolCost {
                tol,
                reason: "Tolerance must be finite.",
            });
        }
        if tol <= 0.0 {
            return Err(EstimationError::InvalidTolCost {
                tol,
                reason: "Tolerance must be positive.",
            });
        }
    }
    Ok(())
}

/// Validate a strictly positive, finite back-end setting.
///
/// # Errors
/// [`EstimationError::InvalidSetting`].
pub fn verify_positive(name: &'static str, value: f64) -> EstimResult<()> {
    if !value.is_finite() {
        return Err(EstimationError::InvalidSetting { name, value, reason: "Must be finite." });
    }
    if value <= 0.0 {
        return Err(EstimationError::InvalidSetting { name, value, reason: "Must be positive." });
    }
    Ok(())
}

/// Validate a count-like back-end setting (at least one).
///
/// # Errors
/// [`EstimationError::InvalidSetting`].
pub fn verify_nonzero(name: &'static str, value: usize) -> EstimResult<()> {
    if value == 0 {
        return Err(EstimationError::InvalidSetting {
            name,
            value: 0.0,
            reason: "Must be at least one.",
        });
    }
    Ok(())
}

/// Validate a gradient vector against dimension and finiteness.
///
/// # Errors
/// - [`EstimationError::GradientDimMismatch`] if the length is not `dim`.
/// - [`EstimationError::InvalidGradient`] for the first non-finite entry.
pub fn validate_grad(grad: &Grad, dim: usize) -> EstimResult<()> {
    if grad.len() != dim {
        return Err(EstimationError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(EstimationError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate and unwrap a point estimate reported by a back-end.
///
/// # Errors
/// - [`EstimationError::MissingPointEstimate`] if none was reported.
/// - [`EstimationError::InvalidPointEstimate`] for a non-finite entry.
pub fn validate_point(point: Option<Theta>) -> EstimResult<Theta> {
    let point = point.ok_or(EstimationError::MissingPointEstimate)?;
    for (index, &value) in point.iter().enumerate() {
        if !value.is_finite() {
            return Err(EstimationError::InvalidPointEstimate {
                index,
                value,
                reason: "Parameter estimates must be finite.",
            });
        }
    }
    Ok(point)
}

/// Validate that a scalar objective value is finite.
///
/// # Errors
/// [`EstimationError::NonFiniteCost`].
pub fn validate_value(value: f64) -> EstimResult<()> {
    if !value.is_finite() {
        return Err(EstimationError::NonFiniteCost { value });
    }
    Ok(())
}

/// Validate a raw initial guess: `expected` entries, all finite and positive.
///
/// # Errors
/// [`EstimationError::GuessLengthMismatch`], [`EstimationError::InvalidGuess`].
pub fn validate_guess(guess: &Theta, expected: usize) -> EstimResult<()> {
    if guess.len() != expected {
        return Err(EstimationError::GuessLengthMismatch { expected, found: guess.len() });
    }
    for (index, &value) in guess.iter().enumerate() {
        if !value.is_finite() {
            return Err(EstimationError::InvalidGuess {
                index,
                value,
                reason: "Initial parameters must be finite.",
            });
        }
        if value <= 0.0 {
            return Err(EstimationError::InvalidGuess {
                index,
                value,
                reason: "Initial parameters must be positive.",
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Tolerance and setting checks reject non-finite and non-positive values.
    //
    // Given
    // -----
    // - NaN, zero, negative and valid inputs.
    //
    // Expect
    // ------
    // - Errors for the bad inputs, `Ok` for `None` and valid values.
    fn scalar_checks_reject_bad_values() {
        assert!(verify_tol_grad(None).is_ok());
        assert!(verify_tol_grad(Some(1e-6)).is_ok());
        assert!(verify_tol_grad(Some(f64::NAN)).is_err());
        assert!(verify_tol_cost(Some(0.0)).is_err());
        assert!(verify_positive("proposal_sd", -1.0).is_err());
        assert!(verify_nonzero("chains", 0).is_err());
        assert!(verify_nonzero("chains", 2).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Initial guesses must match the model and be strictly positive.
    //
    // Given
    // -----
    // - A valid guess, a short guess, and a guess with a zero rate.
    //
    // Expect
    // ------
    // - `Ok`, `GuessLengthMismatch`, and `InvalidGuess { index: 1, .. }`.
    fn guess_validation() {
        // Arrange
        let ok = array![10.0, 0.2];
        let short = array![10.0];
        let zero = array![10.0, 0.0];

        // Act / Assert
        assert!(validate_guess(&ok, 2).is_ok());
        assert_eq!(
            validate_guess(&short, 2),
            Err(EstimationError::GuessLengthMismatch { expected: 2, found: 1 })
        );
        assert!(matches!(
            validate_guess(&zero, 2),
            Err(EstimationError::InvalidGuess { index: 1, .. })
        ));
        assert_eq!(validate_point(None), Err(EstimationError::MissingPointEstimate));
    }
}
