//! Adapter that exposes a [`LogObjective`] as an `argmin` problem.
//!
//! Maximizing `ℓ(exp φ)` is cast as minimizing `c(φ) = -ℓ(exp φ)`. Analytic
//! gradients are negated accordingly. Without one, the cost is
//! central-differenced, so that branch needs no sign flip.
use std::cell::RefCell;

use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

use crate::estimation::{
    errors::EstimationError,
    traits::LogObjective,
    types::{Cost, Grad, Theta},
    validation::validate_grad,
};

/// Bridges a [`LogObjective`] to `argmin`'s `CostFunction` and `Gradient`.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogObjective> {
    pub f: &'a F,
}

impl<'a, F: LogObjective> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F) -> Self {
        Self { f }
    }
}

impl<F: LogObjective> CostFunction for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Output = Cost;

    /// `c(φ) = -ℓ(exp φ)`.
    ///
    /// # Errors
    /// Objective failures, and [`EstimationError::NonFiniteCost`] for a
    /// non-finite value.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta)?;
        if !output.is_finite() {
            return Err(EstimationError::NonFiniteCost { value: output }.into());
        }
        Ok(-output)
    }
}

impl<F: LogObjective> Gradient for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Gradient of the cost at `φ`: the validated, negated analytic
    /// gradient, or central differences of the cost when the objective has
    /// none.
    ///
    /// # Errors
    /// Objective errors other than
    /// [`EstimationError::GradientNotImplemented`], the first cost failure
    /// during differencing, and gradient validation errors.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        match self.f.grad(theta) {
            Ok(g) => {
                validate_grad(&g, theta.len())?;
                Ok(-g)
            }
            Err(EstimationError::GradientNotImplemented) => central_difference(self, theta),
            Err(e) => Err(e.into()),
        }
    }
}

// ---- Helper methods ----

/// Central differences of the cost. The difference closure must return
/// `f64`, so the first failing evaluation is parked and returned afterwards.
fn central_difference<F: LogObjective>(
    adapter: &ArgMinAdapter<'_, F>, theta: &Theta,
) -> Result<Grad, Error> {
    let failure: RefCell<Option<Error>> = RefCell::new(None);
    let grad = theta.central_diff(&|t: &Theta| {
        adapter.cost(t).unwrap_or_else(|e| {
            failure.borrow_mut().get_or_insert(e);
            f64::NAN
        })
    });
    if let Some(err) = failure.into_inner() {
        return Err(err);
    }
    validate_grad(&grad, theta.len())?;
    Ok(grad)
}
