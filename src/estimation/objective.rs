//! The likelihood engine as a log-parameterized objective.
use std::sync::Arc;

use crate::{
    estimation::{
        errors::{EstimResult, EstimationError},
        traits::LogObjective,
        types::{Grad, Theta},
    },
    likelihood::{core::data::DataTensor, engine::LikelihoodEngine},
    solver::{DistributionSolver, state_space::StateSpace},
};

/// `φ ↦ ℓ(exp φ)` over fixed data, fit times and state space.
pub struct LikelihoodObjective<'a, S: DistributionSolver> {
    engine: &'a LikelihoodEngine<S>,
    data: &'a DataTensor,
    fit_times: &'a [usize],
    state_space: Option<Arc<StateSpace>>,
}

impl<'a, S: DistributionSolver> LikelihoodObjective<'a, S> {
    pub fn new(
        engine: &'a LikelihoodEngine<S>, data: &'a DataTensor, fit_times: &'a [usize],
        state_space: Option<Arc<StateSpace>>,
    ) -> Self {
        Self { engine, data, fit_times, state_space }
    }

    pub fn state_space(&self) -> Option<&Arc<StateSpace>> {
        self.state_space.as_ref()
    }
}

impl<S: DistributionSolver> LogObjective for LikelihoodObjective<'_, S> {
    fn dim(&self) -> usize {
        self.engine.n_parameters()
    }

    fn value(&self, log_theta: &Theta) -> EstimResult<f64> {
        let (nll, _) = self.engine.negative_log_likelihood_log_space(
            log_theta,
            self.data,
            self.fit_times,
            self.state_space.as_ref(),
            false,
        )?;
        Ok(-nll)
    }

    fn check(&self, log_theta: &Theta) -> EstimResult<()> {
        if log_theta.len() != self.dim() {
            return Err(EstimationError::GuessLengthMismatch {
                expected: self.dim(),
                found: log_theta.len(),
            });
        }
        for (index, &value) in log_theta.iter().enumerate() {
            if !value.is_finite() {
                return Err(EstimationError::InvalidGuess {
                    index,
                    value,
                    reason: "Log-parameters must be finite.",
                });
            }
        }
        Ok(())
    }

    fn grad(&self, log_theta: &Theta) -> EstimResult<Grad> {
        let (_, grad) = self.engine.negative_log_likelihood_log_space(
            log_theta,
            self.data,
            self.fit_times,
            self.state_space.as_ref(),
            true,
        )?;
        grad.map(|g| -g).ok_or(EstimationError::GradientNotImplemented)
    }
}
