//! Additive log-prior terms for the likelihood engine.
//!
//! A [`LogPrior`] is evaluated on the raw (positive, non-log) parameter
//! vector and added to the summed per-time log-likelihood. Implementations
//! that know their derivative override [`LogPrior::gradient`]; otherwise a
//! central finite difference of [`LogPrior::log_density`] is used.
use finitediff::FiniteDiff;
use ndarray::Array1;

use crate::likelihood::errors::{LikResult, LikelihoodError};

/// Log-density over raw model parameters.
pub trait LogPrior: Send + Sync {
    /// Number of parameters the prior is defined over.
    fn dim(&self) -> usize;

    /// `log π(θ)` up to an additive constant.
    fn log_density(&self, params: &Array1<f64>) -> f64;

    /// `∇ log π(θ)` with respect to the raw parameters.
    fn gradient(&self, params: &Array1<f64>) -> Array1<f64> {
        params.central_diff(&|p: &Array1<f64>| self.log_density(p))
    }
}

/// Independent Gaussian prior on `log10(θ_i)`.
///
/// `log π(θ) = -½ Σ_i ((log10 θ_i − μ_i) / σ_i)²`, constants dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct LogNormalPrior {
    log10_mean: Array1<f64>,
    log10_sd: Array1<f64>,
}

impl LogNormalPrior {
    /// # Errors
    /// - [`LikelihoodError::PriorLengthMismatch`] if the two vectors differ
    ///   in length.
    /// - [`LikelihoodError::InvalidParameter`] if a mean is non-finite or a
    ///   standard deviation is not finite and positive.
    pub fn new(log10_mean: Array1<f64>, log10_sd: Array1<f64>) -> LikResult<Self> {
        if log10_mean.len() != log10_sd.len() {
            return Err(LikelihoodError::PriorLengthMismatch {
                expected: log10_mean.len(),
                found: log10_sd.len(),
            });
        }
        for (index, (&mu, &sd)) in log10_mean.iter().zip(log10_sd.iter()).enumerate() {
            if !mu.is_finite() {
                return Err(LikelihoodError::InvalidParameter {
                    index,
                    value: mu,
                    reason: "Prior mean must be finite.",
                });
            }
            if !sd.is_finite() || sd <= 0.0 {
                return Err(LikelihoodError::InvalidParameter {
                    index,
                    value: sd,
                    reason: "Prior standard deviation must be finite and positive.",
                });
            }
        }
        Ok(Self { log10_mean, log10_sd })
    }
}

impl LogPrior for LogNormalPrior {
    fn dim(&self) -> usize {
        self.log10_mean.len()
    }

    fn log_density(&self, params: &Array1<f64>) -> f64 {
        params
            .iter()
            .zip(self.log10_mean.iter().zip(self.log10_sd.iter()))
            .map(|(&p, (&mu, &sd))| {
                let z = (p.log10() - mu) / sd;
                -0.5 * z * z
            })
            .sum()
    }

    fn gradient(&self, params: &Array1<f64>) -> Array1<f64> {
        params
            .iter()
            .zip(self.log10_mean.iter().zip(self.log10_sd.iter()))
            .map(|(&p, (&mu, &sd))| -(p.log10() - mu) / (sd * sd) / (p * std::f64::consts::LN_10))
            .collect()
    }
}
