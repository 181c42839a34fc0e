//! Analytic single-species birth–death solver.
//!
//! Reaction network `∅ → X` at rate `k`, `X → ∅` at rate `γ·x`, starting
//! from zero molecules at `t = 0`. The exact transient distribution is
//! Poisson with mean
//!
//! `λ(t) = (k/γ) · (1 − e^{−γt})`,
//!
//! and sensitivities follow from `∂P(n)/∂λ = P(n−1) − P(n)` and the chain
//! rule through `∂λ/∂k`, `∂λ/∂γ`. Parameters are ordered `[k, γ]`.
//!
//! Projection
//! ----------
//! With a supplied state space the solver reuses it unchanged. Otherwise it
//! enumerates `0..=N` where `N` is the smallest count whose Poisson tail at
//! the largest requested mean is below the FSP tolerance, or a fixed
//! `λ + 10√λ + 10` bound when the tolerance is off.
use std::sync::Arc;

use anyhow::{Context, bail, ensure};
use ndarray::{Array1, Array2};
use statrs::distribution::{Discrete, DiscreteCDF, Poisson};

use crate::{
    likelihood::core::tensor::StateDistribution,
    solver::{
        DistributionSolver, ModelSolution, SensitivitySolution, SolveRequest,
        state_space::StateSpace,
    },
};

/// Number of parameters: birth rate `k` and per-molecule death rate `γ`.
pub const N_PARAMETERS: usize = 2;

/// Reference birth–death model with closed-form distributions.
#[derive(Debug, Clone, Copy, Default)]
pub struct BirthDeathSolver;

impl BirthDeathSolver {
    pub fn new() -> Self {
        Self
    }

    /// Poisson mean and its derivatives `(λ, ∂λ/∂k, ∂λ/∂γ)` at time `t`.
    pub fn mean(k: f64, gamma: f64, t: f64) -> (f64, f64, f64) {
        let decay = (-gamma * t).exp();
        let frac = (1.0 - decay) / gamma;
        let lambda = k * frac;
        let d_k = frac;
        let d_gamma = -k * frac / gamma + k * t * decay / gamma;
        (lambda, d_k, d_gamma)
    }

    fn rates(parameters: &Array1<f64>) -> anyhow::Result<(f64, f64)> {
        ensure!(
            parameters.len() == N_PARAMETERS,
            "birth-death model expects {N_PARAMETERS} parameters, got {}",
            parameters.len()
        );
        let (k, gamma) = (parameters[0], parameters[1]);
        if !(k.is_finite() && k > 0.0 && gamma.is_finite() && gamma > 0.0) {
            bail!("birth-death rates must be finite and positive, got k = {k}, gamma = {gamma}");
        }
        Ok((k, gamma))
    }

    fn projection(
        request: &SolveRequest<'_>, max_lambda: f64,
    ) -> anyhow::Result<Arc<StateSpace>> {
        if let Some(space) = &request.state_space {
            ensure!(
                space.n_species() == 1,
                "birth-death model has one species, state space has {}",
                space.n_species()
            );
            return Ok(Arc::clone(space));
        }
        let generous = (max_lambda + 10.0 * max_lambda.sqrt() + 10.0).ceil() as usize;
        let bound = match request.fsp_tolerance {
            Some(tol) if max_lambda > 0.0 => {
                let poisson = Poisson::new(max_lambda).context("invalid Poisson mean")?;
                let mut n = max_lambda.floor() as u64;
                while 1.0 - poisson.cdf(n) > tol && (n as usize) < generous {
                    n += 1;
                }
                n as usize
            }
            Some(_) => 1,
            None => generous,
        };
        Ok(Arc::new(StateSpace::from_bounds(&[bound])?))
    }

    fn validated_times(times: &[f64]) -> anyhow::Result<()> {
        ensure!(!times.is_empty(), "no evaluation times requested");
        if let Some(t) = times.iter().find(|t| !t.is_finite() || **t < 0.0) {
            bail!("evaluation times must be finite and non-negative, got {t}");
        }
        Ok(())
    }

    fn max_lambda(k: f64, gamma: f64, times: &[f64]) -> f64 {
        times.iter().map(|&t| Self::mean(k, gamma, t).0).fold(0.0, f64::max)
    }
}

impl DistributionSolver for BirthDeathSolver {
    type Output = StateDistribution;

    fn n_parameters(&self) -> usize {
        N_PARAMETERS
    }

    fn solve(
        &self, request: &SolveRequest<'_>,
    ) -> anyhow::Result<ModelSolution<StateDistribution>> {
        let (k, gamma) = Self::rates(request.parameters)?;
        Self::validated_times(request.times)?;
        let space = Self::projection(request, Self::max_lambda(k, gamma, request.times))?;
        let n_max = max_copy_number(&space);

        let distributions = request
            .times
            .iter()
            .map(|&t| {
                let pmf = poisson_pmf(Self::mean(k, gamma, t).0, n_max)?;
                Ok(StateDistribution::new(Arc::clone(&space), on_states(&space, &pmf))?)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(ModelSolution {
            times: request.times.to_vec(),
            distributions,
            state_space: Some(space),
        })
    }

    fn solve_sensitivity(
        &self, request: &SolveRequest<'_>,
    ) -> anyhow::Result<SensitivitySolution<StateDistribution>> {
        let (k, gamma) = Self::rates(request.parameters)?;
        Self::validated_times(request.times)?;
        let space = Self::projection(request, Self::max_lambda(k, gamma, request.times))?;
        let n_max = max_copy_number(&space);

        let mut distributions = Vec::with_capacity(request.times.len());
        let mut sensitivities = Vec::with_capacity(request.times.len());
        for &t in request.times {
            let (lambda, d_k, d_gamma) = Self::mean(k, gamma, t);
            let pmf = poisson_pmf(lambda, n_max)?;
            let d_lambda = on_states(&space, &poisson_pmf_derivative(&pmf));
            let per_param = [d_k, d_gamma]
                .iter()
                .map(|&scale| StateDistribution::new(Arc::clone(&space), &d_lambda * scale))
                .collect::<Result<Vec<_>, _>>()?;
            let probability = on_states(&space, &pmf);
            distributions.push(StateDistribution::new(Arc::clone(&space), probability)?);
            sensitivities.push(per_param);
        }

        Ok(SensitivitySolution {
            times: request.times.to_vec(),
            distributions,
            sensitivities,
            state_space: Some(space),
        })
    }
}

// ---- Helper methods ----

/// Largest copy number enumerated by a one-species space.
fn max_copy_number(space: &StateSpace) -> usize {
    space.states().iter().map(|s| s[0]).max().unwrap_or(0)
}

/// Values indexed by copy number, reordered to follow the state list.
fn on_states(space: &StateSpace, by_count: &Array1<f64>) -> Array1<f64> {
    space.states().iter().map(|s| by_count[s[0]]).collect()
}

/// Poisson pmf on `0..=n_max`; a point mass at zero when `λ = 0`.
fn poisson_pmf(lambda: f64, n_max: usize) -> anyhow::Result<Array1<f64>> {
    if lambda == 0.0 {
        let mut pmf = Array1::zeros(n_max + 1);
        pmf[0] = 1.0;
        return Ok(pmf);
    }
    let poisson = Poisson::new(lambda).context("invalid Poisson mean")?;
    Ok((0..=n_max as u64).map(|n| poisson.pmf(n)).collect())
}

/// `∂P(n)/∂λ = P(n−1) − P(n)` on the same support.
fn poisson_pmf_derivative(pmf: &Array1<f64>) -> Array1<f64> {
    let mut d = -pmf.clone();
    for n in 1..pmf.len() {
        d[n] += pmf[n - 1];
    }
    d
}

/// Row-stacked pmfs on `0..=n_max`, one row per time in `times`.
pub fn pmf_table(
    parameters: &Array1<f64>, times: &[f64], n_max: usize,
) -> anyhow::Result<Array2<f64>> {
    let (k, gamma) = BirthDeathSolver::rates(parameters)?;
    let mut table = Array2::zeros((times.len(), n_max + 1));
    for (mut row, &t) in table.rows_mut().into_iter().zip(times.iter()) {
        row.assign(&poisson_pmf(BirthDeathSolver::mean(k, gamma, t).0, n_max)?);
    }
    Ok(table)
}
