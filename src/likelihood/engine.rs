//! Likelihood engine — log-likelihood and gradient of count data under a
//! CME model.
//!
//! Purpose
//! -------
//! Turn solver output into the scalar `ℓ(θ)` and, optionally, `∇ℓ(θ)` for a
//! [`DataTensor`], and expose the log-space negative log-likelihood used by
//! every estimation back-end.
//!
//! Key behaviors
//! -------------
//! - For each fit time, the nearest model time is selected (ties resolve to
//!   the earlier model time), the distribution is marginalized onto the
//!   observed species, optionally distorted, aligned to the data extent and
//!   floored.
//! - `ℓ = Σ_t Σ_x n_t(x) · ln p_t(x) + log π(θ)`.
//! - `∂ℓ/∂θ_j = Σ_t Σ_x n_t(x) · s_{t,j}(x) / p_t(x) + ∂ log π/∂θ_j`, where
//!   `p` is the floored probability.
//! - [`LikelihoodEngine::negative_log_likelihood_log_space`] evaluates at
//!   `θ = exp(φ)` and returns `(−ℓ, −∇ℓ ⊙ θ)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Raw parameters must be finite and strictly positive.
//! - A supplied state space that fails [`StateSpace::is_consistent`] is
//!   dropped and the solver is asked for a fresh one; this is logged at
//!   `debug` and never surfaces as an error.
//! - A model/data axis-count mismatch aborts the evaluation.
//!
//! Downstream usage
//! ----------------
//! - `estimation::objective` wraps the engine as a log-space objective.
//! - `score_solution` accepts caller-supplied solver output so a solve can
//!   be reused across scoring calls.
use std::sync::Arc;

use ndarray::{Array1, ArrayD, IxDyn};

use crate::{
    likelihood::{
        core::{
            align::{align_slice, marginalize},
            data::DataTensor,
            options::LikelihoodOptions,
            prior::LogPrior,
            species_link::SpeciesLink,
            tensor::Reducible,
        },
        errors::{LikResult, LikelihoodError},
    },
    solver::{
        DistortionOperator, DistributionSolver, ModelSolution, SensitivitySolution, SolveRequest,
        state_space::StateSpace,
    },
};

/// Result of one likelihood evaluation.
#[derive(Debug, Clone)]
pub struct LikelihoodEvaluation {
    pub log_likelihood: f64,
    pub gradient: Option<Array1<f64>>,
    /// State space the solver actually used; reuse it for later calls.
    pub state_space: Option<Arc<StateSpace>>,
}

/// Borrowed view of solver output to be scored.
#[derive(Debug, Clone, Copy)]
pub struct ModelOutput<'a, T> {
    pub times: &'a [f64],
    pub distributions: &'a [T],
    pub sensitivities: Option<&'a [Vec<T>]>,
}

impl<'a, T> From<&'a ModelSolution<T>> for ModelOutput<'a, T> {
    fn from(sol: &'a ModelSolution<T>) -> Self {
        Self { times: &sol.times, distributions: &sol.distributions, sensitivities: None }
    }
}

impl<'a, T> From<&'a SensitivitySolution<T>> for ModelOutput<'a, T> {
    fn from(sol: &'a SensitivitySolution<T>) -> Self {
        Self {
            times: &sol.times,
            distributions: &sol.distributions,
            sensitivities: Some(&sol.sensitivities),
        }
    }
}

/// Scores data against a solver's output.
#[derive(Clone)]
pub struct LikelihoodEngine<S: DistributionSolver> {
    solver: S,
    link: SpeciesLink,
    distortion: Option<Arc<dyn DistortionOperator>>,
    prior: Option<Arc<dyn LogPrior>>,
    options: LikelihoodOptions,
}

impl<S: DistributionSolver> LikelihoodEngine<S> {
    pub fn new(solver: S, link: SpeciesLink) -> Self {
        Self { solver, link, distortion: None, prior: None, options: LikelihoodOptions::default() }
    }

    pub fn with_distortion(mut self, distortion: Arc<dyn DistortionOperator>) -> Self {
        self.distortion = Some(distortion);
        self
    }

    pub fn with_prior(mut self, prior: Arc<dyn LogPrior>) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn with_options(mut self, options: LikelihoodOptions) -> Self {
        self.options = options;
        self
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn species_link(&self) -> &SpeciesLink {
        &self.link
    }

    pub fn options(&self) -> &LikelihoodOptions {
        &self.options
    }

    pub fn n_parameters(&self) -> usize {
        self.solver.n_parameters()
    }

    /// Solve the model at the fit times and score the data.
    ///
    /// Parameters
    /// ----------
    /// - `params`: raw positive rates, in solver order.
    /// - `data`: count tensor built once per session.
    /// - `fit_times`: indices into `data`'s time bins to score.
    /// - `state_space`: optional frozen projection. An inconsistent handle
    ///   is discarded and regenerated by the solver.
    /// - `with_gradient`: request sensitivities and return `∇ℓ`.
    ///
    /// # Errors
    /// - [`LikelihoodError::InvalidParameter`] for non-positive parameters.
    /// - [`LikelihoodError::FitTimeOutOfRange`] for a bad fit-time index.
    /// - [`LikelihoodError::Collaborator`] if the solver or PDO fails.
    /// - Any alignment error, in particular
    ///   [`LikelihoodError::AxisCountMismatch`].
    pub fn evaluate(
        &self, params: &Array1<f64>, data: &DataTensor, fit_times: &[usize],
        state_space: Option<&Arc<StateSpace>>, with_gradient: bool,
    ) -> LikResult<LikelihoodEvaluation> {
        validate_params(params)?;
        validate_fit_times(fit_times, data)?;
        let times: Vec<f64> = fit_times.iter().map(|&i| data.slices()[i].time()).collect();
        let request = SolveRequest {
            times: &times,
            parameters: params,
            fsp_tolerance: self.options.fsp_tolerance,
            state_space: usable_state_space(state_space),
        };

        if with_gradient {
            let sol = self.solver.solve_sensitivity(&request)?;
            let (ll, grad) = self.score_solution(params, data, fit_times, (&sol).into(), true)?;
            Ok(LikelihoodEvaluation {
                log_likelihood: ll,
                gradient: grad,
                state_space: sol.state_space,
            })
        } else {
            let sol = self.solver.solve(&request)?;
            let (ll, _) = self.score_solution(params, data, fit_times, (&sol).into(), false)?;
            Ok(LikelihoodEvaluation {
                log_likelihood: ll,
                gradient: None,
                state_space: sol.state_space,
            })
        }
    }

    /// Score already-computed solver output.
    ///
    /// Returns `(ℓ, Some(∇ℓ))` when `with_gradient` is set, `(ℓ, None)`
    /// otherwise. The prior, if any, is included.
    ///
    /// # Errors
    /// - [`LikelihoodError::MissingSensitivities`] if a gradient is requested
    ///   from output without sensitivities.
    /// - [`LikelihoodError::SolutionLengthMismatch`],
    ///   [`LikelihoodError::SensitivityCountMismatch`] for malformed output.
    /// - [`LikelihoodError::EmptySolution`] if there are no model times.
    pub fn score_solution<T: Reducible>(
        &self, params: &Array1<f64>, data: &DataTensor, fit_times: &[usize],
        output: ModelOutput<'_, T>, with_gradient: bool,
    ) -> LikResult<(f64, Option<Array1<f64>>)> {
        validate_fit_times(fit_times, data)?;
        if output.times.is_empty() {
            return Err(LikelihoodError::EmptySolution);
        }
        if output.times.len() != output.distributions.len() {
            return Err(LikelihoodError::SolutionLengthMismatch {
                times: output.times.len(),
                distributions: output.distributions.len(),
            });
        }
        let sensitivities = match (with_gradient, output.sensitivities) {
            (false, _) => None,
            (true, None) => return Err(LikelihoodError::MissingSensitivities),
            (true, Some(s)) if s.len() != output.times.len() => {
                return Err(LikelihoodError::SolutionLengthMismatch {
                    times: output.times.len(),
                    distributions: s.len(),
                });
            }
            (true, Some(s)) => Some(s),
        };

        let n_params = params.len();
        let mut log_likelihood = 0.0;
        let mut gradient = Array1::<f64>::zeros(n_params);
        for &fit in fit_times {
            let slice = &data.slices()[fit];
            let m = nearest_time_index(output.times, slice.time())?;
            let sens = match sensitivities {
                Some(all) => {
                    if all[m].len() != n_params {
                        return Err(LikelihoodError::SensitivityCountMismatch {
                            expected: n_params,
                            found: all[m].len(),
                        });
                    }
                    Some(all[m].as_slice())
                }
                None => None,
            };
            let (p, s) = self.observed_tensors(&output.distributions[m], sens)?;
            let aligned = align_slice(&p, &s, data.extent(), &self.options)?;

            for (state, &count) in slice.counts() {
                let n = count as f64;
                let prob = aligned.probability[IxDyn(state)];
                log_likelihood += n * prob.ln();
                for (g, sj) in gradient.iter_mut().zip(aligned.sensitivities.iter()) {
                    *g += n * sj[IxDyn(state)] / prob;
                }
            }
        }

        if let Some(prior) = &self.prior {
            if prior.dim() != n_params {
                return Err(LikelihoodError::PriorLengthMismatch {
                    expected: prior.dim(),
                    found: n_params,
                });
            }
            log_likelihood += prior.log_density(params);
            if with_gradient {
                gradient += &prior.gradient(params);
            }
        }
        Ok((log_likelihood, with_gradient.then_some(gradient)))
    }

    /// Negative log-likelihood at `θ = exp(φ)` and its gradient in `φ`.
    ///
    /// # Errors
    /// As [`LikelihoodEngine::evaluate`].
    pub fn negative_log_likelihood_log_space(
        &self, log_params: &Array1<f64>, data: &DataTensor, fit_times: &[usize],
        state_space: Option<&Arc<StateSpace>>, with_gradient: bool,
    ) -> LikResult<(f64, Option<Array1<f64>>)> {
        let params = log_params.mapv(f64::exp);
        let eval = self.evaluate(&params, data, fit_times, state_space, with_gradient)?;
        let grad = eval.gradient.map(|g| -(g * &params));
        Ok((-eval.log_likelihood, grad))
    }

    /// Marginalize and distort one distribution and its sensitivities.
    fn observed_tensors<T: Reducible>(
        &self, distribution: &T, sensitivities: Option<&[T]>,
    ) -> LikResult<(ArrayD<f64>, Vec<ArrayD<f64>>)> {
        let p = marginalize(distribution, &self.link)?;
        let s = sensitivities
            .unwrap_or(&[])
            .iter()
            .map(|sj| marginalize(sj, &self.link))
            .collect::<LikResult<Vec<_>>>()?;
        match &self.distortion {
            None => Ok((p, s)),
            Some(pdo) => {
                let s_obs = s
                    .iter()
                    .enumerate()
                    .map(|(j, sj)| pdo.observation_dist_diff(&p, sj, j))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok((pdo.observation_dist(&p)?, s_obs))
            }
        }
    }
}

/// Index of the model time closest to `t`; the earlier one on ties.
///
/// # Errors
/// [`LikelihoodError::EmptySolution`] if `model_times` is empty.
pub fn nearest_time_index(model_times: &[f64], t: f64) -> LikResult<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &mt) in model_times.iter().enumerate() {
        let d = (mt - t).abs();
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i).ok_or(LikelihoodError::EmptySolution)
}

// ---- Helper methods ----

fn validate_params(params: &Array1<f64>) -> LikResult<()> {
    for (index, &value) in params.iter().enumerate() {
        if !value.is_finite() {
            return Err(LikelihoodError::InvalidParameter {
                index,
                value,
                reason: "Parameter must be finite.",
            });
        }
        if value <= 0.0 {
            return Err(LikelihoodError::InvalidParameter {
                index,
                value,
                reason: "Parameter must be strictly positive.",
            });
        }
    }
    Ok(())
}

fn validate_fit_times(fit_times: &[usize], data: &DataTensor) -> LikResult<()> {
    match fit_times.iter().find(|&&i| i >= data.n_times()) {
        Some(&index) => Err(LikelihoodError::FitTimeOutOfRange { index, len: data.n_times() }),
        None => Ok(()),
    }
}

fn usable_state_space(state_space: Option<&Arc<StateSpace>>) -> Option<Arc<StateSpace>> {
    match state_space {
        Some(space) if space.is_consistent() => Some(Arc::clone(space)),
        Some(space) => {
            tracing::debug!(
                states = space.len(),
                "supplied state space is inconsistent; requesting a fresh projection"
            );
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        likelihood::core::{data::TimeSlice, prior::LogNormalPrior},
        solver::birth_death::BirthDeathSolver,
    };
    use approx::assert_relative_eq;
    use ndarray::array;
    use std::collections::{BTreeMap, HashMap};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Nearest-time matching and tie-breaking.
    // - Additivity over disjoint fit-time sets.
    // - Analytic gradient vs. central differences, with and without prior.
    // - Stale state-space recovery and fatal axis mismatch.
    // - Log-space chain rule.
    //
    // They intentionally DO NOT cover:
    // - Optimizer behavior (see `estimation`).
    // -------------------------------------------------------------------------

    fn engine() -> LikelihoodEngine<BirthDeathSolver> {
        let link = SpeciesLink::all_observed(&["x"]).expect("valid link");
        LikelihoodEngine::new(BirthDeathSolver::new(), link)
    }

    fn data() -> DataTensor {
        let slice = |t: f64, cells: &[(usize, u64)]| {
            let counts: BTreeMap<Vec<usize>, u64> =
                cells.iter().map(|&(x, n)| (vec![x], n)).collect();
            TimeSlice::new(t, counts)
        };
        DataTensor::from_slices(
            vec![14],
            vec![
                slice(1.0, &[(0, 2), (1, 4), (2, 5), (3, 3), (4, 1)]),
                slice(4.0, &[(3, 1), (5, 3), (6, 4), (8, 2), (13, 1)]),
            ],
        )
        .expect("valid slices")
    }

    #[test]
    // Purpose
    // -------
    // Nearest-time matching prefers the earlier time on exact ties.
    //
    // Given
    // -----
    // - Model times [1, 3, 5] and query times 2, 4.9, 100.
    //
    // Expect
    // ------
    // - Indices 0, 2, 2; empty model times are an error.
    fn nearest_time_breaks_ties_to_earlier() {
        // Arrange
        let times = [1.0, 3.0, 5.0];

        // Act / Assert
        assert_eq!(nearest_time_index(&times, 2.0).expect("non-empty"), 0);
        assert_eq!(nearest_time_index(&times, 4.9).expect("non-empty"), 2);
        assert_eq!(nearest_time_index(&times, 100.0).expect("non-empty"), 2);
        assert_eq!(nearest_time_index(&[], 1.0), Err(LikelihoodError::EmptySolution));
    }

    #[test]
    // Purpose
    // -------
    // Log-likelihood is additive over disjoint fit-time sets.
    //
    // Given
    // -----
    // - Two time bins; parameters k = 3, γ = 0.4; no prior.
    //
    // Expect
    // ------
    // - ℓ({0, 1}) = ℓ({0}) + ℓ({1}).
    fn log_likelihood_is_additive_over_time_bins() {
        // Arrange
        let (eng, d) = (engine(), data());
        let theta = array![3.0, 0.4];

        // Act
        let both = eng.evaluate(&theta, &d, &[0, 1], None, false).expect("evaluates");
        let first = eng.evaluate(&theta, &d, &[0], None, false).expect("evaluates");
        let second = eng.evaluate(&theta, &d, &[1], None, false).expect("evaluates");

        // Assert
        assert!(both.log_likelihood.is_finite());
        assert_relative_eq!(
            both.log_likelihood,
            first.log_likelihood + second.log_likelihood,
            epsilon = 1e-9
        );
    }

    #[test]
    // Purpose
    // -------
    // The analytic gradient matches central differences of ℓ, including a
    // log-normal prior term.
    //
    // Given
    // -----
    // - k = 3, γ = 0.4 on a frozen projection large enough to hold all mass.
    //
    // Expect
    // ------
    // - Each component within 1e-4 relative of the FD estimate.
    fn gradient_matches_central_differences() {
        // Arrange
        let prior = LogNormalPrior::new(array![0.5, -0.5], array![1.0, 1.0]).expect("valid prior");
        let eng = engine()
            .with_prior(Arc::new(prior))
            .with_options(LikelihoodOptions::default().without_fsp_tolerance());
        let d = data();
        let space = Arc::new(StateSpace::from_bounds(&[40]).expect("valid bounds"));
        let theta = array![3.0, 0.4];
        let h = 1e-5;

        // Act
        let eval = eng.evaluate(&theta, &d, &[0, 1], Some(&space), true).expect("evaluates");
        let grad = eval.gradient.expect("gradient requested");

        // Assert
        for j in 0..2 {
            let mut up = theta.clone();
            let mut dn = theta.clone();
            up[j] += h;
            dn[j] -= h;
            let lu = eng.evaluate(&up, &d, &[0, 1], Some(&space), false).expect("evaluates");
            let ld = eng.evaluate(&dn, &d, &[0, 1], Some(&space), false).expect("evaluates");
            let fd = (lu.log_likelihood - ld.log_likelihood) / (2.0 * h);
            assert_relative_eq!(grad[j], fd, max_relative = 1e-4);
        }
    }

    #[test]
    // Purpose
    // -------
    // An inconsistent state space is silently replaced.
    //
    // Given
    // -----
    // - A handle whose index map has fewer entries than its state list.
    //
    // Expect
    // ------
    // - Evaluation succeeds and returns a consistent projection.
    fn stale_state_space_is_regenerated() {
        // Arrange
        let (eng, d) = (engine(), data());
        let stale = Arc::new(StateSpace::from_parts(
            1,
            vec![vec![0], vec![1], vec![2]],
            HashMap::from([(vec![0], 0)]),
        ));

        // Act
        let eval =
            eng.evaluate(&array![3.0, 0.4], &d, &[0], Some(&stale), false).expect("recovers");

        // Assert
        let fresh = eval.state_space.expect("solver returns its projection");
        assert!(fresh.is_consistent());
        assert!(fresh.len() > 3);
    }

    #[test]
    // Purpose
    // -------
    // A link table whose species count does not match the model is fatal.
    //
    // Given
    // -----
    // - A two-species link table for the one-species birth–death model.
    //
    // Expect
    // ------
    // - `AxisCountMismatch`.
    fn species_link_mismatch_is_fatal() {
        // Arrange
        let link = SpeciesLink::all_observed(&["x", "y"]).expect("valid link");
        let eng = LikelihoodEngine::new(BirthDeathSolver::new(), link);

        // Act
        let err =
            eng.evaluate(&array![3.0, 0.4], &data(), &[0], None, false).expect_err("mismatch");

        // Assert
        assert!(matches!(err, LikelihoodError::AxisCountMismatch { .. }));
    }

    #[test]
    // Purpose
    // -------
    // The log-space entry point negates ℓ and scales the gradient by θ.
    //
    // Given
    // -----
    // - φ = ln [3, 0.4].
    //
    // Expect
    // ------
    // - value = −ℓ(θ); gradient = −∇ℓ(θ) ⊙ θ.
    fn log_space_applies_chain_rule() {
        // Arrange
        let (eng, d) = (engine(), data());
        let theta = array![3.0, 0.4];
        let phi = theta.mapv(f64::ln);

        // Act
        let raw = eng.evaluate(&theta, &d, &[0, 1], None, true).expect("evaluates");
        let (value, grad) = eng
            .negative_log_likelihood_log_space(&phi, &d, &[0, 1], None, true)
            .expect("evaluates");

        // Assert
        let g_raw = raw.gradient.expect("gradient requested");
        let g_log = grad.expect("gradient requested");
        assert_relative_eq!(value, -raw.log_likelihood, epsilon = 1e-9);
        for j in 0..2 {
            assert_relative_eq!(g_log[j], -g_raw[j] * theta[j], epsilon = 1e-9);
        }
    }

    #[test]
    // Purpose
    // -------
    // Non-positive parameters and bad fit indices are rejected up front.
    //
    // Given
    // -----
    // - θ = [0, 1]; fit index 7 on a two-bin tensor.
    //
    // Expect
    // ------
    // - `InvalidParameter` and `FitTimeOutOfRange`.
    fn rejects_invalid_inputs() {
        // Arrange
        let (eng, d) = (engine(), data());

        // Act
        let bad_param = eng.evaluate(&array![0.0, 1.0], &d, &[0], None, false);
        let bad_fit = eng.evaluate(&array![1.0, 1.0], &d, &[7], None, false);

        // Assert
        assert!(matches!(bad_param, Err(LikelihoodError::InvalidParameter { index: 0, .. })));
        assert_eq!(bad_fit.expect_err("out of range"), LikelihoodError::FitTimeOutOfRange {
            index: 7,
            len: 2
        });
    }
}
