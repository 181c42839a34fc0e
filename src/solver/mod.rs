//! Solver collaborators — the contracts this crate consumes from an FSP
//! solver and a measurement-distortion operator.
//!
//! Purpose
//! -------
//! Describe, as traits, the external numerical components the likelihood
//! engine and FIM aggregator call into, plus small reference
//! implementations used by tests and examples.
//!
//! Key behaviors
//! -------------
//! - [`DistributionSolver`] produces per-time probability distributions
//!   ([`ModelSolution`]) and, in its sensitivity variant, per-time
//!   per-parameter sensitivities ([`SensitivitySolution`]).
//! - [`DistortionOperator`] maps true-state distributions (and their
//!   sensitivities) to distributions of an imperfect measurement.
//! - [`birth_death::BirthDeathSolver`] is an analytic single-species
//!   birth–death model; [`distortion::BinomialDistortion`] is a binomial
//!   detection operator.
//!
//! Invariants & assumptions
//! ------------------------
//! - Solver outputs implement [`Reducible`], so probabilities and
//!   sensitivities are marginalized by the same code path.
//! - A supplied state space is an immutable `Arc` handle. Solvers either use
//!   it as-is or, when none is supplied, enumerate a fresh one and return it.
//! - Collaborator failures are reported as `anyhow::Error`; the likelihood
//!   layer captures them as `LikelihoodError::Collaborator`.
//!
//! Conventions
//! -----------
//! - `parameters` are raw positive rates in the model's parameter order.
//! - `fsp_tolerance = None` asks the solver not to adapt its projection to
//!   an error bound.
use std::sync::Arc;

use ndarray::{Array1, ArrayD};

use crate::likelihood::core::tensor::Reducible;

pub mod birth_death;
pub mod distortion;
pub mod state_space;

use state_space::StateSpace;

/// Inputs to a single solver call.
#[derive(Debug, Clone)]
pub struct SolveRequest<'a> {
    pub times: &'a [f64],
    pub parameters: &'a Array1<f64>,
    pub fsp_tolerance: Option<f64>,
    pub state_space: Option<Arc<StateSpace>>,
}

/// Per-time probability distributions returned by a solve.
#[derive(Debug, Clone)]
pub struct ModelSolution<T> {
    pub times: Vec<f64>,
    pub distributions: Vec<T>,
    /// Projection the distributions are defined on, if the solver uses one.
    pub state_space: Option<Arc<StateSpace>>,
}

/// Per-time distributions and their parameter sensitivities.
///
/// `sensitivities[t][j]` is `∂P(t)/∂θ_j`.
#[derive(Debug, Clone)]
pub struct SensitivitySolution<T> {
    pub times: Vec<f64>,
    pub distributions: Vec<T>,
    pub sensitivities: Vec<Vec<T>>,
    pub state_space: Option<Arc<StateSpace>>,
}

/// Chemical-master-equation solver consumed by the likelihood engine.
pub trait DistributionSolver: Send + Sync {
    type Output: Reducible + Send + Sync;

    /// Number of model parameters the solver expects.
    fn n_parameters(&self) -> usize;

    fn solve(&self, request: &SolveRequest<'_>) -> anyhow::Result<ModelSolution<Self::Output>>;

    fn solve_sensitivity(
        &self, request: &SolveRequest<'_>,
    ) -> anyhow::Result<SensitivitySolution<Self::Output>>;
}

/// Probabilistic distortion operator (PDO).
///
/// Both methods take and return tensors with the same axis semantics as
/// their input; extents may differ.
pub trait DistortionOperator: Send + Sync {
    fn observation_dist(&self, distribution: &ArrayD<f64>) -> anyhow::Result<ArrayD<f64>>;

    fn observation_dist_diff(
        &self, distribution: &ArrayD<f64>, sensitivity: &ArrayD<f64>, param_index: usize,
    ) -> anyhow::Result<ArrayD<f64>>;
}
