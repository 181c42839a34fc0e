//! Objective interface and shared result types for the estimation back-ends.
use argmin::core::TerminationStatus;
use argmin_math::ArgminL2Norm;
use ndarray::Array2;
use serde::Serialize;

use crate::estimation::{
    errors::{EstimResult, EstimationError},
    types::{FnEvalMap, Grad, Theta},
    validation::{validate_point, validate_value},
};

/// Log-parameterized objective maximized by every back-end.
///
/// Implementors evaluate `ℓ(exp φ)` at log-parameters `φ`. The argmin
/// back-ends minimize `-ℓ` through [`ArgMinAdapter`]; the Metropolis–Hastings
/// chains use `ℓ` directly as the log target.
///
/// Required:
/// - `dim`: number of parameters.
/// - `value`: `ℓ(exp φ)`, including any prior.
/// - `check`: reject an unusable starting point before a run.
///
/// Optional:
/// - `grad`: analytic `∇_φ ℓ`. The default reports
///   [`EstimationError::GradientNotImplemented`] and callers fall back to
///   finite differences.
///
/// [`ArgMinAdapter`]: crate::estimation::adapter::ArgMinAdapter
pub trait LogObjective: Sync {
    fn dim(&self) -> usize;

    fn value(&self, log_theta: &Theta) -> EstimResult<f64>;

    fn check(&self, log_theta: &Theta) -> EstimResult<()>;

    fn grad(&self, _log_theta: &Theta) -> EstimResult<Grad> {
        Err(EstimationError::GradientNotImplemented)
    }
}

/// Termination report of one argmin run.
///
/// - `converged`: argmin reported a status other than `NotTerminated`.
/// - `status`: that status as text.
/// - `fn_evals`: argmin's counters (`cost_count`, `gradient_count`, …).
/// - `grad_norm`: norm of the last gradient, when the solver kept one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverReport {
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl SolverReport {
    pub fn new(
        termination: TerminationStatus, iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> Self {
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            other => (true, format!("{other:?}")),
        };
        let grad_norm = grad.map(|g| g.l2_norm());
        Self { converged, status, iterations: iterations as usize, fn_evals, grad_norm }
    }
}

/// History of one Metropolis–Hastings chain.
///
/// `samples` holds one log-parameter row per retained iteration;
/// `log_targets[i]` and `accepted[i]` belong to row `i`. `best_point` is in
/// log-space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainResult {
    pub chain: usize,
    pub samples: Array2<f64>,
    pub log_targets: Vec<f64>,
    pub accepted: Vec<bool>,
    pub acceptance_rate: f64,
    pub best_point: Theta,
    pub best_value: f64,
}

/// A chain that failed, isolated from the others.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainFailure {
    pub chain: usize,
    pub message: String,
}

/// All chain histories plus the index (into `chains`) of the selected one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiChainReport {
    pub chains: Vec<ChainResult>,
    pub failures: Vec<ChainFailure>,
    pub selected: usize,
}

/// Back-end specific diagnostics attached to an [`EstimationOutcome`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Diagnostics {
    Simplex(SolverReport),
    Gradient(SolverReport),
    /// `lower`/`upper` bound the search box in log-space.
    ParticleSwarm { report: SolverReport, lower: Theta, upper: Theta, kept_initial: bool },
    MetropolisHastings(MultiChainReport),
}

/// Result of [`estimate`](crate::estimation::session::estimate).
///
/// - `point`: estimated raw parameters `θ̂ = exp(φ̂)`.
/// - `log_point`: `φ̂`.
/// - `value`: `ℓ(θ̂)` (the maximized objective, not the cost).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimationOutcome {
    pub point: Theta,
    pub log_point: Theta,
    pub value: f64,
    pub diagnostics: Diagnostics,
}

impl EstimationOutcome {
    /// Build a validated outcome from a log-space point.
    ///
    /// # Errors
    /// - [`EstimationError::MissingPointEstimate`] /
    ///   [`EstimationError::InvalidPointEstimate`] for a bad point.
    /// - [`EstimationError::NonFiniteCost`] for a non-finite value.
    pub fn new(
        log_point: Option<Theta>, value: f64, diagnostics: Diagnostics,
    ) -> EstimResult<Self> {
        let log_point = validate_point(log_point)?;
        validate_value(value)?;
        let point = validate_point(Some(log_point.mapv(f64::exp)))?;
        Ok(Self { point, log_point, value, diagnostics })
    }
}
