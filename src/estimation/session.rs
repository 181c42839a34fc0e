//! Back-end dispatch and fit sessions.
//!
//! [`estimate`] is the single entry point shared by every back-end: it
//! validates the raw initial guess, moves it to log-space and dispatches on
//! [`Backend`]. [`FitSession`] prepares what all back-ends share: the fit
//! times and a state space frozen from one initial solve.
use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    estimation::{
        backends::{maximize_lbfgs, maximize_simplex, maximize_swarm, sample_chains},
        errors::{EstimResult, EstimationError},
        objective::LikelihoodObjective,
        options::{FitOptions, LbfgsOptions, MetropolisConfig, SimplexConfig, SwarmConfig},
        traits::{EstimationOutcome, LogObjective},
        types::Theta,
        validation::validate_guess,
    },
    likelihood::{core::data::DataTensor, engine::LikelihoodEngine},
    solver::{DistributionSolver, state_space::StateSpace},
};

/// Back-end selector without configuration. Parses case-insensitively from
/// `simplex`/`nelder-mead`, `gradient`/`lbfgs`, `swarm`/`pso`, and
/// `mh`/`metropolis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    Simplex,
    Gradient,
    ParticleSwarm,
    MetropolisHastings,
}

impl FromStr for BackendKind {
    type Err = EstimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simplex" | "nelder-mead" | "neldermead" => Ok(BackendKind::Simplex),
            "gradient" | "lbfgs" => Ok(BackendKind::Gradient),
            "swarm" | "pso" | "particle_swarm" => Ok(BackendKind::ParticleSwarm),
            "mh" | "metropolis" | "metropolis_hastings" => Ok(BackendKind::MetropolisHastings),
            _ => Err(EstimationError::UnknownBackend(s.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Simplex => "simplex",
            BackendKind::Gradient => "gradient",
            BackendKind::ParticleSwarm => "swarm",
            BackendKind::MetropolisHastings => "metropolis",
        };
        f.write_str(name)
    }
}

/// Back-end with its configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Backend {
    Simplex(SimplexConfig),
    Gradient(LbfgsOptions),
    ParticleSwarm(SwarmConfig),
    MetropolisHastings(MetropolisConfig),
}

impl Backend {
    /// Derive the configuration of `kind` from merged fit options.
    ///
    /// # Errors
    /// The back-end configuration's validation errors.
    pub fn from_options(kind: BackendKind, opts: &FitOptions) -> EstimResult<Self> {
        Ok(match kind {
            BackendKind::Simplex => Backend::Simplex(SimplexConfig::from_fit(opts)?),
            BackendKind::Gradient => Backend::Gradient(LbfgsOptions::from_fit(opts)?),
            BackendKind::ParticleSwarm => Backend::ParticleSwarm(SwarmConfig::from_fit(opts)?),
            BackendKind::MetropolisHastings => {
                Backend::MetropolisHastings(MetropolisConfig::from_fit(opts)?)
            }
        })
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Simplex(_) => BackendKind::Simplex,
            Backend::Gradient(_) => BackendKind::Gradient,
            Backend::ParticleSwarm(_) => BackendKind::ParticleSwarm,
            Backend::MetropolisHastings(_) => BackendKind::MetropolisHastings,
        }
    }
}

/// Estimate parameters of `objective` starting from a raw initial guess.
///
/// The guess is checked against `objective.dim()`, mapped to `φ₀ = ln θ₀`
/// and handed to the selected back-end.
///
/// # Errors
/// - [`EstimationError::GuessLengthMismatch`],
///   [`EstimationError::InvalidGuess`] for a bad guess.
/// - Back-end errors, propagated without retry.
pub fn estimate<F: LogObjective>(
    objective: &F, initial_guess: &Theta, backend: &Backend,
) -> EstimResult<EstimationOutcome> {
    validate_guess(initial_guess, objective.dim())?;
    let phi0 = initial_guess.mapv(f64::ln);
    let outcome = match backend {
        Backend::Simplex(cfg) => maximize_simplex(objective, phi0, cfg),
        Backend::Gradient(opts) => maximize_lbfgs(objective, phi0, opts),
        Backend::ParticleSwarm(cfg) => maximize_swarm(objective, phi0, cfg),
        Backend::MetropolisHastings(cfg) => sample_chains(objective, &phi0, cfg),
    }?;
    tracing::info!(backend = %backend.kind(), value = outcome.value, "estimation finished");
    Ok(outcome)
}

/// Shared state of one fitting session.
///
/// Built once per data set and initial guess: it resolves the fit times and
/// freezes the state space returned by an initial solve, so every back-end
/// run scores the same projection.
pub struct FitSession<'a, S: DistributionSolver + Clone> {
    engine: LikelihoodEngine<S>,
    data: &'a DataTensor,
    fit_times: Vec<usize>,
    options: FitOptions,
    initial_guess: Theta,
    initial_log_likelihood: f64,
    state_space: Option<Arc<StateSpace>>,
}

impl<'a, S: DistributionSolver + Clone> FitSession<'a, S> {
    /// Validate the options and guess, then solve once at the guess.
    ///
    /// # Errors
    /// - Option validation errors.
    /// - [`EstimationError::GuessLengthMismatch`],
    ///   [`EstimationError::InvalidGuess`].
    /// - Likelihood errors from the initial solve (bad fit times, data that
    ///   does not match the species link, solver failures).
    pub fn new(
        engine: LikelihoodEngine<S>, data: &'a DataTensor, initial_guess: Theta,
        options: FitOptions,
    ) -> EstimResult<Self> {
        options.validate()?;
        validate_guess(&initial_guess, engine.n_parameters())?;
        let fit_times = options.fit_times.clone().unwrap_or_else(|| (0..data.n_times()).collect());
        let initial = engine.evaluate(&initial_guess, data, &fit_times, None, false)?;
        tracing::info!(
            states = initial.state_space.as_ref().map(|s| s.len()),
            fit_times = fit_times.len(),
            log_likelihood = initial.log_likelihood,
            "state space frozen"
        );
        Ok(Self {
            engine,
            data,
            fit_times,
            options,
            initial_guess,
            initial_log_likelihood: initial.log_likelihood,
            state_space: initial.state_space,
        })
    }

    pub fn engine(&self) -> &LikelihoodEngine<S> {
        &self.engine
    }

    pub fn fit_times(&self) -> &[usize] {
        &self.fit_times
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    pub fn initial_guess(&self) -> &Theta {
        &self.initial_guess
    }

    /// `ℓ` at the initial guess, on the frozen state space.
    pub fn initial_log_likelihood(&self) -> f64 {
        self.initial_log_likelihood
    }

    pub fn state_space(&self) -> Option<&Arc<StateSpace>> {
        self.state_space.as_ref()
    }

    /// Objective over this session's data, fit times and frozen space.
    pub fn objective(&self) -> LikelihoodObjective<'_, S> {
        LikelihoodObjective::new(&self.engine, self.data, &self.fit_times, self.state_space.clone())
    }

    /// Fit with `kind`, configured from this session's options.
    ///
    /// # Errors
    /// As [`Backend::from_options`] and [`FitSession::fit_with`].
    pub fn fit(&self, kind: BackendKind) -> EstimResult<EstimationOutcome> {
        self.fit_with(&Backend::from_options(kind, &self.options)?)
    }

    /// Fit with an explicitly configured back-end from the initial guess.
    ///
    /// The gradient back-end scores with the FSP tolerance switched off.
    ///
    /// # Errors
    /// As [`estimate`].
    pub fn fit_with(&self, backend: &Backend) -> EstimResult<EstimationOutcome> {
        match backend {
            Backend::Gradient(_) => {
                let options = self.engine.options().without_fsp_tolerance();
                let engine = self.engine.clone().with_options(options);
                let objective = LikelihoodObjective::new(
                    &engine,
                    self.data,
                    &self.fit_times,
                    self.state_space.clone(),
                );
                estimate(&objective, &self.initial_guess, backend)
            }
            _ => estimate(&self.objective(), &self.initial_guess, backend),
        }
    }
}
