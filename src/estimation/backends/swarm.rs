//! Particle-swarm back-end on a log-space box around the initial guess.
//!
//! The box spans `φ₀ ± decades · ln 10` per parameter. The starting
//! population is `φ₀` itself plus Gaussian perturbations of it, clamped to
//! the box; argmin then explores the whole box from there. The initial
//! guess is still compared against the swarm's best at the end, so the
//! result never scores below `ℓ(φ₀)`. Objective failures at a particle count
//! as an infinitely bad cost instead of aborting the swarm.
use std::f64::consts::LN_10;

use argmin::core::{CostFunction, Error, Executor, State};
use argmin::solver::particleswarm::{Particle, ParticleSwarm};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::estimation::{
    adapter::ArgMinAdapter,
    errors::{EstimResult, EstimationError},
    options::SwarmConfig,
    traits::{Diagnostics, EstimationOutcome, LogObjective, SolverReport},
    types::{Cost, Theta},
};

/// Standard deviation, in log-space, of the starting perturbations.
pub const SEED_SPREAD: f64 = 0.5;

/// Lower and upper corners of the search box.
pub fn swarm_bounds(phi0: &Theta, decades: f64) -> (Theta, Theta) {
    let half_width = decades * LN_10;
    (phi0.mapv(|p| p - half_width), phi0.mapv(|p| p + half_width))
}

/// Cost adapter that maps objective failures to `+∞`.
struct PenalizedCost<'a, F: LogObjective> {
    inner: ArgMinAdapter<'a, F>,
}

impl<F: LogObjective> CostFunction for PenalizedCost<'_, F> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        match self.inner.cost(theta) {
            Ok(c) => Ok(c),
            Err(err) => {
                tracing::debug!(error = %err, "swarm particle scored as infeasible");
                Ok(f64::INFINITY)
            }
        }
    }
}

/// Starting population: `phi0` first, then `n - 1` perturbations of it.
///
/// Positions are clamped to `[lower, upper]`; velocities are drawn from the
/// same spread. The first particle has zero velocity.
fn seed_population<F: LogObjective>(
    cost: &PenalizedCost<'_, F>, phi0: &Theta, initial_cost: Cost, lower: &Theta,
    upper: &Theta, cfg: &SwarmConfig,
) -> EstimResult<Vec<Particle<Theta, Cost>>> {
    let spread = Normal::new(0.0, SEED_SPREAD.min(cfg.decades * LN_10)).map_err(|_| {
        EstimationError::InvalidSetting {
            name: "swarm_decades",
            value: cfg.decades,
            reason: "Perturbation spread must be finite and positive.",
        }
    })?;
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    let mut population = Vec::with_capacity(cfg.n_particles);
    population.push(Particle::new(phi0.clone(), initial_cost, Theta::zeros(phi0.len())));
    for _ in 1..cfg.n_particles {
        let mut position = phi0.mapv(|p| p + spread.sample(&mut rng));
        position.zip_mut_with(lower, |x, &lo| *x = x.max(lo));
        position.zip_mut_with(upper, |x, &hi| *x = x.min(hi));
        let velocity = phi0.mapv(|_| spread.sample(&mut rng));
        let c = cost.cost(&position)?;
        population.push(Particle::new(position, c, velocity));
    }
    Ok(population)
}

/// Maximize `f` with a particle swarm seeded around `phi0`.
///
/// # Errors
/// - [`LogObjective::check`] failures, or a failing objective at `phi0`.
/// - argmin runtime errors.
/// - [`EstimationError::MissingPointEstimate`] if the swarm reports no
///   particle.
pub fn maximize_swarm<F: LogObjective>(
    f: &F, phi0: Theta, cfg: &SwarmConfig,
) -> EstimResult<EstimationOutcome> {
    f.check(&phi0)?;
    let initial_cost = ArgMinAdapter::new(f).cost(&phi0)?;
    let (lower, upper) = swarm_bounds(&phi0, cfg.decades);
    let solver = ParticleSwarm::new((lower.clone(), upper.clone()), cfg.n_particles);
    let problem = PenalizedCost { inner: ArgMinAdapter::new(f) };
    let population = seed_population(&problem, &phi0, initial_cost, &lower, &upper, cfg)?;
    let max_iter = cfg.max_iter as u64;
    #[allow(unused_mut)]
    let mut optimizer = Executor::new(problem, solver)
        .configure(|state| state.population(population).max_iters(max_iter));
    #[cfg(feature = "obs_slog")]
    if cfg.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }

    let result = optimizer.run()?;
    let state = result.state();
    let best = state.get_best_param().ok_or(EstimationError::MissingPointEstimate)?;
    let report = SolverReport::new(
        state.get_termination_status().clone(),
        state.get_iter(),
        state.get_func_counts().clone(),
        None,
    );
    let kept_initial = best.cost >= initial_cost;
    let (point, cost) =
        if kept_initial { (phi0, initial_cost) } else { (best.position.clone(), best.cost) };
    let diagnostics = Diagnostics::ParticleSwarm { report, lower, upper, kept_initial };
    EstimationOutcome::new(Some(point), -cost, diagnostics)
}
