//! Simplex back-end: derivative-free Nelder–Mead on the negative
//! log-likelihood.
use argmin::core::{Executor, State};

use crate::estimation::{
    adapter::ArgMinAdapter,
    errors::EstimResult,
    options::SimplexConfig,
    traits::{Diagnostics, EstimationOutcome, LogObjective, SolverReport},
    types::{Simplex, Theta},
};

/// Starting simplex: `phi0` plus one vertex per axis offset by `step`.
pub fn initial_simplex(phi0: &Theta, step: f64) -> Vec<Theta> {
    let mut vertices = Vec::with_capacity(phi0.len() + 1);
    vertices.push(phi0.clone());
    for i in 0..phi0.len() {
        let mut vertex = phi0.clone();
        vertex[i] += step;
        vertices.push(vertex);
    }
    vertices
}

/// Maximize `f` from `phi0` with Nelder–Mead.
///
/// # Errors
/// [`LogObjective::check`] failures, argmin configuration or runtime
/// errors, and outcome validation errors.
pub fn maximize_simplex<F: LogObjective>(
    f: &F, phi0: Theta, cfg: &SimplexConfig,
) -> EstimResult<EstimationOutcome> {
    f.check(&phi0)?;
    let solver: Simplex =
        Simplex::new(initial_simplex(&phi0, cfg.initial_step)).with_sd_tolerance(cfg.sd_tolerance)?;
    let max_iter = cfg.max_iter as u64;
    #[allow(unused_mut)]
    let mut optimizer =
        Executor::new(ArgMinAdapter::new(f), solver).configure(|state| state.max_iters(max_iter));
    #[cfg(feature = "obs_slog")]
    if cfg.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }

    let mut result = optimizer.run()?.state().clone();
    let report = SolverReport::new(
        result.get_termination_status().clone(),
        result.get_iter(),
        result.get_func_counts().clone(),
        None,
    );
    let value = -result.get_best_cost();
    EstimationOutcome::new(result.take_best_param(), value, Diagnostics::Simplex(report))
}
