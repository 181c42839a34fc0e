//! Gradient back-end: L-BFGS with More–Thuente or Hager–Zhang line search.
//!
//! Builders apply the configured memory and tolerances only; the starting
//! point and iteration cap are applied by [`run_lbfgs`] on the executor.
use argmin::core::{Executor, State};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::solver::quasinewton::LBFGS;
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

use crate::estimation::{
    adapter::ArgMinAdapter,
    errors::EstimResult,
    options::{LbfgsOptions, LineSearcher},
    traits::{Diagnostics, EstimationOutcome, LogObjective, SolverReport},
    types::{
        Cost, GradientState, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente, MoreThuenteLS,
        Theta,
    },
};

/// L-BFGS with Hager–Zhang line search and the configured tolerances.
///
/// # Errors
/// Tolerances rejected by argmin, converted through `From<argmin::core::Error>`.
pub fn build_optimizer_hager_zhang(opts: &LbfgsOptions) -> EstimResult<LbfgsHagerZhang> {
    let lbfgs = LbfgsHagerZhang::new(HagerZhangLS::new(), opts.memory());
    configure_lbfgs(lbfgs, opts)
}

/// L-BFGS with More–Thuente line search and the configured tolerances.
///
/// # Errors
/// As [`build_optimizer_hager_zhang`].
pub fn build_optimizer_more_thuente(opts: &LbfgsOptions) -> EstimResult<LbfgsMoreThuente> {
    let lbfgs = LbfgsMoreThuente::new(MoreThuenteLS::new(), opts.memory());
    configure_lbfgs(lbfgs, opts)
}

/// Apply the optional gradient and cost-change tolerances to `solver`.
/// Unset tolerances keep argmin's defaults.
///
/// # Errors
/// As [`build_optimizer_hager_zhang`].
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &LbfgsOptions,
) -> EstimResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

/// Run an L-BFGS solver from `phi0` and report the best point found.
///
/// With the `obs_slog` feature and `opts.verbose`, a terminal observer is
/// attached and `ℓ(φ₀)` is printed before the first iteration.
///
/// # Errors
/// argmin runtime errors (including objective failures raised inside the
/// run) and outcome validation errors.
pub fn run_lbfgs<'a, F, S>(
    phi0: Theta, opts: &LbfgsOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> EstimResult<EstimationOutcome>
where
    F: LogObjective,
    S: argmin::core::Solver<ArgMinAdapter<'a, F>, GradientState> + Send + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&phi0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver).configure(|state| state.param(phi0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let report = SolverReport::new(
        result.get_termination_status().clone(),
        result.get_iter(),
        result.get_func_counts().clone(),
        result.take_gradient(),
    );
    let value = -result.get_best_cost();
    EstimationOutcome::new(result.take_best_param(), value, Diagnostics::Gradient(report))
}

/// Maximize `f` from `phi0` with the configured line search.
///
/// # Errors
/// [`LogObjective::check`] failures, then as [`run_lbfgs`].
pub fn maximize_lbfgs<F: LogObjective>(
    f: &F, phi0: Theta, opts: &LbfgsOptions,
) -> EstimResult<EstimationOutcome> {
    f.check(&phi0)?;
    let problem = ArgMinAdapter::new(f);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            run_lbfgs(phi0, opts, problem, build_optimizer_more_thuente(opts)?)
        }
        LineSearcher::HagerZhang => {
            run_lbfgs(phi0, opts, problem, build_optimizer_hager_zhang(opts)?)
        }
    }
}

// ---- Helper methods ----

#[cfg(feature = "obs_slog")]
fn log_initial_state<F: LogObjective>(
    phi0: &Theta, problem: &ArgMinAdapter<'_, F>,
) -> EstimResult<()> {
    let ll0 = -problem.cost(phi0)?;
    let g0n = problem.gradient(phi0).ok().map(|g| g.l2_norm());
    eprintln!(
        "init: ell(phi0) = {:.6}{}",
        ll0,
        g0n.map(|n| format!(", ||grad|| = {:.6}", n)).unwrap_or_default()
    );
    Ok(())
}
