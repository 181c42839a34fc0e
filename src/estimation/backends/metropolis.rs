//! Multi-chain random-walk Metropolis–Hastings in log-space.
//!
//! Purpose
//! -------
//! Sample `φ` with log target `ℓ(exp φ)` using Gaussian random-walk
//! proposals, running independent chains in parallel and returning every
//! chain's history.
//!
//! Key behaviors
//! -------------
//! - Chains run on the rayon pool. Each owns a `ChaCha8Rng` seeded with
//!   `seed + chain`, its current state and its buffers; the objective is
//!   shared read-only.
//! - Every chain starts at the initial guess. The first `burn_in` iterations
//!   are not recorded; the following `n_samples` are.
//! - A proposal with a non-finite target is rejected.
//! - A chain whose objective raises an error fails alone: the failure is
//!   logged and reported, and the other chains are kept.
//! - The point estimate is the best point of the chain whose best target
//!   value is highest (lowest chain index on ties).
//!
//! Invariants & assumptions
//! ------------------------
//! - Results are reproducible for a fixed seed and chain count, independent
//!   of thread scheduling.
//! - The target includes the objective's prior; sampling in `φ` adds no
//!   Jacobian term, so the implied prior on `φ` is the objective's own.
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

use crate::estimation::{
    errors::{EstimResult, EstimationError},
    options::MetropolisConfig,
    traits::{
        ChainFailure, ChainResult, Diagnostics, EstimationOutcome, LogObjective, MultiChainReport,
    },
    types::Theta,
    validation::validate_value,
};

/// Run one chain from `start`.
///
/// # Errors
/// - [`EstimationError::InvalidSetting`] for an unusable proposal width.
/// - [`EstimationError::NonFiniteCost`] if the start has a non-finite target.
/// - Any objective error raised during sampling.
pub fn run_chain<F: LogObjective>(
    f: &F, start: &Theta, cfg: &MetropolisConfig, chain: usize,
) -> EstimResult<ChainResult> {
    let normal = Normal::new(0.0, cfg.proposal_sd).map_err(|_| EstimationError::InvalidSetting {
        name: "proposal_sd",
        value: cfg.proposal_sd,
        reason: "Proposal width must be finite and positive.",
    })?;
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed.wrapping_add(chain as u64));
    let dim = start.len();

    let mut current = start.clone();
    let mut current_value = f.value(&current)?;
    validate_value(current_value)?;
    let mut best_point = current.clone();
    let mut best_value = current_value;

    let mut samples = Array2::<f64>::zeros((cfg.n_samples, dim));
    let mut log_targets = Vec::with_capacity(cfg.n_samples);
    let mut accepted = Vec::with_capacity(cfg.n_samples);

    for iter in 0..cfg.burn_in + cfg.n_samples {
        let step = Array1::from_iter((0..dim).map(|_| normal.sample(&mut rng)));
        let proposal = &current + &step;
        let proposed_value = f.value(&proposal)?;
        let log_u = rng.random::<f64>().ln();
        let accept = proposed_value.is_finite() && log_u < proposed_value - current_value;
        if accept {
            current = proposal;
            current_value = proposed_value;
            if current_value > best_value {
                best_value = current_value;
                best_point = current.clone();
            }
        }
        if let Some(row) = iter.checked_sub(cfg.burn_in) {
            samples.row_mut(row).assign(&current);
            log_targets.push(current_value);
            accepted.push(accept);
        }
    }

    let n_accepted = accepted.iter().filter(|&&a| a).count();
    let acceptance_rate = n_accepted as f64 / cfg.n_samples as f64;
    tracing::debug!(chain, acceptance_rate, best_value, "chain finished");
    Ok(ChainResult {
        chain,
        samples,
        log_targets,
        accepted,
        acceptance_rate,
        best_point,
        best_value,
    })
}

/// Run `cfg.n_chains` chains in parallel and select the best one.
///
/// # Errors
/// - [`EstimationError::AllChainsFailed`] if no chain completes.
/// - Outcome validation errors.
pub fn sample_chains<F: LogObjective>(
    f: &F, start: &Theta, cfg: &MetropolisConfig,
) -> EstimResult<EstimationOutcome> {
    let results: Vec<EstimResult<ChainResult>> =
        (0..cfg.n_chains).into_par_iter().map(|chain| run_chain(f, start, cfg, chain)).collect();

    let mut chains = Vec::with_capacity(cfg.n_chains);
    let mut failures = Vec::new();
    for (chain, result) in results.into_iter().enumerate() {
        match result {
            Ok(c) => chains.push(c),
            Err(err) => {
                tracing::warn!(chain, error = %err, "chain failed");
                failures.push(ChainFailure { chain, message: err.to_string() });
            }
        }
    }

    let selected = select_best_chain(&chains).ok_or_else(|| EstimationError::AllChainsFailed {
        n_chains: cfg.n_chains,
        first: failures.first().map(|f| f.message.clone()).unwrap_or_default(),
    })?;
    let best = &chains[selected];
    tracing::info!(
        chain = best.chain,
        best_value = best.best_value,
        acceptance_rate = best.acceptance_rate,
        failed = failures.len(),
        "chain selected"
    );
    let point = best.best_point.clone();
    let value = best.best_value;
    let report = MultiChainReport { chains, failures, selected };
    EstimationOutcome::new(Some(point), value, Diagnostics::MetropolisHastings(report))
}

// ---- Helper methods ----

/// Index of the chain with the highest best value; earliest on ties.
fn select_best_chain(chains: &[ChainResult]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, c) in chains.iter().enumerate() {
        if best.is_none_or(|(_, v)| c.best_value > v) {
            best = Some((i, c.best_value));
        }
    }
    best.map(|(i, _)| i)
}
