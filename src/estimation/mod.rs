//! estimation — fitting model parameters to single-cell data.
//!
//! Purpose
//! -------
//! Wrap the likelihood engine as a log-parameterized objective and maximize
//! or sample it with one of four back-ends behind a single entry point.
//!
//! Key behaviors
//! -------------
//! - [`LogObjective`] is the objective interface: `ℓ(exp φ)` at
//!   log-parameters `φ`, with an optional analytic gradient.
//!   [`LikelihoodObjective`] implements it over a [`LikelihoodEngine`].
//! - [`ArgMinAdapter`] turns the maximization into argmin's minimization of
//!   `c(φ) = -ℓ(exp φ)`, with a finite-difference gradient fallback.
//! - [`Backend`] selects simplex (Nelder–Mead), gradient (L-BFGS), particle
//!   swarm, or multi-chain Metropolis–Hastings, each with its own
//!   configuration; [`estimate`] dispatches on it.
//! - [`FitSession`] freezes the state space from one initial solve and
//!   reuses it for every evaluation of every back-end.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameters are strictly positive; back-ends only ever see `φ = ln θ`.
//! - Back-end failures are propagated without retry. Metropolis–Hastings
//!   isolates a failing chain from the others.
//! - The gradient back-end scores with the FSP tolerance switched off.
//!
//! Conventions
//! -----------
//! - Outcomes report `ℓ`, not the cost, together with both `θ̂` and `φ̂` and
//!   back-end specific [`Diagnostics`].
//! - [`FitOptions`] holds every setting with documented defaults; changes
//!   go through [`FitOptions::with_overrides`].
//!
//! Downstream usage
//! ----------------
//! - Build a [`LikelihoodEngine`] and a data tensor, open a [`FitSession`]
//!   with an initial guess, then call [`FitSession::fit`] per back-end.
//!
//! Testing notes
//! -------------
//! - Back-ends are unit-tested on closed-form objectives; `tests/` fits the
//!   birth–death reference model end to end.
//!
//! [`LikelihoodEngine`]: crate::likelihood::engine::LikelihoodEngine

pub mod adapter;
pub mod backends;
pub mod errors;
pub mod objective;
pub mod options;
pub mod session;
pub mod traits;
pub mod types;
pub mod validation;

pub use self::adapter::ArgMinAdapter;
pub use self::errors::{EstimResult, EstimationError};
pub use self::objective::LikelihoodObjective;
pub use self::options::{
    FitOption, FitOptions, LbfgsOptions, LineSearcher, MetropolisConfig, SimplexConfig,
    SwarmConfig, Tolerances,
};
pub use self::session::{Backend, BackendKind, FitSession, estimate};
pub use self::traits::{
    ChainFailure, ChainResult, Diagnostics, EstimationOutcome, LogObjective, MultiChainReport,
    SolverReport,
};
pub use self::types::{Cost, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::{
        Backend, BackendKind, Diagnostics, EstimResult, EstimationError, EstimationOutcome,
        FitOption, FitOptions, FitSession, LikelihoodObjective, LogObjective, estimate,
    };
}
