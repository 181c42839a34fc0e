//! fim — Fisher information for single-cell experiments.
//!
//! Purpose
//! -------
//! Build per-time single-cell FIMs from sensitivity output and combine them
//! into the total FIM of a candidate experiment, together with the MLE
//! covariance estimate and scalar metrics used by experiment design.
//!
//! Key behaviors
//! -------------
//! - [`compute_fim`] reduces distributions and sensitivities over the
//!   unobserved species and delegates to a [`SingleCellFim`] calculator
//!   ([`DirectFim`] by default).
//! - [`evaluate_experiment`] weights each per-time FIM by its cell count,
//!   inverts the total when it has full rank, and reports determinant,
//!   trace and minimum eigenvalue on request.
//!
//! Invariants & assumptions
//! ------------------------
//! - All FIMs in a library share one parameter ordering and dimension.
//! - Rank deficiency is a result, not an error.
//!
//! Downstream usage
//! ----------------
//! - `design` evaluates its criteria on totals produced here.
//!
//! Testing notes
//! -------------
//! - Unit tests cover Poisson information for the birth–death model, the
//!   information loss under binomial distortion, inversion, rank
//!   deficiency and metric monotonicity.

pub mod aggregate;
pub mod errors;
pub mod metrics;

pub use self::aggregate::{DirectFim, SingleCellFim, compute_fim};
pub use self::errors::{FimError, FimResult};
pub use self::metrics::{
    CovarianceEstimate, ExperimentEvaluation, FimMetrics, FimSpectrum, evaluate_experiment,
    fim_metrics, total_fim, validate_library,
};

pub mod prelude {
    pub use super::{
        CovarianceEstimate, DirectFim, ExperimentEvaluation, FimError, FimMetrics, FimResult,
        SingleCellFim, compute_fim, evaluate_experiment, fim_metrics,
    };
}
