//! likelihood — scoring single-cell count data against CME model output.
//!
//! Purpose
//! -------
//! Provide the data model (count tensors, species links), the tensor
//! adapter that reconciles heterogeneous model output with those tensors,
//! and the likelihood engine that turns aligned tensors into a
//! log-likelihood and its parameter gradient.
//!
//! Key behaviors
//! -------------
//! - Load a measurement table into a sparse [`DataTensor`], detecting the
//!   unique time column and binning identical times.
//! - Marginalize model distributions and sensitivities onto the observed
//!   species via a [`SpeciesLink`] and the [`Reducible`] capability.
//! - Zero-pad or truncate reduced tensors to the data extent, apply the
//!   configured [`TruncationPolicy`], floor at [`PROBABILITY_FLOOR`].
//! - Evaluate `ℓ(θ)` and `∇ℓ(θ)` through [`LikelihoodEngine`], with an
//!   optional additive [`LogPrior`] and [`DistortionOperator`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Counts are non-negative integers; times are finite and distinct after
//!   binning.
//! - Probabilities entering `ln` and gradient denominators are floored, so
//!   `ℓ` is finite for any non-negative count tensor.
//! - Axis-count mismatches between model and data are configuration errors
//!   and abort the evaluation.
//!
//! Conventions
//! -----------
//! - Indices are 0-based: fit times index the data tensor's sorted time
//!   bins; parameters follow the solver's order.
//! - Observed axes keep the model's species order.
//! - Errors are reported via [`LikResult`].
//!
//! Downstream usage
//! ----------------
//! - `fim` reuses [`Reducible`] and [`SpeciesLink`] to reduce sensitivity
//!   output before computing single-cell FIMs.
//! - `estimation` wraps [`LikelihoodEngine`] as a log-space objective.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each submodule: reductions, alignment,
//!   flooring, data loading, priors, and engine-level additivity, gradient
//!   consistency and stale state-space recovery.
//! - End-to-end likelihood scenarios live in `tests/`.
//!
//! [`DistortionOperator`]: crate::solver::DistortionOperator

pub mod core;
pub mod engine;
pub mod errors;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    align::{AlignedSlice, AlignmentReport, align_slice, align_to_extent, marginalize},
    data::{DataTable, DataTensor, TimeSlice, find_time_column},
    options::{DEFAULT_FSP_TOLERANCE, LikelihoodOptions, PROBABILITY_FLOOR, TruncationPolicy},
    prior::{LogNormalPrior, LogPrior},
    species_link::SpeciesLink,
    tensor::{DenseTensor, Reducible, StateDistribution},
};

pub use self::engine::{LikelihoodEngine, LikelihoodEvaluation, ModelOutput, nearest_time_index};

pub use self::errors::{LikResult, LikelihoodError};

// ---- Optional convenience prelude for downstream crates -------------------
//
//     use cme_inference::likelihood::prelude::*;

pub mod prelude {
    pub use super::{
        DataTable, DataTensor, DenseTensor, LikResult, LikelihoodEngine, LikelihoodError,
        LikelihoodEvaluation, LikelihoodOptions, LogNormalPrior, LogPrior, Reducible, SpeciesLink,
        StateDistribution, TruncationPolicy,
    };
}
