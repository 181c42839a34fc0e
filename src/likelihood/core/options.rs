//! Likelihood options — numerical policy for scoring model output.
//!
//! Purpose
//! -------
//! Collect the knobs that decide how model tensors are turned into a
//! log-likelihood: the probability floor applied before logarithms, the
//! truncation policy used when model output extends beyond the observed
//! data window, and the FSP tolerance forwarded to the solver.
//!
//! Conventions
//! -----------
//! - `fsp_tolerance = None` means "off": the solver must not adapt its
//!   projection against an error bound. The gradient back-end relies on this
//!   so that sensitivities are computed on a stable state space.
//! - Options are plain validated data; they never panic and never log.
use serde::{Deserialize, Serialize};

use crate::likelihood::errors::{LikResult, LikelihoodError};

/// Floor applied to every aligned probability cell before taking logs.
pub const PROBABILITY_FLOOR: f64 = 1e-10;

/// Default FSP error tolerance requested from the solver.
pub const DEFAULT_FSP_TOLERANCE: f64 = 1e-4;

/// What to do with model probability mass outside the observed data window.
///
/// - `Discard`: drop it (default). The aligned tensor no longer sums to one.
/// - `Renormalize`: rescale the kept mass to one; sensitivities follow the
///   quotient rule so gradients stay exact for the renormalized model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TruncationPolicy {
    #[default]
    Discard,
    Renormalize,
}

/// Likelihood-evaluation configuration.
///
/// Default:
/// - `probability_floor`: [`PROBABILITY_FLOOR`] (1e-10)
/// - `truncation`: [`TruncationPolicy::Discard`]
/// - `fsp_tolerance`: `Some(DEFAULT_FSP_TOLERANCE)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodOptions {
    pub probability_floor: f64,
    pub truncation: TruncationPolicy,
    pub fsp_tolerance: Option<f64>,
}

impl LikelihoodOptions {
    /// # Errors
    /// - [`LikelihoodError::InvalidFloor`] unless `0 < floor < 1` and finite.
    /// - [`LikelihoodError::InvalidFspTolerance`] if a tolerance is given and
    ///   is not finite and strictly positive.
    pub fn new(
        probability_floor: f64, truncation: TruncationPolicy, fsp_tolerance: Option<f64>,
    ) -> LikResult<Self> {
        if !probability_floor.is_finite() {
            return Err(LikelihoodError::InvalidFloor {
                value: probability_floor,
                reason: "Floor must be finite.",
            });
        }
        if probability_floor <= 0.0 || probability_floor >= 1.0 {
            return Err(LikelihoodError::InvalidFloor {
                value: probability_floor,
                reason: "Floor must lie strictly between 0 and 1.",
            });
        }
        if let Some(tol) = fsp_tolerance {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(LikelihoodError::InvalidFspTolerance {
                    value: tol,
                    reason: "Tolerance must be finite and positive.",
                });
            }
        }
        Ok(Self { probability_floor, truncation, fsp_tolerance })
    }

    /// Copy of these options with the FSP tolerance switched off.
    pub fn without_fsp_tolerance(self) -> Self {
        Self { fsp_tolerance: None, ..self }
    }
}

impl Default for LikelihoodOptions {
    fn default() -> Self {
        Self {
            probability_floor: PROBABILITY_FLOOR,
            truncation: TruncationPolicy::Discard,
            fsp_tolerance: Some(DEFAULT_FSP_TOLERANCE),
        }
    }
}
