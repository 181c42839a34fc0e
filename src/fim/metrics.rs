//! Experiment-level FIM: aggregation, covariance and scalar summaries.
//!
//! Purpose
//! -------
//! Combine a library of per-time single-cell FIMs with a cell-count
//! allocation into the total FIM of a candidate experiment, and derive the
//! MLE covariance estimate and scalar information metrics from it.
//!
//! Key behaviors
//! -------------
//! - [`total_fim`]: `F = Σ_t N_t · F_t`.
//! - [`evaluate_experiment`]: total FIM plus [`CovarianceEstimate`] and,
//!   on request, [`FimMetrics`].
//! - Covariance is `F⁻¹` built from the symmetric eigendecomposition
//!   `F = Q Λ Qᵀ`. If the numerical rank is below the parameter count the
//!   inverse is skipped and [`CovarianceEstimate::Undefined`] carries the
//!   observed rank.
//!
//! Invariants & assumptions
//! ------------------------
//! - Per-time FIMs are square, of a common dimension, and finite
//!   ([`validate_library`]). Symmetry is assumed, not enforced.
//! - Eigenvalues with `|λ| ≤ max|λ| · n · ε` count as zero: they lower the
//!   rank and are reported as exactly `0.0` in the metrics, so determinant
//!   and minimum eigenvalue of a rank-deficient FIM are `0.0`, never NaN.
//!
//! Conventions
//! -----------
//! - Linear algebra goes through `nalgebra::DMatrix`; results are copied
//!   back to `ndarray`.
use nalgebra::DMatrix;
use ndarray::Array2;
use serde::Serialize;

use crate::fim::errors::{FimError, FimResult};

/// MLE covariance estimate derived from a total FIM.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CovarianceEstimate {
    Defined(Array2<f64>),
    /// The total FIM has rank `rank < dim`; no inverse exists.
    Undefined { rank: usize, dim: usize },
}

impl CovarianceEstimate {
    pub fn is_defined(&self) -> bool {
        matches!(self, CovarianceEstimate::Defined(_))
    }

    pub fn matrix(&self) -> Option<&Array2<f64>> {
        match self {
            CovarianceEstimate::Defined(m) => Some(m),
            CovarianceEstimate::Undefined { .. } => None,
        }
    }
}

/// Scalar summaries of a total FIM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FimMetrics {
    pub determinant: f64,
    pub trace: f64,
    /// Zero for a `0 × 0` matrix.
    pub min_eigenvalue: f64,
}

/// Total FIM of an allocation and everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentEvaluation {
    pub total: Array2<f64>,
    pub covariance: CovarianceEstimate,
    pub metrics: Option<FimMetrics>,
}

/// Symmetric eigendecomposition with small eigenvalues snapped to zero.
#[derive(Debug, Clone)]
pub struct FimSpectrum {
    pub eigenvalues: Vec<f64>,
    pub eigenvectors: DMatrix<f64>,
    pub rank: usize,
}

impl FimSpectrum {
    /// Decompose a square FIM. A `0 × 0` matrix gives an empty spectrum.
    pub fn new(fim: &Array2<f64>) -> Self {
        let n = fim.nrows();
        if n == 0 {
            return Self { eigenvalues: Vec::new(), eigenvectors: DMatrix::zeros(0, 0), rank: 0 };
        }
        let eigen = to_dmatrix(fim).symmetric_eigen();
        let scale = eigen.eigenvalues.iter().fold(0.0_f64, |m, l| m.max(l.abs()));
        let tol = scale * n as f64 * f64::EPSILON;
        let eigenvalues: Vec<f64> =
            eigen.eigenvalues.iter().map(|&l| if l.abs() <= tol { 0.0 } else { l }).collect();
        let rank = eigenvalues.iter().filter(|&&l| l != 0.0).count();
        Self { eigenvalues, eigenvectors: eigen.eigenvectors, rank }
    }

    pub fn dim(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_full_rank(&self) -> bool {
        self.rank == self.dim()
    }

    pub fn determinant(&self) -> f64 {
        self.eigenvalues.iter().product()
    }

    /// Smallest eigenvalue, or `None` for an empty spectrum.
    pub fn min_eigenvalue(&self) -> Option<f64> {
        self.eigenvalues.iter().copied().reduce(f64::min)
    }

    /// `Q Λ⁻¹ Qᵀ`, or `None` when rank deficient.
    pub fn inverse(&self) -> Option<Array2<f64>> {
        if !self.is_full_rank() {
            return None;
        }
        let n = self.dim();
        let q = &self.eigenvectors;
        Some(Array2::from_shape_fn((n, n), |(i, j)| {
            (0..n).map(|k| q[(i, k)] * q[(j, k)] / self.eigenvalues[k]).sum()
        }))
    }
}

/// Check a FIM library and return its parameter dimension.
///
/// # Errors
/// [`FimError::EmptyLibrary`], [`FimError::EmptyMatrix`],
/// [`FimError::NotSquare`], [`FimError::DimensionMismatch`],
/// [`FimError::NonFinite`].
pub fn validate_library(fims: &[Array2<f64>]) -> FimResult<usize> {
    let first = fims.first().ok_or(FimError::EmptyLibrary)?;
    let dim = first.nrows();
    if dim == 0 {
        return Err(FimError::EmptyMatrix);
    }
    for (index, f) in fims.iter().enumerate() {
        if f.nrows() != f.ncols() {
            return Err(FimError::NotSquare { index, rows: f.nrows(), cols: f.ncols() });
        }
        if f.nrows() != dim {
            return Err(FimError::DimensionMismatch { index, expected: dim, found: f.nrows() });
        }
        if f.iter().any(|v| !v.is_finite()) {
            return Err(FimError::NonFinite { index });
        }
    }
    Ok(dim)
}

/// `Σ_t counts[t] · fims[t]`.
///
/// # Errors
/// [`FimError::CountLengthMismatch`] plus anything from
/// [`validate_library`].
pub fn total_fim(fims: &[Array2<f64>], counts: &[u64]) -> FimResult<Array2<f64>> {
    let dim = validate_library(fims)?;
    if counts.len() != fims.len() {
        return Err(FimError::CountLengthMismatch { fims: fims.len(), counts: counts.len() });
    }
    Ok(weighted_sum(fims, counts, dim))
}

/// Summaries of a total FIM.
pub fn fim_metrics(total: &Array2<f64>) -> FimMetrics {
    metrics_from(total, &FimSpectrum::new(total))
}

/// Evaluate an allocation against a FIM library.
///
/// A rank-deficient total FIM yields [`CovarianceEstimate::Undefined`]
/// and a `warn` event; it is not an error.
///
/// # Errors
/// As [`total_fim`].
pub fn evaluate_experiment(
    fims: &[Array2<f64>], counts: &[u64], with_metrics: bool,
) -> FimResult<ExperimentEvaluation> {
    let total = total_fim(fims, counts)?;
    let spectrum = FimSpectrum::new(&total);
    let covariance = match spectrum.inverse() {
        Some(inv) => CovarianceEstimate::Defined(inv),
        None => {
            tracing::warn!(
                rank = spectrum.rank,
                dim = spectrum.dim(),
                "total FIM is rank deficient; covariance undefined"
            );
            CovarianceEstimate::Undefined { rank: spectrum.rank, dim: spectrum.dim() }
        }
    };
    let metrics = with_metrics.then(|| metrics_from(&total, &spectrum));
    Ok(ExperimentEvaluation { total, covariance, metrics })
}

// ---- Helper methods ----

pub(crate) fn weighted_sum(fims: &[Array2<f64>], counts: &[u64], dim: usize) -> Array2<f64> {
    let mut total = Array2::<f64>::zeros((dim, dim));
    for (f, &n) in fims.iter().zip(counts.iter()) {
        if n > 0 {
            total.scaled_add(n as f64, f);
        }
    }
    total
}

fn metrics_from(total: &Array2<f64>, spectrum: &FimSpectrum) -> FimMetrics {
    FimMetrics {
        determinant: spectrum.determinant(),
        trace: total.diag().sum(),
        min_eigenvalue: spectrum.min_eigenvalue().unwrap_or(0.0),
    }
}

/// Copy an `ndarray` matrix into a column-major `DMatrix`.
pub(crate) fn to_dmatrix(m: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[[i, j]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Weighted aggregation and library validation.
    // - Covariance inversion for full-rank FIMs, `Undefined` otherwise.
    // - Metrics monotonicity when a single count grows.
    // -------------------------------------------------------------------------

    fn library() -> Vec<Array2<f64>> {
        vec![
            array![[1.0, 0.0], [0.0, 1.0]],
            array![[2.0, 0.0], [0.0, 0.5]],
            array![[0.5, 0.2], [0.2, 2.0]],
        ]
    }

    #[test]
    // Purpose
    // -------
    // The covariance of a full-rank total FIM is its inverse.
    //
    // Given
    // -----
    // - Counts [1, 2, 0].
    //
    // Expect
    // ------
    // - Total = diag(5, 2); covariance = diag(0.2, 0.5); metrics
    //   det 10, trace 7, min eigenvalue 2.
    fn full_rank_total_has_inverse_covariance() {
        // Arrange
        let fims = library();

        // Act
        let eval = evaluate_experiment(&fims, &[1, 2, 0], true).expect("valid library");

        // Assert
        assert_eq!(eval.total, array![[5.0, 0.0], [0.0, 2.0]]);
        let cov = eval.covariance.matrix().expect("full rank");
        assert_relative_eq!(cov[[0, 0]], 0.2, epsilon = 1e-12);
        assert_relative_eq!(cov[[1, 1]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(cov[[0, 1]], 0.0, epsilon = 1e-12);
        let m = eval.metrics.expect("requested");
        assert_relative_eq!(m.determinant, 10.0, epsilon = 1e-10);
        assert_relative_eq!(m.trace, 7.0, epsilon = 1e-12);
        assert_relative_eq!(m.min_eigenvalue, 2.0, epsilon = 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // Rank-deficient totals report `Undefined` with the observed rank and
    // finite metrics.
    //
    // Given
    // -----
    // - A single FIM diag(3, 0) with count 4.
    //
    // Expect
    // ------
    // - `Undefined { rank: 1, dim: 2 }`; determinant and min eigenvalue 0.
    fn rank_deficient_total_is_undefined() {
        // Arrange
        let fims = vec![array![[3.0, 0.0], [0.0, 0.0]]];

        // Act
        let eval = evaluate_experiment(&fims, &[4], true).expect("valid library");

        // Assert
        assert_eq!(eval.covariance, CovarianceEstimate::Undefined { rank: 1, dim: 2 });
        let m = eval.metrics.expect("requested");
        assert_eq!(m.determinant, 0.0);
        assert_eq!(m.min_eigenvalue, 0.0);
        assert_eq!(m.trace, 12.0);
    }

    #[test]
    // Purpose
    // -------
    // Incrementing a single count never decreases any metric.
    //
    // Given
    // -----
    // - Base counts [1, 1, 1]; each index incremented in turn.
    //
    // Expect
    // ------
    // - Trace, determinant and minimum eigenvalue are non-decreasing.
    fn metrics_are_monotone_in_each_count() {
        // Arrange
        let fims = library();
        let base = fim_metrics(&total_fim(&fims, &[1, 1, 1]).expect("valid"));

        for i in 0..3 {
            // Act
            let mut counts = [1u64, 1, 1];
            counts[i] += 1;
            let bumped = fim_metrics(&total_fim(&fims, &counts).expect("valid"));

            // Assert
            assert!(bumped.trace >= base.trace);
            assert!(bumped.determinant >= base.determinant);
            assert!(bumped.min_eigenvalue >= base.min_eigenvalue - 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Malformed libraries and allocations are rejected.
    //
    // Given
    // -----
    // - An empty library, a library of 0 × 0 FIMs, mixed dimensions, a short
    //   count vector.
    //
    // Expect
    // ------
    // - `EmptyLibrary`, `EmptyMatrix`, `DimensionMismatch`,
    //   `CountLengthMismatch`.
    fn rejects_malformed_inputs() {
        // Arrange
        let mixed = vec![Array2::<f64>::eye(2), Array2::<f64>::eye(3)];

        // Act / Assert
        assert_eq!(validate_library(&[]), Err(FimError::EmptyLibrary));
        assert_eq!(validate_library(&[Array2::<f64>::zeros((0, 0))]), Err(FimError::EmptyMatrix));
        assert_eq!(
            validate_library(&mixed),
            Err(FimError::DimensionMismatch { index: 1, expected: 2, found: 3 })
        );
        assert_eq!(
            total_fim(&library(), &[1, 2]),
            Err(FimError::CountLengthMismatch { fims: 3, counts: 2 })
        );
    }
    #[test]
    // Purpose
    // -------
    // An empty matrix has an empty spectrum with no smallest eigenvalue.
    //
    // Given
    // -----
    // - A 0 × 0 matrix and diag(3, 1).
    //
    // Expect
    // ------
    // - `None` for the empty spectrum, `Some(1)` for diag(3, 1).
    fn min_eigenvalue_is_none_for_empty_spectrum() {
        // Act
        let empty = FimSpectrum::new(&Array2::<f64>::zeros((0, 0)));
        let diag = FimSpectrum::new(&array![[3.0, 0.0], [0.0, 1.0]]);

        // Assert
        assert_eq!(empty.dim(), 0);
        assert_eq!(empty.min_eigenvalue(), None);
        assert_relative_eq!(diag.min_eigenvalue().expect("non-empty"), 1.0, epsilon = 1e-12);
    }
}
