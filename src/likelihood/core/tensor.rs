//! Reducible probability and sensitivity tensors.
//!
//! Purpose
//! -------
//! Give probability distributions and parameter sensitivities one shared
//! capability, [`Reducible`], so the tensor adapter, the likelihood engine,
//! and the FIM aggregator can marginalize and densify them without caring
//! whether the solver produced a dense array or a sparse vector over an
//! enumerated state space.
//!
//! Key behaviors
//! -------------
//! - [`Reducible::sum_over_axes`] sums out a set of species axes and returns
//!   a [`DenseTensor`] over the remaining axes, in their original order.
//! - [`Reducible::as_dense`] materializes the full tensor, one axis per
//!   species, sized by the largest enumerated count plus one.
//! - [`DenseTensor`] wraps an `ndarray::ArrayD<f64>`.
//! - [`StateDistribution`] stores one value per enumerated state of a shared
//!   [`StateSpace`] and reduces by scattering directly into the reduced
//!   shape, never building the full dense tensor.
//!
//! Invariants & assumptions
//! ------------------------
//! - Reductions are linear, so applying them to a probability tensor and to
//!   its sensitivities commutes with differentiation.
//! - Axis sets may be unsorted and may contain duplicates; every axis must be
//!   `< ndim()`.
use std::sync::Arc;

use ndarray::{Array1, ArrayD, Axis, IxDyn};

use crate::{
    likelihood::errors::{LikResult, LikelihoodError},
    solver::state_space::StateSpace,
};

/// Marginalizable tensor over species axes.
pub trait Reducible {
    /// Number of species axes.
    fn ndim(&self) -> usize;

    /// Materialize the tensor as a dense array with one axis per species.
    fn as_dense(&self) -> ArrayD<f64>;

    /// Sum over `axes`, keeping the remaining axes in order.
    fn sum_over_axes(&self, axes: &[usize]) -> LikResult<DenseTensor> {
        sum_dense_axes(self.as_dense(), axes)
    }
}

/// Dense tensor produced by reductions, or supplied directly by a solver.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor {
    values: ArrayD<f64>,
}

impl DenseTensor {
    pub fn new(values: ArrayD<f64>) -> Self {
        Self { values }
    }

    pub fn array(&self) -> &ArrayD<f64> {
        &self.values
    }

    pub fn into_array(self) -> ArrayD<f64> {
        self.values
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }
}

impl From<ArrayD<f64>> for DenseTensor {
    fn from(values: ArrayD<f64>) -> Self {
        Self::new(values)
    }
}

impl Reducible for DenseTensor {
    fn ndim(&self) -> usize {
        self.values.ndim()
    }

    fn as_dense(&self) -> ArrayD<f64> {
        self.values.clone()
    }
}

/// Values attached to the states of a shared FSP state space.
///
/// Used both for probabilities `P(x)` and for sensitivities `∂P(x)/∂θ_j`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateDistribution {
    space: Arc<StateSpace>,
    values: Array1<f64>,
}

impl StateDistribution {
    /// # Errors
    /// [`LikelihoodError::ValueLengthMismatch`] if `values.len()` differs from
    /// the number of enumerated states.
    pub fn new(space: Arc<StateSpace>, values: Array1<f64>) -> LikResult<Self> {
        if values.len() != space.len() {
            return Err(LikelihoodError::ValueLengthMismatch {
                expected: space.len(),
                found: values.len(),
            });
        }
        Ok(Self { space, values })
    }

    pub fn state_space(&self) -> &Arc<StateSpace> {
        &self.space
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }
}

impl Reducible for StateDistribution {
    fn ndim(&self) -> usize {
        self.space.n_species()
    }

    fn as_dense(&self) -> ArrayD<f64> {
        let mut dense = ArrayD::<f64>::zeros(IxDyn(&self.space.extents()));
        for (state, &v) in self.space.states().iter().zip(self.values.iter()) {
            dense[IxDyn(state)] += v;
        }
        dense
    }

    fn sum_over_axes(&self, axes: &[usize]) -> LikResult<DenseTensor> {
        let ndim = self.ndim();
        let dropped = normalized_axes(axes, ndim)?;
        let kept: Vec<usize> = (0..ndim).filter(|a| !dropped.contains(a)).collect();
        let extents = self.space.extents();
        let reduced_shape: Vec<usize> = kept.iter().map(|&a| extents[a]).collect();
        let mut reduced = ArrayD::<f64>::zeros(IxDyn(&reduced_shape));
        let mut idx = vec![0usize; kept.len()];
        for (state, &v) in self.space.states().iter().zip(self.values.iter()) {
            for (slot, &a) in idx.iter_mut().zip(kept.iter()) {
                *slot = state[a];
            }
            reduced[IxDyn(&idx)] += v;
        }
        Ok(DenseTensor::new(reduced))
    }
}

/// Sum a dense array over `axes` (any order, duplicates ignored).
pub fn sum_dense_axes(mut values: ArrayD<f64>, axes: &[usize]) -> LikResult<DenseTensor> {
    let dropped = normalized_axes(axes, values.ndim())?;
    for &a in dropped.iter().rev() {
        values = values.sum_axis(Axis(a));
    }
    Ok(DenseTensor::new(values))
}

// ---- Helper methods ----

fn normalized_axes(axes: &[usize], ndim: usize) -> LikResult<Vec<usize>> {
    let mut sorted = axes.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if let Some(&axis) = sorted.iter().find(|&&a| a >= ndim) {
        return Err(LikelihoodError::AxisOutOfRange { axis, ndim });
    }
    Ok(sorted)
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
    // - Dense and state-indexed reductions agreeing on the same data.
    // - Axis validation and duplicate handling.
    //
    // They intentionally DO NOT cover:
    // - Padding/truncation against data extents (see `align`).
    // -------------------------------------------------------------------------

    fn two_species_distribution() -> StateDistribution {
        let space = Arc::new(StateSpace::from_bounds(&[1, 2]).expect("valid bounds"));
        // Row-major over (x0 ∈ 0..=1, x1 ∈ 0..=2).
        let values = array![0.10, 0.20, 0.05, 0.15, 0.30, 0.20];
        StateDistribution::new(space, values).expect("lengths agree")
    }

    #[test]
    // Purpose
    // -------
    // The sparse reduction of a `StateDistribution` matches the dense path.
    //
    // Given
    // -----
    // - A 2×3 distribution over two species.
    //
    // Expect
    // ------
    // - Summing out axis 0 yields the column sums; summing out axis 1 yields
    //   the row sums; both agree with reducing `as_dense()` directly.
    fn state_distribution_reduction_matches_dense_reduction() {
        // Arrange
        let dist = two_species_distribution();
        let dense = DenseTensor::new(dist.as_dense());

        // Act
        let over0 = dist.sum_over_axes(&[0]).expect("axis 0 valid");
        let over1 = dist.sum_over_axes(&[1]).expect("axis 1 valid");
        let dense0 = dense.sum_over_axes(&[0]).expect("axis 0 valid");

        // Assert
        assert_eq!(over0.shape(), &[3]);
        assert_relative_eq!(over0.array()[[0]], 0.25, epsilon = 1e-12);
        assert_relative_eq!(over0.array()[[1]], 0.50, epsilon = 1e-12);
        assert_relative_eq!(over0.array()[[2]], 0.25, epsilon = 1e-12);
        assert_eq!(over1.shape(), &[2]);
        assert_relative_eq!(over1.array()[[0]], 0.35, epsilon = 1e-12);
        assert_relative_eq!(over1.array()[[1]], 0.65, epsilon = 1e-12);
        assert_eq!(over0, dense0);
    }

    #[test]
    // Purpose
    // -------
    // Reducing over no axes is the identity; duplicates are ignored.
    //
    // Given
    // -----
    // - The same 2×3 distribution.
    //
    // Expect
    // ------
    // - `sum_over_axes(&[])` equals `as_dense()`.
    // - `sum_over_axes(&[1, 1])` equals `sum_over_axes(&[1])`.
    fn empty_and_duplicate_axis_sets() {
        // Arrange
        let dist = two_species_distribution();

        // Act
        let none = dist.sum_over_axes(&[]).expect("empty set valid");
        let dup = dist.sum_over_axes(&[1, 1]).expect("duplicates valid");
        let single = dist.sum_over_axes(&[1]).expect("axis valid");

        // Assert
        assert_eq!(none.array(), &dist.as_dense());
        assert_eq!(dup, single);
    }

    #[test]
    // Purpose
    // -------
    // Out-of-range axes are rejected rather than silently ignored.
    //
    // Given
    // -----
    // - A two-species distribution and axis 2.
    //
    // Expect
    // ------
    // - `AxisOutOfRange { axis: 2, ndim: 2 }`.
    fn out_of_range_axis_is_rejected() {
        // Arrange
        let dist = two_species_distribution();

        // Act
        let err = dist.sum_over_axes(&[2]).expect_err("axis 2 is invalid");

        // Assert
        assert_eq!(err, LikelihoodError::AxisOutOfRange { axis: 2, ndim: 2 });
    }
}
