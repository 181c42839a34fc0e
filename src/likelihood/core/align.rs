//! Tensor adapter — marginalize, pad/truncate, and floor model tensors.
//!
//! Purpose
//! -------
//! Reconcile per-time model output with the empirical data tensor so that
//! probability cells and count cells line up index for index. The same
//! transformation is applied to the probability tensor and to every
//! sensitivity tensor, so gradients stay aligned with likelihood terms.
//!
//! Key behaviors
//! -------------
//! - [`marginalize`] sums out the unobserved species axes named by the
//!   [`SpeciesLink`].
//! - [`align_to_extent`] zero-pads axes where the model projection is
//!   smaller than the data extent and truncates axes where it is larger.
//!   Tensors that already match are returned unchanged.
//! - [`align_slice`] applies both steps to a probability tensor and its
//!   sensitivities, applies the configured [`TruncationPolicy`], and clamps
//!   probabilities to the floor.
//!
//! Invariants & assumptions
//! ------------------------
//! - A model tensor with a different number of axes than the data tensor is
//!   a configuration error ([`LikelihoodError::AxisCountMismatch`]), never a
//!   silent misalignment.
//! - Flooring happens after alignment and after any renormalization; the
//!   floored values are the ones later divided by in gradient terms.
//! - Padded cells start at probability zero and become exactly the floor.
use ndarray::{ArrayD, IxDyn, Slice, Zip};

use crate::likelihood::{
    core::{
        options::{LikelihoodOptions, TruncationPolicy},
        species_link::SpeciesLink,
        tensor::Reducible,
    },
    errors::{LikResult, LikelihoodError},
};

/// What [`align_to_extent`] had to do to match the data extent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignmentReport {
    /// Axes on which the model tensor was zero-padded.
    pub padded_axes: Vec<usize>,
    /// Axes on which the model tensor was truncated.
    pub truncated_axes: Vec<usize>,
    /// Probability mass removed by truncation (before any renormalization).
    pub discarded_mass: f64,
}

impl AlignmentReport {
    /// `true` when neither padding nor truncation was applied.
    pub fn is_identity(&self) -> bool {
        self.padded_axes.is_empty() && self.truncated_axes.is_empty()
    }
}

/// Aligned, floored probability tensor and its aligned sensitivities.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSlice {
    pub probability: ArrayD<f64>,
    pub sensitivities: Vec<ArrayD<f64>>,
    pub report: AlignmentReport,
}

/// Sum out every species axis that is not linked to a data column.
///
/// # Errors
/// - [`LikelihoodError::AxisCountMismatch`] if the tensor does not have one
///   axis per species of the link table.
pub fn marginalize<R: Reducible + ?Sized>(
    tensor: &R, link: &SpeciesLink,
) -> LikResult<ArrayD<f64>> {
    if tensor.ndim() != link.n_species() {
        return Err(LikelihoodError::AxisCountMismatch {
            model: tensor.ndim(),
            data: link.n_species(),
        });
    }
    Ok(tensor.sum_over_axes(&link.unobserved_axes())?.into_array())
}

/// Zero-pad or truncate `model` so that its shape equals `extent`.
///
/// # Errors
/// - [`LikelihoodError::AxisCountMismatch`] if `model.ndim() != extent.len()`.
pub fn align_to_extent(
    model: &ArrayD<f64>, extent: &[usize],
) -> LikResult<(ArrayD<f64>, AlignmentReport)> {
    if model.ndim() != extent.len() {
        return Err(LikelihoodError::AxisCountMismatch { model: model.ndim(), data: extent.len() });
    }
    if model.shape() == extent {
        return Ok((model.clone(), AlignmentReport::default()));
    }

    let mut report = AlignmentReport::default();
    for (axis, (&m, &d)) in model.shape().iter().zip(extent.iter()).enumerate() {
        if m < d {
            report.padded_axes.push(axis);
        } else if m > d {
            report.truncated_axes.push(axis);
        }
    }
    let overlap: Vec<usize> =
        model.shape().iter().zip(extent.iter()).map(|(&m, &d)| m.min(d)).collect();

    let mut aligned = ArrayD::<f64>::zeros(IxDyn(extent));
    let kept = model.slice_each_axis(|ax| Slice::from(0..overlap[ax.axis.index()]));
    aligned.slice_each_axis_mut(|ax| Slice::from(0..overlap[ax.axis.index()])).assign(&kept);
    if !report.truncated_axes.is_empty() {
        report.discarded_mass = model.sum() - kept.sum();
    }
    Ok((aligned, report))
}

/// Align a reduced probability tensor and its sensitivities to `extent`,
/// apply the truncation policy, then floor the probabilities.
///
/// # Errors
/// - [`LikelihoodError::SensitivityShapeMismatch`] if a sensitivity tensor
///   does not have the probability tensor's shape.
/// - Any error from [`align_to_extent`].
pub fn align_slice(
    probability: &ArrayD<f64>, sensitivities: &[ArrayD<f64>], extent: &[usize],
    options: &LikelihoodOptions,
) -> LikResult<AlignedSlice> {
    for s in sensitivities {
        if s.shape() != probability.shape() {
            return Err(LikelihoodError::SensitivityShapeMismatch {
                expected: probability.shape().to_vec(),
                found: s.shape().to_vec(),
            });
        }
    }
    let (mut prob, report) = align_to_extent(probability, extent)?;
    let mut sens = sensitivities
        .iter()
        .map(|s| align_to_extent(s, extent).map(|(a, _)| a))
        .collect::<LikResult<Vec<_>>>()?;

    if !report.is_identity() {
        tracing::debug!(
            padded = ?report.padded_axes,
            truncated = ?report.truncated_axes,
            discarded_mass = report.discarded_mass,
            "model tensor reshaped to data extent"
        );
    }
    if options.truncation == TruncationPolicy::Renormalize && !report.truncated_axes.is_empty() {
        renormalize(&mut prob, &mut sens);
    }
    floor_probabilities(&mut prob, options.probability_floor);
    Ok(AlignedSlice { probability: prob, sensitivities: sens, report })
}

/// Clamp every cell to at least `floor`.
pub fn floor_probabilities(probability: &mut ArrayD<f64>, floor: f64) {
    probability.mapv_inplace(|p| if p > floor { p } else { floor });
}

// ---- Helper methods ----

/// Rescale kept mass to one; `∂(p/P) = (∂p − (p/P)·∂P) / P`.
fn renormalize(prob: &mut ArrayD<f64>, sens: &mut [ArrayD<f64>]) {
    let mass = prob.sum();
    if mass <= 0.0 || !mass.is_finite() {
        return;
    }
    prob.mapv_inplace(|p| p / mass);
    for s in sens.iter_mut() {
        let d_mass = s.sum();
        Zip::from(s).and(&*prob).for_each(|sv, &pn| *sv = (*sv - pn * d_mass) / mass);
    }
}
