//! Per-time single-cell FIMs from sensitivity output.
//!
//! Purpose
//! -------
//! Reduce each time point's distribution and sensitivities onto the
//! observed species (when an unobserved axis set is configured) and hand
//! them to a [`SingleCellFim`] calculator, producing one `n×n` matrix per
//! time point.
//!
//! Key behaviors
//! -------------
//! - With `unobserved = Some(axes)`, the probability tensor and every
//!   sensitivity are summed over `axes` through [`Reducible::sum_over_axes`].
//! - With `unobserved = None`, tensors are densified unreduced.
//! - [`DirectFim`] computes `F_ij = Σ_x s_i(x) s_j(x) / p(x)` over cells
//!   with `p(x)` above its floor, optionally after a distortion operator.
//!
//! Invariants & assumptions
//! ------------------------
//! - `sensitivities[t]` holds one tensor per parameter, in parameter order;
//!   FIM rows/columns follow that order.
use ndarray::{Array2, ArrayD, Zip};

use crate::{
    fim::errors::{FimError, FimResult},
    likelihood::core::{options::PROBABILITY_FLOOR, tensor::Reducible},
    solver::{DistortionOperator, SensitivitySolution},
};

/// Single-cell Fisher information from one distribution and its
/// sensitivities.
pub trait SingleCellFim: Send + Sync {
    fn single_cell_fim(
        &self, distribution: &ArrayD<f64>, sensitivities: &[ArrayD<f64>],
        pdo: Option<&dyn DistortionOperator>,
    ) -> anyhow::Result<Array2<f64>>;
}

/// Exact single-cell FIM for a discrete distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectFim {
    floor: f64,
}

impl DirectFim {
    /// Cells with `p(x) ≤ floor` are skipped.
    pub fn new(floor: f64) -> Self {
        Self { floor }
    }
}

impl Default for DirectFim {
    fn default() -> Self {
        Self::new(PROBABILITY_FLOOR)
    }
}

impl SingleCellFim for DirectFim {
    fn single_cell_fim(
        &self, distribution: &ArrayD<f64>, sensitivities: &[ArrayD<f64>],
        pdo: Option<&dyn DistortionOperator>,
    ) -> anyhow::Result<Array2<f64>> {
        let (p, s) = match pdo {
            None => (distribution.clone(), sensitivities.to_vec()),
            Some(op) => {
                let s = sensitivities
                    .iter()
                    .enumerate()
                    .map(|(j, sj)| op.observation_dist_diff(distribution, sj, j))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                (op.observation_dist(distribution)?, s)
            }
        };
        for sj in &s {
            anyhow::ensure!(
                sj.shape() == p.shape(),
                "sensitivity shape {:?} differs from distribution shape {:?}",
                sj.shape(),
                p.shape()
            );
        }

        let n = s.len();
        let mut fim = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let mut acc = 0.0;
                Zip::from(&p).and(&s[i]).and(&s[j]).for_each(|&px, &si, &sj| {
                    if px > self.floor {
                        acc += si * sj / px;
                    }
                });
                fim[[i, j]] = acc;
                fim[[j, i]] = acc;
            }
        }
        Ok(fim)
    }
}

/// One single-cell FIM per time point of `solution`.
///
/// # Errors
/// - [`FimError::SensitivityLengthMismatch`] if the solution's vectors
///   disagree in length.
/// - [`FimError::Likelihood`] if a reduction axis is out of range.
/// - [`FimError::Collaborator`] if the calculator or PDO fails.
pub fn compute_fim<T: Reducible>(
    solution: &SensitivitySolution<T>, unobserved: Option<&[usize]>,
    pdo: Option<&dyn DistortionOperator>, calculator: &dyn SingleCellFim,
) -> FimResult<Vec<Array2<f64>>> {
    let n_times = solution.times.len();
    if solution.distributions.len() != n_times {
        return Err(FimError::SensitivityLengthMismatch {
            times: n_times,
            found: solution.distributions.len(),
        });
    }
    if solution.sensitivities.len() != n_times {
        return Err(FimError::SensitivityLengthMismatch {
            times: n_times,
            found: solution.sensitivities.len(),
        });
    }

    let reduce = |t: &T| -> FimResult<ArrayD<f64>> {
        match unobserved {
            Some(axes) => Ok(t.sum_over_axes(axes)?.into_array()),
            None => Ok(t.as_dense()),
        }
    };

    solution
        .distributions
        .iter()
        .zip(solution.sensitivities.iter())
        .map(|(dist, sens)| {
            let p = reduce(dist)?;
            let s = sens.iter().map(&reduce).collect::<FimResult<Vec<_>>>()?;
            Ok(calculator.single_cell_fim(&p, &s, pdo)?)
        })
        .collect()
}
