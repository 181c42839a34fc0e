//! Scalar design criteria over a total FIM.
//!
//! Every criterion is expressed as a value to **minimize**:
//!
//! | Variant | Value |
//! |---|---|
//! | `Determinant` (D) | `−det F` |
//! | `SmallestEigenvalue` (E, default) | `−λ_min(F)` |
//! | `Trace` (A) | `−tr F` |
//! | `Subspace(idx)` | `det((F⁻¹)[idx, idx])`, `+∞` when `F` is singular |
use std::str::FromStr;

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::{
    design::errors::{DesignError, DesignResult},
    fim::metrics::{FimSpectrum, to_dmatrix},
};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Criterion {
    Determinant,
    #[default]
    SmallestEigenvalue,
    Trace,
    /// Parameter indices spanning the subspace of interest.
    Subspace(Vec<usize>),
}

impl Criterion {
    /// Check the criterion against a FIM dimension.
    ///
    /// # Errors
    /// [`DesignError::EmptySubspace`] or
    /// [`DesignError::InvalidSubspaceIndex`] for a malformed subspace.
    pub fn validate(&self, dim: usize) -> DesignResult<()> {
        let Criterion::Subspace(indices) = self else {
            return Ok(());
        };
        if indices.is_empty() {
            return Err(DesignError::EmptySubspace);
        }
        for (pos, &index) in indices.iter().enumerate() {
            if index >= dim {
                return Err(DesignError::InvalidSubspaceIndex {
                    index,
                    dim,
                    reason: "Index exceeds the parameter count.",
                });
            }
            if indices[..pos].contains(&index) {
                return Err(DesignError::InvalidSubspaceIndex {
                    index,
                    dim,
                    reason: "Index is repeated.",
                });
            }
        }
        Ok(())
    }

    /// Criterion value of `total` (smaller is better).
    pub fn evaluate(&self, total: &Array2<f64>) -> f64 {
        match self {
            Criterion::Trace => -total.diag().sum(),
            Criterion::Determinant => -FimSpectrum::new(total).determinant(),
            Criterion::SmallestEigenvalue => {
                FimSpectrum::new(total).min_eigenvalue().map_or(f64::INFINITY, |l| -l)
            }
            Criterion::Subspace(indices) => match FimSpectrum::new(total).inverse() {
                Some(cov) => {
                    let sub = cov.select(Axis(0), indices).select(Axis(1), indices);
                    to_dmatrix(&sub).determinant()
                }
                None => f64::INFINITY,
            },
        }
    }
}

impl FromStr for Criterion {
    type Err = DesignError;

    /// Accepts `d`/`determinant`, `e`/`min_eigenvalue`/`smallest_eigenvalue`,
    /// `a`/`trace`, and `subspace:i,j,…` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "d" | "determinant" => Ok(Criterion::Determinant),
            "e" | "min_eigenvalue" | "smallest_eigenvalue" => Ok(Criterion::SmallestEigenvalue),
            "a" | "trace" => Ok(Criterion::Trace),
            other => {
                let list = other
                    .strip_prefix("subspace:")
                    .ok_or_else(|| DesignError::UnknownCriterion(s.to_string()))?;
                list.split(',')
                    .map(|tok| tok.trim().parse::<usize>())
                    .collect::<Result<Vec<_>, _>>()
                    .map(Criterion::Subspace)
                    .map_err(|_| DesignError::UnknownCriterion(s.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Each criterion maps a FIM to the documented minimized value.
    //
    // Given
    // -----
    // - F = diag(4, 0.5).
    //
    // Expect
    // ------
    // - D: −2, E: −0.5, A: −4.5, subspace [1]: 2.
    fn criteria_values_on_diagonal_fim() {
        // Arrange
        let f = array![[4.0, 0.0], [0.0, 0.5]];

        // Act / Assert
        assert_relative_eq!(Criterion::Determinant.evaluate(&f), -2.0, epsilon = 1e-12);
        assert_relative_eq!(Criterion::SmallestEigenvalue.evaluate(&f), -0.5, epsilon = 1e-12);
        assert_relative_eq!(Criterion::Trace.evaluate(&f), -4.5, epsilon = 1e-12);
        assert_relative_eq!(Criterion::Subspace(vec![1]).evaluate(&f), 2.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Singular FIMs make the subspace criterion infinitely bad, not NaN.
    //
    // Given
    // -----
    // - F = diag(1, 0), and a 0 × 0 matrix.
    //
    // Expect
    // ------
    // - Subspace value `+∞`; E value `0`.
    // - E value `+∞` for the empty matrix, never `−∞`.
    fn singular_fim_subspace_is_infinite() {
        // Arrange
        let f = array![[1.0, 0.0], [0.0, 0.0]];
        let empty = ndarray::Array2::<f64>::zeros((0, 0));

        // Act / Assert
        assert_eq!(Criterion::Subspace(vec![0]).evaluate(&f), f64::INFINITY);
        assert_eq!(Criterion::SmallestEigenvalue.evaluate(&f), 0.0);
        assert_eq!(Criterion::SmallestEigenvalue.evaluate(&empty), f64::INFINITY);
    }

    #[test]
    // Purpose
    // -------
    // String parsing and subspace validation.
    //
    // Given
    // -----
    // - Names in mixed case; subspace lists with a bad or repeated index.
    //
    // Expect
    // ------
    // - Parsed variants; validation errors for the malformed subspaces.
    fn parses_names_and_validates_subspace() {
        // Arrange / Act
        let d: Criterion = "Determinant".parse().expect("known name");
        let e: Criterion = "E".parse().expect("known name");
        let s: Criterion = "subspace: 0, 2".parse().expect("valid list");

        // Assert
        assert_eq!(d, Criterion::Determinant);
        assert_eq!(e, Criterion::SmallestEigenvalue);
        assert_eq!(s, Criterion::Subspace(vec![0, 2]));
        assert!("bogus".parse::<Criterion>().is_err());
        assert!(s.validate(2).is_err());
        assert!(Criterion::Subspace(vec![1, 1]).validate(3).is_err());
        assert_eq!(Criterion::Subspace(vec![]).validate(3), Err(DesignError::EmptySubspace));
        assert!(s.validate(3).is_ok());
    }
}
