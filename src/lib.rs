//! cme_inference — likelihood, Fisher information and experiment design for
//! stochastic reaction networks observed at single-cell resolution.
//!
//! Purpose
//! -------
//! Connect the probability distributions computed by a chemical master
//! equation solver (typically an FSP projection) to single-cell count data:
//! score the data, compute parameter gradients, aggregate per-time Fisher
//! information, choose how many cells to measure at each time point, and fit
//! parameters.
//!
//! Key behaviors
//! -------------
//! - [`solver`] defines the collaborator traits the crate consumes
//!   (distribution solver, distortion operator), the state-space handle, and
//!   reference implementations (analytic birth–death, binomial detection).
//! - [`likelihood`] builds data tensors, aligns model tensors to them and
//!   evaluates `(ℓ, ∇ℓ)`.
//! - [`fim`] assembles per-time FIMs and summarizes total FIMs.
//! - [`design`] runs the greedy allocation search.
//! - [`estimation`] fits parameters with simplex, L-BFGS, particle swarm or
//!   multi-chain Metropolis–Hastings back-ends.
//! - With the `python-bindings` feature, this file also defines the
//!   `_cme_inference` extension module.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameters are strictly positive rates; estimation works on their
//!   logarithms.
//! - Data tensors and frozen state spaces are immutable once built and may be
//!   shared across threads.
//!
//! Conventions
//! -----------
//! - Every component has its own error enum and `Result` alias; external
//!   collaborator failures arrive as `anyhow::Error`.
//! - Progress and recoverable conditions are reported through `tracing`
//!   events; installing a subscriber is left to the application.
//!
//! Downstream usage
//! ----------------
//! - Rust callers import the curated surface with
//!   `use cme_inference::prelude::*;`.
//! - Python callers use `ExperimentDesign` and `fim_metrics` from the
//!   `_cme_inference.design` submodule.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to the code; `tests/` covers the end-to-end
//!   scenarios (likelihood profile of a birth–death fit, design tie-breaking,
//!   rank-deficient FIMs) and cross-module properties.

pub mod design;
pub mod estimation;
pub mod fim;
pub mod likelihood;
pub mod solver;
pub mod utils;

pub mod prelude {
    pub use crate::design::prelude::*;
    pub use crate::estimation::prelude::*;
    pub use crate::fim::prelude::*;
    pub use crate::likelihood::prelude::*;
    pub use crate::solver::{
        DistortionOperator, DistributionSolver, ModelSolution, SensitivitySolution, SolveRequest,
        birth_death::BirthDeathSolver, distortion::BinomialDistortion, state_space::StateSpace,
    };
}

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray2};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    design::{Allocation, Criterion, DesignOptions, DesignOutcome, optimize_design},
    fim::{CovarianceEstimate, evaluate_experiment},
    utils::{extract_counts, extract_fim_library},
};

/// ExperimentDesign — greedy cell allocation over a FIM library.
///
/// Constructed from Python as
/// `ExperimentDesign(fims, budget, criterion="e", seed=None)`:
/// - `fims`: `(T, d, d)` array or sequence of `(d, d)` arrays.
/// - `budget`: total number of cells, positive.
/// - `criterion`: `"d"`, `"e"`, `"a"` or `"subspace:i,j"`.
/// - `seed`: optional starting allocation summing to `budget`.
///
/// The search runs in the constructor; the getters expose the result.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "cme_inference.design")]
pub struct ExperimentDesign {
    inner: DesignOutcome,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl ExperimentDesign {
    #[new]
    #[pyo3(
        text_signature = "(fims, budget, /, criterion='e', seed=None)",
        signature = (fims, budget, criterion = "e", seed = None)
    )]
    pub fn new<'py>(
        fims: &Bound<'py, PyAny>, budget: u64, criterion: &str, seed: Option<&Bound<'py, PyAny>>,
    ) -> PyResult<ExperimentDesign> {
        let library = extract_fim_library(fims)?;
        let criterion: Criterion = criterion.parse()?;
        let mut options = DesignOptions::new(criterion);
        if let Some(seed) = seed {
            options = options.with_seed(Allocation::new(extract_counts(seed, library.len())?));
        }
        let inner = optimize_design(&library, budget, &options)?;
        Ok(ExperimentDesign { inner })
    }

    /// Cells per time point.
    #[getter]
    pub fn allocation(&self) -> Vec<u64> {
        self.inner.allocation.counts().to_vec()
    }

    /// Criterion value of the allocation (smaller is better).
    #[getter]
    pub fn criterion_value(&self) -> f64 {
        self.inner.criterion_value
    }

    #[getter]
    pub fn moves(&self) -> usize {
        self.inner.moves
    }

    #[getter]
    pub fn evaluations(&self) -> usize {
        self.inner.evaluations
    }
}

/// Exposed to Python as `fim_metrics(fims, counts)`.
///
/// Total FIM, covariance (or `None` if rank deficient), and
/// `(determinant, trace, min_eigenvalue)` of an allocation.
#[cfg(feature = "python-bindings")]
#[pyfunction(name = "fim_metrics")]
#[pyo3(signature = (fims, counts))]
#[allow(clippy::type_complexity)]
pub fn experiment_metrics<'py>(
    py: Python<'py>, fims: &Bound<'py, PyAny>, counts: &Bound<'py, PyAny>,
) -> PyResult<(Bound<'py, PyArray2<f64>>, Option<Bound<'py, PyArray2<f64>>>, (f64, f64, f64))> {
    let library = extract_fim_library(fims)?;
    let counts = extract_counts(counts, library.len())?;
    let eval = evaluate_experiment(&library, &counts, true)?;
    let metrics = eval
        .metrics
        .ok_or_else(|| PyValueError::new_err("metrics were not computed"))?;
    let covariance = match eval.covariance {
        CovarianceEstimate::Defined(cov) => Some(cov.into_pyarray(py)),
        CovarianceEstimate::Undefined { .. } => None,
    };
    Ok((
        eval.total.into_pyarray(py),
        covariance,
        (metrics.determinant, metrics.trace, metrics.min_eigenvalue),
    ))
}

/// Module initializer for `_cme_inference`.
///
/// The `design` submodule is also registered in `sys.modules` so that
/// `import cme_inference.design` works.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _cme_inference<'py>(py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let design_mod = PyModule::new(py, "design")?;
    design_submodule(py, m, &design_mod)?;

    py.import("sys")?.getattr("modules")?.set_item("cme_inference.design", design_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn design_submodule<'py>(
    _py: Python, cme_inference: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<ExperimentDesign>()?;
    m.add_function(wrap_pyfunction!(experiment_metrics, m)?)?;
    cme_inference.add_submodule(m)?;
    Ok(())
}
