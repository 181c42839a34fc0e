//! Conversion helpers for the Python bindings.
#[cfg(feature = "python-bindings")]
use ndarray::Array2;

#[cfg(feature = "python-bindings")]
use numpy::{PyReadonlyArray2, PyReadonlyArray3};

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
    types::PyAny,
};

/// Extract a FIM library from a `(T, d, d)` array or a sequence of `(d, d)`
/// arrays.
#[cfg(feature = "python-bindings")]
pub fn extract_fim_library<'py>(raw: &Bound<'py, PyAny>) -> PyResult<Vec<Array2<f64>>> {
    if let Ok(stack) = raw.extract::<PyReadonlyArray3<f64>>() {
        let view = stack.as_array();
        return Ok(view.outer_iter().map(|f| f.to_owned()).collect());
    }
    let list: Vec<PyReadonlyArray2<f64>> = raw.extract().map_err(|_| {
        PyTypeError::new_err("expected a (T, d, d) float64 array or a sequence of (d, d) arrays")
    })?;
    Ok(list.iter().map(|f| f.as_array().to_owned()).collect())
}

/// Extract per-time cell counts, rejecting a length that does not match the
/// library.
#[cfg(feature = "python-bindings")]
pub fn extract_counts(raw: &Bound<'_, PyAny>, n_times: usize) -> PyResult<Vec<u64>> {
    let counts: Vec<u64> = raw
        .extract()
        .map_err(|_| PyTypeError::new_err("expected a sequence of non-negative integers"))?;
    if counts.len() != n_times {
        return Err(PyValueError::new_err(format!(
            "{} cell counts supplied for {} time points",
            counts.len(),
            n_times
        )));
    }
    Ok(counts)
}
