//! Python conversion helpers for the `python-bindings` feature.
//!
//! - [`extract_f64_matrix`]: accept a 2-D `numpy.ndarray`, a pandas
//!   `DataFrame` (through `to_numpy`), or a nested sequence of floats and
//!   return an owned row-major `Array2<f64>`.
//! - [`parse_activation`]: map an activation name to [`Activation`].
#[cfg(feature = "python-bindings")]
use ndarray::Array2;

#[cfg(feature = "python-bindings")]
use numpy::{PyReadonlyArray2, PyUntypedArrayMethods};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::network::activation::Activation;

#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix<'py>(raw_data: &Bound<'py, PyAny>) -> PyResult<Array2<f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray2<f64>>() {
        return readonly_to_owned(&arr_ro);
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(frame_ro) = obj.extract::<PyReadonlyArray2<f64>>() {
            if frame_ro.ndim() == 2 {
                return readonly_to_owned(&frame_ro);
            }
        }
    }

    let rows: Vec<Vec<f64>> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 2-D numpy.ndarray, pandas.DataFrame, or nested sequence of float64",
        )
    })?;
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|row| row.len() != ncols) {
        return Err(PyValueError::new_err("all rows must have the same length"));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    let nrows = if ncols == 0 { 0 } else { flat.len() / ncols };
    Array2::from_shape_vec((nrows, ncols), flat)
        .map_err(|err| PyValueError::new_err(format!("invalid matrix shape: {err}")))
}

/// Copy a readonly numpy matrix element by element in logical row-major
/// order. numpy may resolve its own `ndarray` release, so no array type
/// crosses over from it.
#[cfg(feature = "python-bindings")]
fn readonly_to_owned(arr: &PyReadonlyArray2<'_, f64>) -> PyResult<Array2<f64>> {
    let shape = arr.shape();
    let (nrows, ncols) = (shape[0], shape[1]);
    let flat: Vec<f64> = arr.as_array().iter().copied().collect();
    Array2::from_shape_vec((nrows, ncols), flat)
        .map_err(|err| PyValueError::new_err(format!("invalid matrix shape: {err}")))
}

#[cfg(feature = "python-bindings")]
pub fn parse_activation(name: &str) -> PyResult<Activation> {
    Activation::from_name(name).ok_or_else(|| {
        PyValueError::new_err(format!(
            "unknown activation '{name}'; expected one of 'identity', 'softsign', 'tanh', 'relu'"
        ))
    })
}
