//! Validation helpers for the EKF estimator.
//!
//! This module centralizes the consistency checks used across the filter:
//!
//! - **Configuration checks**: [`verify_noise_scale`], [`validate_covariance`]
//!   ensure noise scales are finite and non-negative and that covariances
//!   are square, of the right size, and finite.
//! - **Batch checks**: [`validate_batches`], [`validate_output_shape`]
//!   enforce `N ≥ 1`, matching row counts and widths, and finite entries.
//! - **Jacobian rows**: [`validate_grad`] enforces row length and finite entries.
//! - **Results**: [`ensure_finite`] reports the first NaN/±inf in a
//!   candidate mean or covariance before it is committed.
//!
//! All helpers return domain-specific [`EkfError`] variants so higher-level
//! code reports failures uniformly.
use ndarray::{ArrayBase, Data, Dimension};

use crate::filter::{
    errors::{EkfError, EkfResult},
    types::{BatchView, Covariance, Grad},
};

/// Validate a noise scale (or any scale that multiplies an identity).
///
/// The value must be **finite** and **non-negative**; zero is allowed.
///
/// # Errors
/// Returns [`EkfError::InvalidNoiseScale`] tagged with `name`.
pub fn verify_noise_scale(name: &'static str, value: f64) -> EkfResult<()> {
    if !value.is_finite() {
        return Err(EkfError::InvalidNoiseScale { name, value, reason: "Scale must be finite." });
    }
    if value < 0.0 {
        return Err(EkfError::InvalidNoiseScale {
            name,
            value,
            reason: "Scale must be non-negative.",
        });
    }
    Ok(())
}

/// Validate the shape and entries of a covariance matrix.
///
/// # Checks
/// 1. Matrix dimensions must equal `dim × dim`.
/// 2. All entries must be finite.
///
/// # Errors
/// - [`EkfError::CovarianceShapeMismatch`] if dimensions do not match `dim`.
/// - [`EkfError::NonFiniteCovariance`] with the first offending row/col.
pub fn validate_covariance(cov: &Covariance, dim: usize) -> EkfResult<()> {
    if cov.nrows() != dim || cov.ncols() != dim {
        return Err(EkfError::CovarianceShapeMismatch {
            expected: dim,
            found: (cov.nrows(), cov.ncols()),
        });
    }
    for ((row, col), &value) in cov.indexed_iter() {
        if !value.is_finite() {
            return Err(EkfError::NonFiniteCovariance { row, col, value });
        }
    }
    Ok(())
}

/// Validate an `(inputs, targets)` pair against the model's dimensions.
///
/// # Errors
/// - [`EkfError::EmptyBatch`] if there are no input rows.
/// - [`EkfError::BatchLengthMismatch`] if row counts differ.
/// - [`EkfError::InputDimMismatch`] / [`EkfError::TargetDimMismatch`] for
///   wrong widths.
/// - [`EkfError::NonFiniteResult`] (`what = "inputs"` or `"targets"`) for the
///   first NaN/±inf entry in row-major order.
pub fn validate_batches(
    inputs: BatchView<'_>, targets: BatchView<'_>, input_dim: usize, output_dim: usize,
) -> EkfResult<()> {
    if inputs.nrows() == 0 {
        return Err(EkfError::EmptyBatch);
    }
    if inputs.nrows() != targets.nrows() {
        return Err(EkfError::BatchLengthMismatch {
            inputs: inputs.nrows(),
            targets: targets.nrows(),
        });
    }
    if inputs.ncols() != input_dim {
        return Err(EkfError::InputDimMismatch { expected: input_dim, actual: inputs.ncols() });
    }
    if targets.ncols() != output_dim {
        return Err(EkfError::TargetDimMismatch { expected: output_dim, actual: targets.ncols() });
    }
    ensure_finite("inputs", &inputs)?;
    ensure_finite("targets", &targets)
}

/// Validate that the model produced an output batch shaped like the targets.
///
/// # Errors
/// Returns [`EkfError::OutputShapeMismatch`] otherwise.
pub fn validate_output_shape(output: BatchView<'_>, targets: BatchView<'_>) -> EkfResult<()> {
    if output.dim() != targets.dim() {
        return Err(EkfError::OutputShapeMismatch { expected: targets.dim(), found: output.dim() });
    }
    Ok(())
}

/// Validate one Jacobian row against length and finiteness.
///
/// # Errors
/// - [`EkfError::GradientDimMismatch`] if `grad.len() != dim`.
/// - [`EkfError::NonFiniteResult`] (`what = "jacobian"`) for the first
///   non-finite element; `index` is the flat `row * dim + col` position.
pub fn validate_grad(row: usize, grad: &Grad, dim: usize) -> EkfResult<()> {
    if grad.len() != dim {
        return Err(EkfError::GradientDimMismatch { row, expected: dim, found: grad.len() });
    }
    for (col, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(EkfError::NonFiniteResult {
                what: "jacobian",
                index: row * dim + col,
                value,
            });
        }
    }
    Ok(())
}

/// Report the first non-finite element of `values` (in logical iteration order).
///
/// # Errors
/// Returns [`EkfError::NonFiniteResult`] tagged with `what`.
pub fn ensure_finite<S, D>(what: &'static str, values: &ArrayBase<S, D>) -> EkfResult<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    match values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        Some((index, &value)) => Err(EkfError::NonFiniteResult { what, index, value }),
        None => Ok(()),
    }
}
