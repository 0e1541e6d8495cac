//! Errors for the reference models (layout construction, parameter
//! marshaling, forward evaluation, and per-output gradients).
//!
//! This module defines [`ModelError`], the error type returned by every
//! [`DifferentiableModel`](crate::filter::traits::DifferentiableModel)
//! method. The filter layer never swallows these; it wraps them with the
//! update phase in which they occurred (see
//! [`EkfError::Model`](crate::filter::errors::EkfError::Model)).
//!
//! ## Conventions
//! - **Indices are 0-based.**
//! - Output indices address the row-major flattening of an `N × output_dim`
//!   output batch: `k = n * output_dim + j`.
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

/// Result alias for model operations that may produce [`ModelError`].
pub type ModelResult<T> = Result<T, ModelError>;

/// Unified error type for differentiable models.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    // ---- Gradient ----
    /// The model does not provide analytic per-output gradients; callers
    /// should fall back to finite differences.
    GradientNotImplemented,

    /// Requested output scalar does not exist in the last forward pass.
    OutputIndexOutOfRange { index: usize, len: usize },

    /// A gradient was requested before any forward pass, or for a batch
    /// that differs in shape from the cached one.
    NoForwardPass,

    // ---- Parameters ----
    /// Flat parameter vector has the wrong length.
    ParameterLengthMismatch { expected: usize, actual: usize },

    /// Flat parameter vector contains a NaN/±inf entry.
    NonFiniteParameter { index: usize, value: f64 },

    // ---- Inputs ----
    /// Input batch has no rows.
    EmptyBatch,

    /// Input batch has the wrong number of columns.
    InputDimMismatch { expected: usize, actual: usize },

    // ---- Architecture / layout ----
    /// Layer sizes must contain at least an input and an output size, all > 0.
    InvalidLayerSizes { reason: &'static str },

    /// A tensor slice could not be viewed with its recorded shape.
    LayoutShape { name: String },

    /// A tensor name was registered twice in a layout.
    DuplicateTensor { name: String },

    /// A tensor name is not present in the layout.
    UnknownTensor { name: String },
}

impl std::error::Error for ModelError {}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Gradient ----
            ModelError::GradientNotImplemented => {
                write!(f, "Per-output gradient not implemented for this model")
            }
            ModelError::OutputIndexOutOfRange { index, len } => {
                write!(f, "Output index {index} out of range for {len} output scalars")
            }
            ModelError::NoForwardPass => {
                write!(f, "No cached forward pass matches the requested batch")
            }
            // ---- Parameters ----
            ModelError::ParameterLengthMismatch { expected, actual } => {
                write!(f, "Parameter vector length mismatch: expected {expected}, got {actual}")
            }
            ModelError::NonFiniteParameter { index, value } => {
                write!(f, "Parameter at index {index} must be finite, got {value}")
            }
            // ---- Inputs ----
            ModelError::EmptyBatch => {
                write!(f, "Input batch must contain at least one row")
            }
            ModelError::InputDimMismatch { expected, actual } => {
                write!(f, "Input dimension mismatch: expected {expected}, got {actual}")
            }
            // ---- Architecture / layout ----
            ModelError::InvalidLayerSizes { reason } => {
                write!(f, "Invalid layer sizes: {reason}")
            }
            ModelError::LayoutShape { name } => {
                write!(f, "Tensor '{name}' cannot be viewed with its recorded shape")
            }
            ModelError::DuplicateTensor { name } => {
                write!(f, "Tensor '{name}' is already registered in the layout")
            }
            ModelError::UnknownTensor { name } => {
                write!(f, "Tensor '{name}' is not part of the layout")
            }
        }
    }
}

/// Convert a [`ModelError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<ModelError> for PyErr {
    fn from(err: ModelError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
