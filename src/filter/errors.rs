//! Errors for the EKF estimator (configuration, batch shapes, numerical
//! breakdown, and wrapped model failures).
//!
//! [`EkfError`] is the single error surface of the filter layer. Every
//! variant belongs to one of five kinds ([`EkfErrorKind`]):
//!
//! - **InvalidConfiguration** — construction-time, non-recoverable; fix the
//!   options and rebuild the estimator.
//! - **DimensionMismatch** — per-call caller error; fix the batch shapes.
//! - **SingularInnovation** — per-call numerical failure; retry with a
//!   larger observation noise or skip the example.
//! - **NonFiniteResult** — filter divergence; stop or reset the covariance.
//! - **Model** — an error raised by the model, surfaced unchanged in kind
//!   and tagged with the [`UpdatePhase`] that triggered it.
//!
//! Updates are transactional: whatever the error, the covariance and the
//! model parameters are exactly as they were before the call.
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

use crate::network::errors::ModelError;

/// Crate-wide result alias for filter operations.
pub type EkfResult<T> = Result<T, EkfError>;

/// Phase of an update (or of construction) in which a model error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    /// Reading the current parameter vector (the filter mean).
    ReadParameters,
    /// Forward evaluation of the batch.
    Forward,
    /// Assembling the Jacobian row by row.
    Linearize,
    /// Writing the corrected mean back into the model.
    Commit,
}

impl std::fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UpdatePhase::ReadParameters => "read-parameters",
            UpdatePhase::Forward => "forward",
            UpdatePhase::Linearize => "linearize",
            UpdatePhase::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// Coarse classification of an [`EkfError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EkfErrorKind {
    InvalidConfiguration,
    DimensionMismatch,
    SingularInnovation,
    NonFiniteResult,
    Model,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EkfError {
    // ---- Configuration ----
    /// Process/observation noise scale must be finite and >= 0.
    InvalidNoiseScale {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Initial covariance must be P×P.
    CovarianceShapeMismatch {
        expected: usize,
        found: (usize, usize),
    },

    /// Initial covariance entries must be finite.
    NonFiniteCovariance {
        row: usize,
        col: usize,
        value: f64,
    },

    // ---- Batch shapes ----
    /// Input batch has no rows.
    EmptyBatch,

    /// Number of input rows differs from number of target rows.
    BatchLengthMismatch {
        inputs: usize,
        targets: usize,
    },

    /// Input batch width differs from the model's input dimension.
    InputDimMismatch {
        expected: usize,
        actual: usize,
    },

    /// Target batch width differs from the model's output dimension.
    TargetDimMismatch {
        expected: usize,
        actual: usize,
    },

    /// The model produced an output batch of unexpected shape.
    OutputShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A Jacobian row has the wrong length.
    GradientDimMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    // ---- Numerical ----
    /// Innovation covariance `S` (dim × dim) could not be factorized.
    SingularInnovation {
        dim: usize,
    },

    /// An intermediate or final quantity contains NaN/±inf.
    NonFiniteResult {
        what: &'static str,
        index: usize,
        value: f64,
    },

    // ---- Model ----
    /// Error raised by the model, tagged with the phase that triggered it.
    Model {
        phase: UpdatePhase,
        source: ModelError,
    },
}

impl EkfError {
    /// Returns a closure that wraps a [`ModelError`] with `phase`, for use
    /// with `map_err`.
    pub fn in_phase(phase: UpdatePhase) -> impl Fn(ModelError) -> EkfError {
        move |source| EkfError::Model { phase, source }
    }

    /// Coarse classification of this error.
    ///
    /// Model errors that describe a shape problem (wrong parameter length,
    /// wrong input width, empty batch) classify as
    /// [`EkfErrorKind::DimensionMismatch`]; everything else the model raises
    /// classifies as [`EkfErrorKind::Model`].
    pub fn kind(&self) -> EkfErrorKind {
        match self {
            EkfError::InvalidNoiseScale { .. }
            | EkfError::CovarianceShapeMismatch { .. }
            | EkfError::NonFiniteCovariance { .. } => EkfErrorKind::InvalidConfiguration,
            EkfError::EmptyBatch
            | EkfError::BatchLengthMismatch { .. }
            | EkfError::InputDimMismatch { .. }
            | EkfError::TargetDimMismatch { .. }
            | EkfError::OutputShapeMismatch { .. }
            | EkfError::GradientDimMismatch { .. } => EkfErrorKind::DimensionMismatch,
            EkfError::SingularInnovation { .. } => EkfErrorKind::SingularInnovation,
            EkfError::NonFiniteResult { .. } => EkfErrorKind::NonFiniteResult,
            EkfError::Model { source, .. } => match source {
                ModelError::ParameterLengthMismatch { .. }
                | ModelError::InputDimMismatch { .. }
                | ModelError::EmptyBatch => EkfErrorKind::DimensionMismatch,
                _ => EkfErrorKind::Model,
            },
        }
    }
}

impl std::error::Error for EkfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EkfError::Model { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl std::fmt::Display for EkfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Configuration ----
            EkfError::InvalidNoiseScale { name, value, reason } => {
                write!(f, "Invalid {name} {value}: {reason}")
            }
            EkfError::CovarianceShapeMismatch { expected, found } => {
                write!(
                    f,
                    "Covariance shape mismatch: expected ({expected}, {expected}), found {found:?}"
                )
            }
            EkfError::NonFiniteCovariance { row, col, value } => {
                write!(f, "Invalid covariance at ({row}, {col}): {value}, must be finite")
            }

            // ---- Batch shapes ----
            EkfError::EmptyBatch => {
                write!(f, "Batch must contain at least one example")
            }
            EkfError::BatchLengthMismatch { inputs, targets } => {
                write!(f, "Batch length mismatch: {inputs} inputs, {targets} targets")
            }
            EkfError::InputDimMismatch { expected, actual } => {
                write!(f, "Input dimension mismatch: expected {expected}, got {actual}")
            }
            EkfError::TargetDimMismatch { expected, actual } => {
                write!(f, "Target dimension mismatch: expected {expected}, got {actual}")
            }
            EkfError::OutputShapeMismatch { expected, found } => {
                write!(f, "Model output shape mismatch: expected {expected:?}, found {found:?}")
            }
            EkfError::GradientDimMismatch { row, expected, found } => {
                write!(
                    f,
                    "Gradient dimension mismatch in Jacobian row {row}: expected {expected}, found {found}"
                )
            }

            // ---- Numerical ----
            EkfError::SingularInnovation { dim } => {
                write!(f, "Innovation covariance ({dim}x{dim}) is numerically singular")
            }
            EkfError::NonFiniteResult { what, index, value } => {
                write!(f, "Non-finite {what} at flat index {index}: {value}")
            }

            // ---- Model ----
            EkfError::Model { phase, source } => {
                write!(f, "Model error during {phase}: {source}")
            }
        }
    }
}

/// Convert an [`EkfError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<EkfError> for PyErr {
    fn from(err: EkfError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Shape-type model errors should classify as dimension mismatches, while
    // other model errors keep their own kind.
    fn kind_maps_model_shape_errors_to_dimension_mismatch() {
        // Arrange
        let wrap = EkfError::in_phase(UpdatePhase::Forward);

        // Act
        let shape = wrap(ModelError::InputDimMismatch { expected: 5, actual: 4 });
        let other = wrap(ModelError::NoForwardPass);

        // Assert
        assert_eq!(shape.kind(), EkfErrorKind::DimensionMismatch);
        assert_eq!(other.kind(), EkfErrorKind::Model);
        assert_eq!(EkfError::SingularInnovation { dim: 3 }.kind(), EkfErrorKind::SingularInnovation);
    }

    #[test]
    // Purpose
    // -------
    // The display of a wrapped model error names the phase and the source,
    // and `source()` exposes the original model error.
    fn model_error_display_and_source() {
        // Arrange
        let err = EkfError::Model {
            phase: UpdatePhase::Linearize,
            source: ModelError::OutputIndexOutOfRange { index: 7, len: 5 },
        };

        // Act
        let text = err.to_string();

        // Assert
        assert!(text.contains("linearize"));
        assert!(text.contains("Output index 7"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
