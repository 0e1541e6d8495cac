//! Errors for the teacher/student training driver.
//!
//! [`TrainingError`] covers driver configuration (loop counts, batch and
//! test sizes, evaluation cadence), architecture compatibility between
//! teacher and student, metric shape checks, and wraps errors raised by
//! the estimator ([`EkfError`]) or directly by a model ([`ModelError`]).
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

use crate::{filter::errors::EkfError, network::errors::ModelError};

/// Result alias for driver operations.
pub type TrainingResult<T> = Result<T, TrainingError>;

#[derive(Debug, Clone, PartialEq)]
pub enum TrainingError {
    // ---- Driver options ----
    /// Number of update calls must be > 0.
    InvalidLoops { value: usize, reason: &'static str },

    /// Examples per update must be > 0.
    InvalidBatchSize { value: usize, reason: &'static str },

    /// Evaluation cadence must be > 0.
    InvalidEvalEvery { value: usize, reason: &'static str },

    /// Held-out set must contain at least one example.
    InvalidTestSize { value: usize, reason: &'static str },

    // ---- Setup ----
    /// Teacher and student disagree on input or output dimension.
    ArchitectureMismatch { teacher: (usize, usize), student: (usize, usize) },

    /// Predictions and targets passed to a metric differ in shape, or are empty.
    MetricShape { predictions: (usize, usize), targets: (usize, usize) },

    // ---- Wrapped ----
    Ekf(EkfError),
    Model(ModelError),
}

impl From<EkfError> for TrainingError {
    fn from(err: EkfError) -> Self {
        TrainingError::Ekf(err)
    }
}

impl From<ModelError> for TrainingError {
    fn from(err: ModelError) -> Self {
        TrainingError::Model(err)
    }
}

impl std::error::Error for TrainingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrainingError::Ekf(err) => Some(err),
            TrainingError::Model(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrainingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Driver options ----
            TrainingError::InvalidLoops { value, reason } => {
                write!(f, "Invalid loops {value}: {reason}")
            }
            TrainingError::InvalidBatchSize { value, reason } => {
                write!(f, "Invalid batch size {value}: {reason}")
            }
            TrainingError::InvalidEvalEvery { value, reason } => {
                write!(f, "Invalid evaluation cadence {value}: {reason}")
            }
            TrainingError::InvalidTestSize { value, reason } => {
                write!(f, "Invalid test size {value}: {reason}")
            }
            // ---- Setup ----
            TrainingError::ArchitectureMismatch { teacher, student } => {
                write!(
                    f,
                    "Teacher (input, output) dims {teacher:?} differ from student dims {student:?}"
                )
            }
            TrainingError::MetricShape { predictions, targets } => {
                write!(
                    f,
                    "Metric shape mismatch: predictions {predictions:?}, targets {targets:?}"
                )
            }
            // ---- Wrapped ----
            TrainingError::Ekf(err) => write!(f, "Estimator error: {err}"),
            TrainingError::Model(err) => write!(f, "Model error: {err}"),
        }
    }
}

/// Convert a [`TrainingError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<TrainingError> for PyErr {
    fn from(err: TrainingError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
