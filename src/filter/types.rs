//! filter::types — shared numeric aliases for the EKF stack.
//!
//! Purpose
//! -------
//! Centralize the container types used by the estimator, the model trait,
//! and the reference networks so that the rest of the crate stays agnostic
//! to the concrete `ndarray` spelling.
//!
//! Conventions
//! -----------
//! - The parameter vector `θ` ([`ParamVec`]) is a flat `Array1<f64>` whose
//!   ordering is fixed by the model's layout.
//! - Batches ([`Batch`]) hold one example per row; outputs and targets are
//!   flattened row-major, so scalar `k` of a batch with `d` columns is
//!   `(k / d, k % d)`.
//! - [`Jacobian`] is `M × P`: row `k` is `∂ y_k / ∂ θ`.
use ndarray::{Array1, Array2, ArrayView2};

/// Flat parameter vector `θ` (the filter mean).
pub type ParamVec = Array1<f64>;

/// Gradient of one output scalar with respect to `θ`; same length as [`ParamVec`].
pub type Grad = Array1<f64>;

/// Dense `P × P` parameter covariance.
pub type Covariance = Array2<f64>;

/// Dense `M × P` observation Jacobian.
pub type Jacobian = Array2<f64>;

/// Batch of examples, one per row.
pub type Batch = Array2<f64>;

/// Borrowed batch of examples, one per row.
pub type BatchView<'a> = ArrayView2<'a, f64>;
