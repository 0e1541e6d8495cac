//! EKF estimation of a model's full parameter vector.
//!
//! Main entry points:
//! - [`EkfEstimator`]: owns the parameter covariance and runs one
//!   predict+correct cycle per `update`.
//! - [`DifferentiableModel`]: trait the trained model implements.
//! - [`EkfOptions`]: validated prior covariance and noise scales.
//!
//! Submodules:
//! - `errors`: [`EkfError`], [`EkfErrorKind`], [`UpdatePhase`].
//! - `jacobian`: Jacobian assembly with a finite-difference fallback.
//! - `linalg`: Cholesky/LU solves and symmetrization.
//! - `observe`: [`UpdateStats`] and optional slog records.
//! - `types`, `validation`: shared aliases and checks.
pub mod errors;
pub mod estimator;
pub mod jacobian;
pub mod linalg;
pub mod observe;
pub mod traits;
pub mod types;
pub mod validation;

pub use self::errors::{EkfError, EkfErrorKind, EkfResult, UpdatePhase};
pub use self::estimator::EkfEstimator;
pub use self::observe::UpdateStats;
pub use self::traits::{DifferentiableModel, EkfOptions};
pub use self::types::{Batch, BatchView, Covariance, Grad, Jacobian, ParamVec};

/// Convenience imports for driving an estimator.
pub mod prelude {
    pub use super::{
        DifferentiableModel, EkfError, EkfErrorKind, EkfEstimator, EkfOptions, EkfResult,
        UpdateStats,
    };
}
