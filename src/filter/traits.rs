//! Public API surface for EKF training.
//!
//! - [`DifferentiableModel`]: trait users implement for their model.
//! - [`EkfOptions`]: validated configuration for the estimator.
//!
//! Convention: the filter mean *is* the model's live parameter vector. The
//! estimator reads it through [`DifferentiableModel::parameters`] at the
//! start of every update and writes the corrected mean back through
//! [`DifferentiableModel::set_parameters`] only once the whole update has
//! succeeded.
use ndarray::Array2;

use crate::{
    filter::{
        errors::EkfResult,
        types::{Batch, BatchView, Covariance, Grad, ParamVec},
        validation::{validate_covariance, verify_noise_scale},
    },
    network::errors::{ModelError, ModelResult},
};

/// User-implemented differentiable model interface.
///
/// A model maps an `N × input_dim` batch to an `N × output_dim` batch using
/// a flat parameter vector of fixed length `P`.
///
/// Required:
/// - `num_parameters`, `input_dim`, `output_dim`: fixed sizes.
/// - `parameters() -> ParamVec`: the current flat parameters, in layout order.
/// - `set_parameters(&ParamVec)`: overwrite the flat parameters, same order.
/// - `forward(BatchView) -> Batch`: evaluate the batch at the current
///   parameters; may cache intermediates for gradient evaluation.
///
/// Optional:
/// - `output_gradient(k, BatchView) -> Grad`: gradient of flattened output
///   scalar `k` of the most recent forward pass with respect to all `P`
///   parameters. If not implemented, the estimator builds the Jacobian with
///   finite differences.
pub trait DifferentiableModel {
    // Required methods
    fn num_parameters(&self) -> usize;
    fn input_dim(&self) -> usize;
    fn output_dim(&self) -> usize;
    fn parameters(&self) -> ParamVec;
    fn set_parameters(&mut self, theta: &ParamVec) -> ModelResult<()>;
    fn forward(&mut self, inputs: BatchView<'_>) -> ModelResult<Batch>;

    // Optional methods
    fn output_gradient(&mut self, _output_index: usize, _inputs: BatchView<'_>) -> ModelResult<Grad> {
        Err(ModelError::GradientNotImplemented)
    }
}

impl<M: DifferentiableModel + ?Sized> DifferentiableModel for &mut M {
    fn num_parameters(&self) -> usize {
        (**self).num_parameters()
    }

    fn input_dim(&self) -> usize {
        (**self).input_dim()
    }

    fn output_dim(&self) -> usize {
        (**self).output_dim()
    }

    fn parameters(&self) -> ParamVec {
        (**self).parameters()
    }

    fn set_parameters(&mut self, theta: &ParamVec) -> ModelResult<()> {
        (**self).set_parameters(theta)
    }

    fn forward(&mut self, inputs: BatchView<'_>) -> ModelResult<Batch> {
        (**self).forward(inputs)
    }

    fn output_gradient(&mut self, output_index: usize, inputs: BatchView<'_>) -> ModelResult<Grad> {
        (**self).output_gradient(output_index, inputs)
    }
}

/// Estimator-level configuration.
///
/// Fields:
/// - `initial_covariance: Covariance` — `P × P` prior covariance of `θ`,
///   typically a scaled identity.
/// - `process_noise_scale: f64` — `q`; `q·I(P)` is added in every predict step.
/// - `observation_noise_scale: f64` — `r`; `r·I(M)` is added to the
///   innovation covariance.
/// - `verbose: bool` — if `true`, attaches a terminal logger (behind the
///   `obs_slog` feature) that reports every update.
///
/// The shape of `initial_covariance` is checked against the model when the
/// estimator is built; the noise scales are checked here.
#[derive(Debug, Clone, PartialEq)]
pub struct EkfOptions {
    pub initial_covariance: Covariance,
    pub process_noise_scale: f64,
    pub observation_noise_scale: f64,
    pub verbose: bool,
}

impl EkfOptions {
    /// Create validated options.
    ///
    /// # Errors
    /// - [`InvalidNoiseScale`] if a noise scale is negative or non-finite.
    /// - [`CovarianceShapeMismatch`] if `initial_covariance` is not square.
    /// - [`NonFiniteCovariance`] if it contains NaN/±inf.
    ///
    /// [`InvalidNoiseScale`]: crate::filter::errors::EkfError::InvalidNoiseScale
    /// [`CovarianceShapeMismatch`]: crate::filter::errors::EkfError::CovarianceShapeMismatch
    /// [`NonFiniteCovariance`]: crate::filter::errors::EkfError::NonFiniteCovariance
    pub fn new(
        initial_covariance: Covariance, process_noise_scale: f64, observation_noise_scale: f64,
        verbose: bool,
    ) -> EkfResult<Self> {
        verify_noise_scale("process noise scale", process_noise_scale)?;
        verify_noise_scale("observation noise scale", observation_noise_scale)?;
        validate_covariance(&initial_covariance, initial_covariance.nrows())?;
        Ok(Self { initial_covariance, process_noise_scale, observation_noise_scale, verbose })
    }

    /// Options with an isotropic prior `init_scale · I(p)`.
    ///
    /// # Errors
    /// - [`InvalidNoiseScale`] for invalid `q`/`r`, or for a negative or
    ///   non-finite `init_scale` (reported as "initial covariance scale").
    ///
    /// [`InvalidNoiseScale`]: crate::filter::errors::EkfError::InvalidNoiseScale
    pub fn isotropic(p: usize, init_scale: f64, q: f64, r: f64) -> EkfResult<Self> {
        verify_noise_scale("initial covariance scale", init_scale)?;
        let initial_covariance = Array2::<f64>::eye(p) * init_scale;
        Self::new(initial_covariance, q, r, false)
    }

    /// Same options with the `verbose` flag set to `verbose`.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Dimension `P` the covariance was built for.
    pub fn dim(&self) -> usize {
        self.initial_covariance.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::errors::{EkfError, EkfErrorKind};

    #[test]
    // Purpose
    // -------
    // `isotropic` should build a scaled identity with the requested noise scales.
    //
    // Given
    // -----
    // - p = 3, init_scale = 1e-5, q = 1e-8, r = 1e-5.
    //
    // Expect
    // ------
    // - A 3x3 diagonal covariance with 1e-5 on the diagonal and zeros elsewhere.
    fn isotropic_builds_scaled_identity() {
        // Act
        let opts = EkfOptions::isotropic(3, 1e-5, 1e-8, 1e-5).unwrap();

        // Assert
        assert_eq!(opts.dim(), 3);
        assert_eq!(opts.initial_covariance[[1, 1]], 1e-5);
        assert_eq!(opts.initial_covariance[[0, 2]], 0.0);
        assert_eq!(opts.process_noise_scale, 1e-8);
        assert!(!opts.verbose);
    }

    #[test]
    // Purpose
    // -------
    // Negative or non-finite noise scales are configuration errors.
    fn negative_or_nan_noise_is_rejected() {
        // Arrange
        let cov = Array2::<f64>::eye(2);

        // Act
        let neg_q = EkfOptions::new(cov.clone(), -1.0, 1.0, false);
        let nan_r = EkfOptions::new(cov, 0.0, f64::NAN, false);

        // Assert
        assert_eq!(neg_q.unwrap_err().kind(), EkfErrorKind::InvalidConfiguration);
        assert_eq!(nan_r.unwrap_err().kind(), EkfErrorKind::InvalidConfiguration);
    }

    #[test]
    // Purpose
    // -------
    // A non-square initial covariance is rejected before any model is involved.
    fn non_square_covariance_is_rejected() {
        // Arrange
        let cov = Array2::<f64>::zeros((2, 3));

        // Act
        let err = EkfOptions::new(cov, 0.0, 1.0, false).unwrap_err();

        // Assert
        assert_eq!(err, EkfError::CovarianceShapeMismatch { expected: 2, found: (2, 3) });
    }
}
