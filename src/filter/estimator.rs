//! filter::estimator — the EKF over a model's full parameter vector.
//!
//! Purpose
//! -------
//! Own the `P × P` parameter covariance and run one atomic predict+correct
//! cycle per call to [`EkfEstimator::update`], treating every observed
//! `(inputs, targets)` batch as a noisy measurement of the parameters.
//!
//! Key behaviors
//! -------------
//! - Predict: `C_pred = C + q·I(P)`.
//! - Linearize: forward pass on the batch (`M = N · output_dim` output
//!   scalars) and one Jacobian row per output scalar.
//! - Correct, in gain-free solve form with `A = H·C_pred` and
//!   `S = A·Hᵀ + r·I(M)`:
//!   `θ' = θ + Aᵀ·S⁻¹·e` and `C' = C_pred − Aᵀ·S⁻¹·A`, where each `S⁻¹·(·)`
//!   is a solve against one factorization of `S`.
//! - `C'` is symmetrized before commit.
//!
//! Invariants & assumptions
//! ------------------------
//! - The mean is the model's live parameter vector; it is read at the start
//!   of every update and written back only at commit.
//! - Updates are transactional: every candidate is computed into scratch
//!   storage, checked for finiteness, and only then committed (parameters
//!   first, covariance second). On any error both are left exactly as they
//!   were before the call.
//! - After every committed update the covariance is exactly symmetric.
//!
//! Conventions
//! -----------
//! - Outputs and targets are flattened row-major: `k = n · output_dim + j`.
//! - `q` and `r` are finite and `≥ 0`; a very large `r` effectively turns
//!   the correction off.
//!
//! Downstream usage
//! ----------------
//! - Build [`EkfOptions`] (e.g. with [`EkfOptions::isotropic`]), wrap a
//!   model (or `&mut model`) in [`EkfEstimator::new`], and call
//!   [`EkfEstimator::update`] per example or mini-batch.
//! - After a [`EkfError::NonFiniteResult`], either stop or call
//!   [`EkfEstimator::reset_covariance`] and continue.
use ndarray::{Array1, Axis};

#[cfg(feature = "obs_slog")]
use crate::filter::observe::{log_failure, log_update, term_logger};
use crate::{
    filter::{
        errors::{EkfError, EkfResult, UpdatePhase},
        jacobian::assemble_jacobian,
        linalg::{InnovationSolver, add_scaled_identity, symmetrize},
        observe::UpdateStats,
        traits::{DifferentiableModel, EkfOptions},
        types::{Batch, BatchView, Covariance, ParamVec},
        validation::{
            ensure_finite, validate_batches, validate_covariance, validate_output_shape,
            verify_noise_scale,
        },
    },
    network::errors::ModelError,
};

/// Extended Kalman filter over the parameters of a [`DifferentiableModel`].
pub struct EkfEstimator<M: DifferentiableModel> {
    model: M,
    covariance: Covariance,
    options: EkfOptions,
    p: usize,
    updates: u64,
    last: Option<UpdateStats>,
    #[cfg(feature = "obs_slog")]
    logger: Option<slog::Logger>,
}

impl<M: DifferentiableModel> EkfEstimator<M> {
    /// Build an estimator for `model` with prior covariance and noise scales
    /// from `options`.
    ///
    /// # Errors
    /// - [`EkfError::InvalidNoiseScale`] for a negative or non-finite `q`/`r`.
    /// - [`EkfError::CovarianceShapeMismatch`] if the initial covariance is
    ///   not `P × P` for `P = model.num_parameters()`.
    /// - [`EkfError::NonFiniteCovariance`] for NaN/±inf entries.
    /// - [`EkfError::Model`] (phase `ReadParameters`) if the model reports a
    ///   parameter vector whose length is not `P`.
    /// - [`EkfError::NonFiniteResult`] if the current parameters are not finite.
    pub fn new(model: M, options: EkfOptions) -> EkfResult<Self> {
        verify_noise_scale("process noise scale", options.process_noise_scale)?;
        verify_noise_scale("observation noise scale", options.observation_noise_scale)?;
        let p = model.num_parameters();
        validate_covariance(&options.initial_covariance, p)?;
        let theta = read_parameters(&model, p)?;
        ensure_finite("mean", &theta)?;

        #[cfg(feature = "obs_slog")]
        let logger = if options.verbose { Some(term_logger()) } else { None };

        Ok(Self {
            model,
            covariance: options.initial_covariance.clone(),
            options,
            p,
            updates: 0,
            last: None,
            #[cfg(feature = "obs_slog")]
            logger,
        })
    }

    /// Attach a caller-supplied logger; replaces the terminal logger
    /// installed by `verbose`.
    #[cfg(feature = "obs_slog")]
    pub fn with_logger(mut self, logger: slog::Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Run one predict+correct cycle on an `N × input_dim` input batch and
    /// its `N × output_dim` targets.
    ///
    /// # Errors
    /// - Dimension errors ([`EkfError::EmptyBatch`], [`EkfError::BatchLengthMismatch`],
    ///   [`EkfError::InputDimMismatch`], [`EkfError::TargetDimMismatch`],
    ///   [`EkfError::OutputShapeMismatch`], [`EkfError::GradientDimMismatch`]).
    /// - [`EkfError::NonFiniteResult`] for NaN/±inf inputs or targets.
    /// - [`EkfError::SingularInnovation`] if `S` cannot be factorized.
    /// - [`EkfError::NonFiniteResult`] if the innovation, Jacobian, candidate
    ///   mean, or candidate covariance contains NaN/±inf.
    /// - [`EkfError::Model`] for errors raised by the model.
    ///
    /// On error, the covariance and the model parameters are unchanged.
    pub fn update(&mut self, inputs: BatchView<'_>, targets: BatchView<'_>) -> EkfResult<UpdateStats> {
        let result = self.try_update(inputs, targets);
        if let Ok(stats) = &result {
            self.updates = stats.update;
            self.last = Some(*stats);
        }
        self.observe(&result);
        result
    }

    /// Forward `inputs` through the model at the current mean without
    /// touching the filter state.
    ///
    /// # Errors
    /// - [`EkfError::EmptyBatch`] / [`EkfError::InputDimMismatch`] for bad inputs.
    /// - [`EkfError::Model`] (phase `Forward`) for model errors.
    pub fn predict(&mut self, inputs: BatchView<'_>) -> EkfResult<Batch> {
        if inputs.nrows() == 0 {
            return Err(EkfError::EmptyBatch);
        }
        let input_dim = self.model.input_dim();
        if inputs.ncols() != input_dim {
            return Err(EkfError::InputDimMismatch { expected: input_dim, actual: inputs.ncols() });
        }
        self.model.forward(inputs).map_err(EkfError::in_phase(UpdatePhase::Forward))
    }

    /// Replace the covariance with a validated `P × P` matrix.
    ///
    /// This is the recovery path after [`EkfError::NonFiniteResult`]; the
    /// mean and the update counter are kept.
    ///
    /// # Errors
    /// [`EkfError::CovarianceShapeMismatch`] / [`EkfError::NonFiniteCovariance`].
    pub fn reset_covariance(&mut self, covariance: Covariance) -> EkfResult<()> {
        validate_covariance(&covariance, self.p)?;
        self.covariance = covariance;
        Ok(())
    }

    // ---- Accessors ----

    pub fn num_parameters(&self) -> usize {
        self.p
    }

    /// Current mean, i.e. the model's live parameter vector.
    pub fn mean(&self) -> Array1<f64> {
        self.model.parameters()
    }

    pub fn covariance(&self) -> &Covariance {
        &self.covariance
    }

    pub fn covariance_trace(&self) -> f64 {
        self.covariance.diag().sum()
    }

    pub fn options(&self) -> &EkfOptions {
        &self.options
    }

    /// Number of committed updates.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Diagnostics of the most recent committed update.
    pub fn last_update(&self) -> Option<&UpdateStats> {
        self.last.as_ref()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    // ---- Helper methods ----

    fn try_update(&mut self, inputs: BatchView<'_>, targets: BatchView<'_>) -> EkfResult<UpdateStats> {
        let p = self.p;
        validate_batches(inputs, targets, self.model.input_dim(), self.model.output_dim())?;
        let theta = read_parameters(&self.model, p)?;

        // ---- Predict ----
        let mut c_pred = self.covariance.clone();
        add_scaled_identity(&mut c_pred, self.options.process_noise_scale);
        let trace_before = c_pred.diag().sum();

        // ---- Evaluate & linearize ----
        let output = self.model.forward(inputs).map_err(EkfError::in_phase(UpdatePhase::Forward))?;
        validate_output_shape(output.view(), targets)?;
        let m = output.len();
        let h = assemble_jacobian(&mut self.model, inputs, &theta, m)?;

        // ---- Innovation ----
        let error = Array1::from_iter(targets.iter().zip(output.iter()).map(|(t, y)| t - y));
        ensure_finite("innovation", &error)?;

        // ---- Correct ----
        let hc = h.dot(&c_pred);
        let mut s = hc.dot(&h.t());
        add_scaled_identity(&mut s, self.options.observation_noise_scale);
        symmetrize(&mut s);
        let solver = InnovationSolver::factorize(&s)?;

        let u = solver.solve(&error.view().insert_axis(Axis(1)))?;
        let new_theta = &theta + &hc.t().dot(&u.column(0));

        let v = solver.solve(&hc)?;
        let mut c_new = c_pred - hc.t().dot(&v);
        symmetrize(&mut c_new);

        // ---- Commit ----
        ensure_finite("mean", &new_theta)?;
        ensure_finite("covariance", &c_new)?;
        self.model
            .set_parameters(&new_theta)
            .map_err(EkfError::in_phase(UpdatePhase::Commit))?;
        let trace_after = c_new.diag().sum();
        self.covariance = c_new;

        Ok(UpdateStats {
            update: self.updates + 1,
            batch: inputs.nrows(),
            m,
            innovation_norm: error.dot(&error).sqrt(),
            trace_before,
            trace_after,
            cholesky: solver.is_cholesky(),
        })
    }

    #[cfg(feature = "obs_slog")]
    fn observe(&self, result: &EkfResult<UpdateStats>) {
        if let Some(logger) = &self.logger {
            match result {
                Ok(stats) => log_update(logger, stats),
                Err(err) => log_failure(logger, self.updates + 1, err),
            }
        }
    }

    #[cfg(not(feature = "obs_slog"))]
    fn observe(&self, _result: &EkfResult<UpdateStats>) {}
}

/// Read the model's parameter vector (the filter mean) and check it has length `p`.
fn read_parameters<M: DifferentiableModel>(model: &M, p: usize) -> EkfResult<ParamVec> {
    let theta = model.parameters();
    if theta.len() != p {
        return Err(EkfError::Model {
            phase: UpdatePhase::ReadParameters,
            source: ModelError::ParameterLengthMismatch { expected: p, actual: theta.len() },
        });
    }
    Ok(theta)
}
