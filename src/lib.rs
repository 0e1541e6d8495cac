//! ekf_train — online training of differentiable models with an Extended
//! Kalman Filter over the full parameter vector.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and, behind the
//! `python-bindings` feature, as the PyO3 bridge that exposes a trained
//! feed-forward network to Python via the `_ekf_train` extension module.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules: `filter` (the estimator and the model
//!   trait), `network` (reference models), and `training` (teacher/student
//!   driver).
//! - Define the `EkfNetwork` `#[pyclass]`, which pairs a randomly
//!   initialized [`network::Mlp`] with an [`filter::EkfEstimator`].
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work is implemented in the inner Rust modules; this file
//!   performs only FFI glue, input conversion, and error mapping.
//! - Errors from core Rust code are converted to Python `ValueError`s at the
//!   PyO3 boundary.
//!
//! Conventions
//! -----------
//! - Batches are 2-D, one example per row, on both sides of the boundary.
//! - Noise scales and the prior covariance scale follow the reference
//!   scenario defaults (`1e-8`, `1e-5`, `1e-5`) unless overridden.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on `filter`, `network`, and `training`
//!   directly and can ignore the PyO3 items.
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules and by the
//!   end-to-end tests in `tests/`.

pub mod filter;
pub mod network;
pub mod training;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::prelude::*;

#[cfg(feature = "python-bindings")]
use rand::{SeedableRng, rngs::StdRng};

#[cfg(feature = "python-bindings")]
use crate::{
    filter::{DifferentiableModel, EkfEstimator, EkfOptions},
    network::Mlp,
    utils::{extract_f64_matrix, parse_activation},
};

/// EkfNetwork — Python-facing feed-forward network trained by an EKF.
///
/// Purpose
/// -------
/// Let Python callers train an [`Mlp`] online, one example or mini-batch
/// at a time, with every computation forwarded to [`EkfEstimator`].
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `EkfNetwork(sizes, hidden='softsign', output='identity', init_cov=1e-5,
/// process_noise=1e-8, obs_noise=1e-5, seed=0, verbose=False)`:
/// - `sizes`: layer sizes `[d0, ..., dL]`, at least two, all > 0.
/// - `hidden`, `output`: activation names (`identity`, `softsign`, `tanh`, `relu`).
/// - `init_cov`: prior covariance scale, `C₀ = init_cov · I`.
/// - `process_noise`, `obs_noise`: `q` and `r`, finite and ≥ 0.
/// - `seed`: seed of the uniform `±1/sqrt(fan_in)` initialization.
/// - `verbose`: log every update to stderr (requires `obs_slog`).
#[cfg(feature = "python-bindings")]
#[pyclass(module = "ekf_train", unsendable)]
pub struct EkfNetwork {
    inner: EkfEstimator<Mlp>,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl EkfNetwork {
    #[new]
    #[pyo3(
        signature = (
            sizes,
            hidden = "softsign",
            output = "identity",
            init_cov = 1e-5,
            process_noise = 1e-8,
            obs_noise = 1e-5,
            seed = 0,
            verbose = false,
        ),
        text_signature = "(sizes, /, hidden='softsign', output='identity', init_cov=1e-5, \
                          process_noise=1e-8, obs_noise=1e-5, seed=0, verbose=False)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sizes: Vec<usize>, hidden: &str, output: &str, init_cov: f64, process_noise: f64,
        obs_noise: f64, seed: u64, verbose: bool,
    ) -> PyResult<EkfNetwork> {
        let hidden = parse_activation(hidden)?;
        let output = parse_activation(output)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mlp = Mlp::random(&sizes, hidden, output, &mut rng)?;
        let options =
            EkfOptions::isotropic(mlp.num_parameters(), init_cov, process_noise, obs_noise)?
                .with_verbose(verbose);
        let inner = EkfEstimator::new(mlp, options)?;
        Ok(EkfNetwork { inner })
    }

    /// Run one EKF update on `(inputs, targets)` and return the innovation
    /// norm `‖targets − outputs‖₂` measured before the correction.
    #[pyo3(text_signature = "(self, inputs, targets, /)")]
    pub fn update<'py>(
        &mut self, inputs: &Bound<'py, PyAny>, targets: &Bound<'py, PyAny>,
    ) -> PyResult<f64> {
        let x = extract_f64_matrix(inputs)?;
        let y = extract_f64_matrix(targets)?;
        let stats = self.inner.update(x.view(), y.view())?;
        Ok(stats.innovation_norm)
    }

    /// Network outputs for `inputs` at the current parameters (row-major).
    #[pyo3(text_signature = "(self, inputs, /)")]
    pub fn predict<'py>(&mut self, inputs: &Bound<'py, PyAny>) -> PyResult<Vec<Vec<f64>>> {
        let x = extract_f64_matrix(inputs)?;
        let out = self.inner.predict(x.view())?;
        Ok(out.rows().into_iter().map(|row| row.to_vec()).collect())
    }

    #[getter]
    pub fn parameters(&self) -> Vec<f64> {
        self.inner.mean().to_vec()
    }

    #[getter]
    pub fn covariance_trace(&self) -> f64 {
        self.inner.covariance_trace()
    }

    #[getter]
    pub fn num_parameters(&self) -> usize {
        self.inner.num_parameters()
    }

    #[getter]
    pub fn updates(&self) -> u64 {
        self.inner.updates()
    }
}

/// Module initializer for the `_ekf_train` extension.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _ekf_train<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<EkfNetwork>()?;
    Ok(())
}
