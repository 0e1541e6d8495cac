//! Driver configuration for teacher/student training runs.
//!
//! [`DriverOptions`] fixes how many update calls to make, how many examples
//! each call sees, how often to evaluate on the held-out set, how large
//! that set is, and the RNG seed. [`scenario_ekf_options`] builds the
//! estimator options of the reference scenario
//! (`C₀ = 1e-5·I`, `q = 1e-8`, `r = 1e-5`).
use crate::{
    filter::{errors::EkfResult, traits::EkfOptions},
    training::errors::{TrainingError, TrainingResult},
};

/// Prior covariance scale of the reference scenario.
pub const SCENARIO_INIT_COVARIANCE: f64 = 1e-5;
/// Process noise scale of the reference scenario.
pub const SCENARIO_PROCESS_NOISE: f64 = 1e-8;
/// Observation noise scale of the reference scenario.
pub const SCENARIO_OBSERVATION_NOISE: f64 = 1e-5;

/// Teacher/student loop configuration.
///
/// - `loops`: number of `update` calls (> 0).
/// - `batch_size`: examples per call (> 0).
/// - `eval_every`: evaluate after every `eval_every` calls (> 0).
/// - `test_size`: held-out examples (> 0).
/// - `seed`: seed for inputs of both the held-out set and the training stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    pub loops: usize,
    pub batch_size: usize,
    pub eval_every: usize,
    pub test_size: usize,
    pub seed: u64,
}

impl DriverOptions {
    /// Create validated driver options.
    ///
    /// # Errors
    /// One of `InvalidLoops`, `InvalidBatchSize`, `InvalidEvalEvery`,
    /// `InvalidTestSize` for a zero count.
    pub fn new(
        loops: usize, batch_size: usize, eval_every: usize, test_size: usize, seed: u64,
    ) -> TrainingResult<Self> {
        const REASON: &str = "Must be greater than zero.";
        if loops == 0 {
            return Err(TrainingError::InvalidLoops { value: loops, reason: REASON });
        }
        if batch_size == 0 {
            return Err(TrainingError::InvalidBatchSize { value: batch_size, reason: REASON });
        }
        if eval_every == 0 {
            return Err(TrainingError::InvalidEvalEvery { value: eval_every, reason: REASON });
        }
        if test_size == 0 {
            return Err(TrainingError::InvalidTestSize { value: test_size, reason: REASON });
        }
        Ok(Self { loops, batch_size, eval_every, test_size, seed })
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self { loops: 1000, batch_size: 1, eval_every: 100, test_size: 100, seed: 0 }
    }
}

/// Estimator options of the reference scenario for a model with `p` parameters.
///
/// # Errors
/// Never fails for the built-in constants; the `Result` mirrors
/// [`EkfOptions::isotropic`].
pub fn scenario_ekf_options(p: usize) -> EkfResult<EkfOptions> {
    EkfOptions::isotropic(
        p,
        SCENARIO_INIT_COVARIANCE,
        SCENARIO_PROCESS_NOISE,
        SCENARIO_OBSERVATION_NOISE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Each zero count is reported by its own variant; the default is valid.
    fn zero_counts_are_rejected() {
        assert!(matches!(DriverOptions::new(0, 1, 1, 1, 0), Err(TrainingError::InvalidLoops { .. })));
        assert!(matches!(
            DriverOptions::new(1, 0, 1, 1, 0),
            Err(TrainingError::InvalidBatchSize { .. })
        ));
        assert!(matches!(
            DriverOptions::new(1, 1, 0, 1, 0),
            Err(TrainingError::InvalidEvalEvery { .. })
        ));
        assert!(matches!(
            DriverOptions::new(1, 1, 1, 0, 0),
            Err(TrainingError::InvalidTestSize { .. })
        ));
        let d = DriverOptions::default();
        assert_eq!(DriverOptions::new(d.loops, d.batch_size, d.eval_every, d.test_size, d.seed), Ok(d));
    }

    #[test]
    fn scenario_options_use_reference_constants() {
        let opts = scenario_ekf_options(4).unwrap();
        assert_eq!(opts.dim(), 4);
        assert_eq!(opts.initial_covariance[[2, 2]], 1e-5);
        assert_eq!(opts.process_noise_scale, 1e-8);
        assert_eq!(opts.observation_noise_scale, 1e-5);
    }
}
