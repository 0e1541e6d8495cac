//! training::run — teacher/student loop around [`EkfEstimator`].
//!
//! Purpose
//! -------
//! Train a student model online against a fixed teacher model of the same
//! input/output dimensions and record held-out error along the way.
//!
//! Key behaviors
//! -------------
//! - Inputs are drawn i.i.d. standard normal from a `StdRng` seeded with
//!   `DriverOptions::seed`; the held-out set is drawn first, then the
//!   training stream, so runs are reproducible.
//! - Targets are the teacher's outputs (no observation noise is added).
//! - A [`Checkpoint`] is recorded before the first update, after every
//!   `eval_every` updates, and after the last update.
//! - With `EkfOptions::verbose` and the `obs_slog` feature, one terminal
//!   logger reports every update and every checkpoint.
//!
//! Invariants & assumptions
//! ------------------------
//! - The teacher is only evaluated; its parameters never change.
//! - The student is trained in place: after a successful run its parameters
//!   are the filter mean.
//! - Any estimator error aborts the run and is returned as
//!   [`TrainingError::Ekf`].
use ndarray::Array2;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;

#[cfg(feature = "obs_slog")]
use crate::filter::observe::term_logger;
use crate::{
    filter::{
        estimator::EkfEstimator,
        traits::{DifferentiableModel, EkfOptions},
    },
    training::{
        errors::{TrainingError, TrainingResult},
        metrics::log10_mse,
        options::DriverOptions,
    },
};

/// Held-out error after a given number of updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    /// Committed updates so far (0 for the initial evaluation).
    pub update: usize,
    /// Training examples consumed so far.
    pub examples_seen: usize,
    pub log10_mse: f64,
}

/// Ordered checkpoints of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingTrace {
    pub checkpoints: Vec<Checkpoint>,
}

impl TrainingTrace {
    pub fn first(&self) -> Option<&Checkpoint> {
        self.checkpoints.first()
    }

    pub fn last(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    /// `first − last` in log10 units; positive when the student improved.
    pub fn improvement(&self) -> Option<f64> {
        Some(self.first()?.log10_mse - self.last()?.log10_mse)
    }
}

/// Train `student` against `teacher` for `driver.loops` update calls.
///
/// # Errors
/// - [`TrainingError::ArchitectureMismatch`] if input or output dims differ.
/// - [`TrainingError::Ekf`] for estimator construction or update errors.
/// - [`TrainingError::Model`] if the teacher fails to evaluate a batch.
pub fn run_teacher_student<T, S>(
    teacher: &mut T, student: &mut S, ekf_options: EkfOptions, driver: &DriverOptions,
) -> TrainingResult<TrainingTrace>
where
    T: DifferentiableModel + ?Sized,
    S: DifferentiableModel,
{
    let teacher_dims = (teacher.input_dim(), teacher.output_dim());
    let student_dims = (student.input_dim(), student.output_dim());
    if teacher_dims != student_dims {
        return Err(TrainingError::ArchitectureMismatch { teacher: teacher_dims, student: student_dims });
    }
    let (input_dim, _) = teacher_dims;

    let mut rng = StdRng::seed_from_u64(driver.seed);
    let x_test = sample_inputs(&mut rng, driver.test_size, input_dim);
    let y_test = teacher.forward(x_test.view())?;

    let reporter = Reporter::new(ekf_options.verbose);
    let mut ekf = reporter.attach(EkfEstimator::new(&mut *student, ekf_options.with_verbose(false))?);
    let mut trace = TrainingTrace::default();

    let checkpoint = evaluate(&mut ekf, &x_test, &y_test, 0, driver.batch_size)?;
    reporter.checkpoint(&checkpoint);
    trace.checkpoints.push(checkpoint);

    for update in 1..=driver.loops {
        let x = sample_inputs(&mut rng, driver.batch_size, input_dim);
        let y = teacher.forward(x.view())?;
        ekf.update(x.view(), y.view())?;
        if update % driver.eval_every == 0 || update == driver.loops {
            let checkpoint = evaluate(&mut ekf, &x_test, &y_test, update, driver.batch_size)?;
            reporter.checkpoint(&checkpoint);
            trace.checkpoints.push(checkpoint);
        }
    }
    Ok(trace)
}

/// `n × d` matrix of i.i.d. standard normal draws.
pub fn sample_inputs<R: Rng>(rng: &mut R, n: usize, d: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, d), |_| rng.sample(StandardNormal))
}

// ---- Helper methods ----

fn evaluate<M: DifferentiableModel>(
    ekf: &mut EkfEstimator<M>, x_test: &Array2<f64>, y_test: &Array2<f64>, update: usize,
    batch_size: usize,
) -> TrainingResult<Checkpoint> {
    let predictions = ekf.predict(x_test.view())?;
    Ok(Checkpoint {
        update,
        examples_seen: update * batch_size,
        log10_mse: log10_mse(&predictions, y_test)?,
    })
}

/// Checkpoint logging, active with `obs_slog` and `verbose`.
struct Reporter {
    #[cfg(feature = "obs_slog")]
    logger: Option<slog::Logger>,
}

impl Reporter {
    #[cfg(feature = "obs_slog")]
    fn new(verbose: bool) -> Self {
        Self { logger: if verbose { Some(term_logger()) } else { None } }
    }

    #[cfg(not(feature = "obs_slog"))]
    fn new(_verbose: bool) -> Self {
        Self {}
    }

    #[cfg(feature = "obs_slog")]
    fn attach<M: DifferentiableModel>(&self, ekf: EkfEstimator<M>) -> EkfEstimator<M> {
        match &self.logger {
            Some(logger) => ekf.with_logger(logger.clone()),
            None => ekf,
        }
    }

    #[cfg(not(feature = "obs_slog"))]
    fn attach<M: DifferentiableModel>(&self, ekf: EkfEstimator<M>) -> EkfEstimator<M> {
        ekf
    }

    #[cfg(feature = "obs_slog")]
    fn checkpoint(&self, checkpoint: &Checkpoint) {
        if let Some(logger) = &self.logger {
            slog::info!(logger, "checkpoint";
                "update" => checkpoint.update,
                "examples_seen" => checkpoint.examples_seen,
                "log10_mse" => checkpoint.log10_mse
            );
        }
    }

    #[cfg(not(feature = "obs_slog"))]
    fn checkpoint(&self, _checkpoint: &Checkpoint) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Activation, LinearModel, Mlp};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Checkpoint cadence and bookkeeping.
    // - Rejection of incompatible teacher/student pairs.
    // - Improvement of a linear student on a short run.
    //
    // They intentionally DO NOT cover:
    // - The full 5-10-10-5 scenario (see `tests/integration_ekf_pipeline.rs`).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Checkpoints land at 0, every `eval_every` updates, and at the end.
    //
    // Given
    // -----
    // - loops = 7, eval_every = 3, batch_size = 2.
    //
    // Expect
    // ------
    // - updates [0, 3, 6, 7], examples_seen [0, 6, 12, 14].
    fn checkpoint_cadence_includes_start_and_end() {
        // Arrange
        let mut teacher = LinearModel::new(2, 1).unwrap();
        teacher.set_parameters(&ndarray::array![1.0, -1.0, 0.5]).unwrap();
        let mut student = LinearModel::new(2, 1).unwrap();
        let options = EkfOptions::isotropic(3, 1.0, 0.0, 1e-2).unwrap();
        let driver = DriverOptions::new(7, 2, 3, 10, 42).unwrap();

        // Act
        let trace = run_teacher_student(&mut teacher, &mut student, options, &driver).unwrap();

        // Assert
        let updates: Vec<usize> = trace.checkpoints.iter().map(|c| c.update).collect();
        let seen: Vec<usize> = trace.checkpoints.iter().map(|c| c.examples_seen).collect();
        assert_eq!(updates, vec![0, 3, 6, 7]);
        assert_eq!(seen, vec![0, 6, 12, 14]);
        assert!(trace.improvement().unwrap() > 1.0);
    }

    #[test]
    fn incompatible_architectures_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut teacher = Mlp::random(&[3, 4, 2], Activation::Tanh, Activation::Identity, &mut rng).unwrap();
        let mut student = LinearModel::new(3, 1).unwrap();
        let options = EkfOptions::isotropic(4, 1.0, 0.0, 1.0).unwrap();

        let err = run_teacher_student(&mut teacher, &mut student, options, &DriverOptions::default())
            .unwrap_err();

        assert_eq!(err, TrainingError::ArchitectureMismatch { teacher: (3, 2), student: (3, 1) });
    }

    #[test]
    // Purpose
    // -------
    // Runs are reproducible for a fixed seed.
    fn same_seed_gives_same_trace() {
        let run = || {
            let mut rng = StdRng::seed_from_u64(9);
            let mut teacher =
                Mlp::random(&[2, 3, 1], Activation::Softsign, Activation::Identity, &mut rng).unwrap();
            let mut student =
                Mlp::random(&[2, 3, 1], Activation::Softsign, Activation::Identity, &mut rng).unwrap();
            let options = EkfOptions::isotropic(13, 1e-2, 1e-6, 1e-3).unwrap();
            let driver = DriverOptions::new(20, 1, 5, 16, 3).unwrap();
            run_teacher_student(&mut teacher, &mut student, options, &driver).unwrap()
        };

        assert_eq!(run(), run());
    }
}
