//! Teacher/student training driver.
//!
//! - [`options`]: [`DriverOptions`] and the reference scenario's estimator options.
//! - [`run`]: [`run_teacher_student`], which returns a [`TrainingTrace`].
//! - [`metrics`]: held-out error metrics.
//! - [`errors`]: [`TrainingError`].
pub mod errors;
pub mod metrics;
pub mod options;
pub mod run;

pub use self::errors::{TrainingError, TrainingResult};
pub use self::options::{DriverOptions, scenario_ekf_options};
pub use self::run::{Checkpoint, TrainingTrace, run_teacher_student, sample_inputs};
