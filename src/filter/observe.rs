//! filter::observe — per-update diagnostics and optional structured logging.
//!
//! [`UpdateStats`] is filled by every successful update and is always
//! available through `EkfEstimator::last_update`. When the `obs_slog`
//! feature is enabled, the estimator can also emit one slog record per
//! update ([`log_update`]) and per failure ([`log_failure`]), either to a
//! caller-supplied `slog::Logger` or to the non-blocking terminal logger
//! built by [`term_logger`] when `EkfOptions::verbose` is set.
#[cfg(feature = "obs_slog")]
use slog::{Drain, Logger, o};

#[cfg(feature = "obs_slog")]
use crate::filter::errors::EkfError;

/// Diagnostics of one committed predict+correct cycle.
///
/// - `update`: 1-based count of committed updates, including this one.
/// - `batch`: number of examples `N`.
/// - `m`: number of output scalars `M = N · output_dim`.
/// - `innovation_norm`: `‖target − output‖₂` before the correction.
/// - `trace_before` / `trace_after`: trace of the covariance after the
///   predict step and after the correct step.
/// - `cholesky`: `true` if `S` was factorized by Cholesky, `false` for LU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateStats {
    pub update: u64,
    pub batch: usize,
    pub m: usize,
    pub innovation_norm: f64,
    pub trace_before: f64,
    pub trace_after: f64,
    pub cholesky: bool,
}

/// Non-blocking terminal logger (stderr, full format, async drain that
/// drops records on overflow).
#[cfg(feature = "obs_slog")]
pub fn term_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain)
        .overflow_strategy(slog_async::OverflowStrategy::Drop)
        .build()
        .fuse();
    Logger::root(drain, o!("component" => "ekf"))
}

/// Emit one info record describing a committed update.
#[cfg(feature = "obs_slog")]
pub fn log_update(logger: &Logger, stats: &UpdateStats) {
    let solver = if stats.cholesky { "cholesky" } else { "lu" };
    slog::info!(logger, "ekf update";
        "update" => stats.update,
        "batch" => stats.batch,
        "m" => stats.m,
        "innovation_norm" => stats.innovation_norm,
        "trace_before" => stats.trace_before,
        "trace_after" => stats.trace_after,
        "solver" => solver
    );
}

/// Emit one warn record describing a rejected update.
#[cfg(feature = "obs_slog")]
pub fn log_failure(logger: &Logger, update: u64, err: &EkfError) {
    slog::warn!(logger, "ekf update rejected";
        "update" => update,
        "kind" => format!("{:?}", err.kind()),
        "error" => err.to_string()
    );
}
