//! filter::jacobian — observation Jacobian assembly.
//!
//! Purpose
//! -------
//! Build the `M × P` Jacobian `H` of the flattened model output with
//! respect to the full parameter vector, one row per output scalar.
//!
//! Key behaviors
//! -------------
//! - [`assemble_jacobian`] asks the model for the gradient of each output
//!   scalar of the most recent forward pass. Each call yields a full
//!   `P`-length row, so the cost scales with `M`, not with `P`.
//! - If the model reports [`ModelError::GradientNotImplemented`] for the
//!   first row, the whole Jacobian is built by [`fd_jacobian`] instead.
//! - Every row is validated for length and finiteness.
//!
//! Invariants & assumptions
//! ------------------------
//! - The caller has run `forward` on the same batch immediately before, at
//!   the parameters passed as `theta`.
//! - [`fd_jacobian`] perturbs the model's live parameters; they are always
//!   restored to `theta` before returning, on success and on failure.
//!
//! Conventions
//! -----------
//! - Row `k` corresponds to output `(k / output_dim, k % output_dim)`.
//! - Finite differences use forward steps of `sqrt(ε)` from `finitediff`;
//!   each row costs `P + 1` forward passes and carries `O(sqrt(ε))` error,
//!   so the fallback is meant for small models only.
use std::cell::RefCell;

use finitediff::FiniteDiff;

use crate::{
    filter::{
        errors::{EkfError, EkfResult, UpdatePhase},
        traits::DifferentiableModel,
        types::{BatchView, Grad, Jacobian, ParamVec},
        validation::validate_grad,
    },
    network::errors::{ModelError, ModelResult},
};

/// Assemble the `m × theta.len()` Jacobian at `theta`.
///
/// # Errors
/// - [`EkfError::GradientDimMismatch`] / [`EkfError::NonFiniteResult`] for
///   invalid rows.
/// - [`EkfError::Model`] (phase `Linearize`) for any model error other than
///   `GradientNotImplemented` on the first row.
pub fn assemble_jacobian<M: DifferentiableModel + ?Sized>(
    model: &mut M, inputs: BatchView<'_>, theta: &ParamVec, m: usize,
) -> EkfResult<Jacobian> {
    let p = theta.len();
    let mut jac = Jacobian::zeros((m, p));
    for k in 0..m {
        match model.output_gradient(k, inputs) {
            Ok(row) => {
                validate_grad(k, &row, p)?;
                jac.row_mut(k).assign(&row);
            }
            Err(ModelError::GradientNotImplemented) if k == 0 => {
                return fd_jacobian(model, inputs, theta, m);
            }
            Err(source) => return Err(EkfError::Model { phase: UpdatePhase::Linearize, source }),
        }
    }
    Ok(jac)
}

/// Forward-difference Jacobian at `theta`, one `finitediff` gradient per row.
///
/// Model errors raised inside the difference closure are captured in a
/// shared cell (the closure itself must return `f64`) and surfaced after
/// the row has been computed. The model's parameters are reset to `theta`
/// before returning.
///
/// # Errors
/// - [`EkfError::Model`] (phase `Linearize`) for captured model errors or a
///   failed restore.
/// - Row validation errors as in [`assemble_jacobian`].
pub fn fd_jacobian<M: DifferentiableModel + ?Sized>(
    model: &mut M, inputs: BatchView<'_>, theta: &ParamVec, m: usize,
) -> EkfResult<Jacobian> {
    let p = theta.len();
    let cell = RefCell::new(&mut *model);
    let closure_err: RefCell<Option<ModelError>> = RefCell::new(None);

    let rows: EkfResult<Jacobian> = (|| {
        let mut jac = Jacobian::zeros((m, p));
        for k in 0..m {
            let output_k = |t: &ParamVec| -> f64 {
                let mut guard = cell.borrow_mut();
                match eval_output_scalar(&mut **guard, t, inputs, k) {
                    Ok(value) => value,
                    Err(err) => {
                        closure_err.borrow_mut().get_or_insert(err);
                        f64::NAN
                    }
                }
            };
            let row = run_fd_row(theta, &output_k, &closure_err)?;
            validate_grad(k, &row, p)?;
            jac.row_mut(k).assign(&row);
        }
        Ok(jac)
    })();

    let model = cell.into_inner();
    model
        .set_parameters(theta)
        .map_err(EkfError::in_phase(UpdatePhase::Linearize))?;
    rows
}

// ---- Helper methods ----

/// Forward-difference gradient of one scalar closure, surfacing any error
/// the closure recorded in `closure_err`.
fn run_fd_row<G: Fn(&ParamVec) -> f64>(
    theta: &ParamVec, func: &G, closure_err: &RefCell<Option<ModelError>>,
) -> EkfResult<Grad> {
    closure_err.replace(None);
    let row = theta.forward_diff(func);
    if let Some(source) = closure_err.take() {
        return Err(EkfError::Model { phase: UpdatePhase::Linearize, source });
    }
    Ok(row)
}

fn eval_output_scalar<M: DifferentiableModel + ?Sized>(
    model: &mut M, theta: &ParamVec, inputs: BatchView<'_>, k: usize,
) -> ModelResult<f64> {
    model.set_parameters(theta)?;
    let out = model.forward(inputs)?;
    let width = out.ncols().max(1);
    if k >= out.len() {
        return Err(ModelError::OutputIndexOutOfRange { index: k, len: out.len() });
    }
    Ok(out[[k / width, k % width]])
}
