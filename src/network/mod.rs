//! Reference models for the EKF estimator.
//!
//! - [`layout`]: flat parameter layout over named tensors.
//! - [`activation`]: element-wise activations and their derivatives.
//! - [`mlp`]: fully connected network with reverse-mode per-output gradients.
//! - [`linear`]: affine model used for convergence checks.
//! - [`errors`]: [`ModelError`](errors::ModelError), shared by every model.
pub mod activation;
pub mod errors;
pub mod layout;
pub mod linear;
pub mod mlp;

pub use self::activation::Activation;
pub use self::errors::{ModelError, ModelResult};
pub use self::layout::{ParamLayout, TensorSlot};
pub use self::linear::LinearModel;
pub use self::mlp::Mlp;
