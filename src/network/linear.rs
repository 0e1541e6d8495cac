//! Affine model `y = W x + b`.
//!
//! [`LinearModel`] uses the same [`ParamLayout`] machinery as the MLP
//! (`weight` as `out × in`, then `bias` as `out × 1`). Its Jacobian does
//! not depend on the parameters, which makes it the reference model for
//! convergence checks of the filter: with `q = 0` the EKF reduces to
//! recursive least squares.
use ndarray::{Array1, Axis};

use crate::{
    filter::{
        traits::DifferentiableModel,
        types::{Batch, BatchView, Grad, ParamVec},
    },
    network::{
        errors::{ModelError, ModelResult},
        layout::ParamLayout,
    },
};

#[derive(Debug, Clone)]
pub struct LinearModel {
    input_dim: usize,
    output_dim: usize,
    layout: ParamLayout,
    params: Vec<f64>,
}

impl LinearModel {
    /// Zero-initialized `output_dim × input_dim` affine map.
    ///
    /// # Errors
    /// [`ModelError::InvalidLayerSizes`] if either dimension is zero.
    pub fn new(input_dim: usize, output_dim: usize) -> ModelResult<Self> {
        if input_dim == 0 || output_dim == 0 {
            return Err(ModelError::InvalidLayerSizes { reason: "Every layer size must be > 0." });
        }
        let mut layout = ParamLayout::new();
        layout.push("weight", output_dim, input_dim)?;
        layout.push("bias", output_dim, 1)?;
        let params = vec![0.0; layout.total_len()];
        Ok(Self { input_dim, output_dim, layout, params })
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }
}

impl DifferentiableModel for LinearModel {
    fn num_parameters(&self) -> usize {
        self.layout.total_len()
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }

    fn parameters(&self) -> ParamVec {
        Array1::from(self.params.clone())
    }

    fn set_parameters(&mut self, theta: &ParamVec) -> ModelResult<()> {
        self.layout.check_len(theta.len())?;
        if let Some((index, &value)) = theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ModelError::NonFiniteParameter { index, value });
        }
        self.params = theta.to_vec();
        Ok(())
    }

    fn forward(&mut self, inputs: BatchView<'_>) -> ModelResult<Batch> {
        if inputs.nrows() == 0 {
            return Err(ModelError::EmptyBatch);
        }
        if inputs.ncols() != self.input_dim {
            return Err(ModelError::InputDimMismatch { expected: self.input_dim, actual: inputs.ncols() });
        }
        let weight = self.layout.view(0, &self.params)?;
        let bias = self.layout.view(1, &self.params)?.index_axis_move(Axis(1), 0);
        let mut out = inputs.dot(&weight.t());
        out += &bias;
        Ok(out)
    }

    /// Row `k` is `x_n` in the weight block of output `j` and `1` in bias `j`,
    /// with `(n, j) = (k / output_dim, k % output_dim)`.
    fn output_gradient(&mut self, output_index: usize, inputs: BatchView<'_>) -> ModelResult<Grad> {
        let len = inputs.nrows() * self.output_dim;
        if output_index >= len {
            return Err(ModelError::OutputIndexOutOfRange { index: output_index, len });
        }
        if inputs.ncols() != self.input_dim {
            return Err(ModelError::InputDimMismatch { expected: self.input_dim, actual: inputs.ncols() });
        }
        let (n, j) = (output_index / self.output_dim, output_index % self.output_dim);
        let mut grad = vec![0.0; self.layout.total_len()];
        self.layout.view_mut(0, &mut grad)?.row_mut(j).assign(&inputs.row(n));
        self.layout.view_mut(1, &mut grad)?[[j, 0]] = 1.0;
        Ok(Array1::from(grad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Forward evaluation applies `W x + b` row by row.
    //
    // Given
    // -----
    // - W = [[1, 2], [0, −1]], b = [0.5, 3], inputs [[1, 1], [2, 0]].
    //
    // Expect
    // ------
    // - outputs [[3.5, 2], [2.5, 3]].
    fn forward_applies_affine_map() {
        // Arrange
        let mut model = LinearModel::new(2, 2).unwrap();
        model.set_parameters(&array![1.0, 2.0, 0.0, -1.0, 0.5, 3.0]).unwrap();

        // Act
        let out = model.forward(array![[1.0, 1.0], [2.0, 0.0]].view()).unwrap();

        // Assert
        assert_eq!(out, array![[3.5, 2.0], [2.5, 3.0]]);
    }

    #[test]
    // Purpose
    // -------
    // Jacobian rows select the input in the weight row of the addressed output.
    fn output_gradient_selects_weight_row_and_bias() {
        // Arrange
        let mut model = LinearModel::new(2, 2).unwrap();
        let inputs = array![[1.0, 1.0], [2.0, -3.0]];

        // Act
        let row = model.output_gradient(3, inputs.view()).unwrap();

        // Assert
        assert_eq!(row, array![0.0, 0.0, 2.0, -3.0, 0.0, 1.0]);
        assert!(matches!(
            model.output_gradient(4, inputs.view()),
            Err(ModelError::OutputIndexOutOfRange { index: 4, len: 4 })
        ));
    }
}
