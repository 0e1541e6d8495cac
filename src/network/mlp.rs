//! network::mlp — fully connected feed-forward network with exact
//! per-output gradients.
//!
//! Purpose
//! -------
//! Provide the reference [`DifferentiableModel`]: a multilayer perceptron
//! whose parameters live in one flat vector laid out by [`ParamLayout`],
//! and whose Jacobian rows are computed by reverse mode, one backward pass
//! per output scalar.
//!
//! Key behaviors
//! -------------
//! - [`Mlp::new`] validates layer sizes and builds the layout
//!   (`layer{i}.weight` then `layer{i}.bias` for each layer `i`).
//! - [`Mlp::random`] draws every parameter uniformly in `±1/sqrt(fan_in)`.
//! - `forward` caches pre-activations and activations of the batch it was
//!   called with; `output_gradient` reuses that cache and seeds a one-hot
//!   cotangent at output `(k / output_dim, k % output_dim)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `sizes.len() ≥ 2` and every size is `> 0`.
//! - Hidden layers use the hidden activation; the last layer uses the
//!   output activation.
//! - `set_parameters` drops the forward cache, so gradients are always
//!   evaluated at the parameters the cached forward pass used.
//! - The cache matches a batch by shape and bit pattern, so a batch holding
//!   NaN still matches the forward pass it came from.
//!
//! Conventions
//! -----------
//! - Weights are `out × in`, so a layer computes `z = a·Wᵀ + b` on a
//!   row-per-example batch.
//! - Parameter count: `Σ_i (d_i · d_{i+1} + d_{i+1})`; a 5-10-10-5 network
//!   has 225 parameters.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;

use crate::{
    filter::{
        traits::DifferentiableModel,
        types::{Batch, BatchView, Grad, ParamVec},
    },
    network::{
        activation::Activation,
        errors::{ModelError, ModelResult},
        layout::ParamLayout,
    },
};

/// Intermediates of the most recent forward pass.
#[derive(Debug, Clone)]
struct ForwardCache {
    inputs: Batch,
    /// Pre-activation `z_i` of each layer, `N × d_{i+1}`.
    pre: Vec<Batch>,
    /// Activation `a_{i+1} = φ(z_i)` of each layer, `N × d_{i+1}`.
    post: Vec<Batch>,
}

/// Multilayer perceptron over a flat parameter vector.
#[derive(Debug, Clone)]
pub struct Mlp {
    sizes: Vec<usize>,
    hidden: Activation,
    output: Activation,
    layout: ParamLayout,
    params: Vec<f64>,
    cache: Option<ForwardCache>,
}

impl Mlp {
    /// Network with layer sizes `[d0, d1, ..., dL]` and all parameters zero.
    ///
    /// # Errors
    /// [`ModelError::InvalidLayerSizes`] if fewer than two sizes are given
    /// or any size is zero.
    pub fn new(sizes: &[usize], hidden: Activation, output: Activation) -> ModelResult<Self> {
        if sizes.len() < 2 {
            return Err(ModelError::InvalidLayerSizes {
                reason: "At least an input and an output size are required.",
            });
        }
        if sizes.iter().any(|&d| d == 0) {
            return Err(ModelError::InvalidLayerSizes { reason: "Every layer size must be > 0." });
        }
        let mut layout = ParamLayout::new();
        for (i, pair) in sizes.windows(2).enumerate() {
            layout.push(format!("layer{i}.weight"), pair[1], pair[0])?;
            layout.push(format!("layer{i}.bias"), pair[1], 1)?;
        }
        let params = vec![0.0; layout.total_len()];
        Ok(Self { sizes: sizes.to_vec(), hidden, output, layout, params, cache: None })
    }

    /// Network with parameters drawn uniformly in `±1/sqrt(fan_in)` per layer.
    ///
    /// # Errors
    /// Same as [`Mlp::new`].
    pub fn random<R: Rng>(
        sizes: &[usize], hidden: Activation, output: Activation, rng: &mut R,
    ) -> ModelResult<Self> {
        let mut mlp = Self::new(sizes, hidden, output)?;
        // Slots alternate weight/bias, so slot `index` belongs to layer `index / 2`.
        let tensors: Vec<Array2<f64>> = mlp
            .layout
            .slots()
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let bound = 1.0 / (sizes[index / 2] as f64).sqrt();
                Array2::from_shape_fn((slot.rows, slot.cols), |_| rng.random_range(-bound..bound))
            })
            .collect();
        let views: Vec<_> = tensors.iter().map(|t| t.view()).collect();
        let theta = mlp.layout.flatten(&views)?;
        mlp.params = theta.to_vec();
        Ok(mlp)
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    pub fn num_layers(&self) -> usize {
        self.sizes.len() - 1
    }

    /// Activations used by hidden layers and by the output layer.
    pub fn activations(&self) -> (Activation, Activation) {
        (self.hidden, self.output)
    }

    // ---- Helper methods ----

    fn activation_of(&self, layer: usize) -> Activation {
        if layer + 1 == self.num_layers() { self.output } else { self.hidden }
    }

    fn weight(&self, layer: usize) -> ModelResult<ArrayView2<'_, f64>> {
        self.layout.view(2 * layer, &self.params)
    }

    fn bias(&self, layer: usize) -> ModelResult<ArrayView1<'_, f64>> {
        Ok(self.layout.view(2 * layer + 1, &self.params)?.index_axis_move(Axis(1), 0))
    }

    fn check_inputs(&self, inputs: BatchView<'_>) -> ModelResult<()> {
        if inputs.nrows() == 0 {
            return Err(ModelError::EmptyBatch);
        }
        if inputs.ncols() != self.sizes[0] {
            return Err(ModelError::InputDimMismatch { expected: self.sizes[0], actual: inputs.ncols() });
        }
        Ok(())
    }
}

impl DifferentiableModel for Mlp {
    fn num_parameters(&self) -> usize {
        self.layout.total_len()
    }

    fn input_dim(&self) -> usize {
        self.sizes[0]
    }

    fn output_dim(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }

    fn parameters(&self) -> ParamVec {
        Array1::from(self.params.clone())
    }

    fn set_parameters(&mut self, theta: &ParamVec) -> ModelResult<()> {
        self.layout.check_len(theta.len())?;
        if let Some((index, &value)) = theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ModelError::NonFiniteParameter { index, value });
        }
        for (dst, &src) in self.params.iter_mut().zip(theta.iter()) {
            *dst = src;
        }
        self.cache = None;
        Ok(())
    }

    fn forward(&mut self, inputs: BatchView<'_>) -> ModelResult<Batch> {
        self.check_inputs(inputs)?;
        let layers = self.num_layers();
        let mut pre = Vec::with_capacity(layers);
        let mut post: Vec<Batch> = Vec::with_capacity(layers);
        for layer in 0..layers {
            let a_in = match post.last() {
                Some(prev) => prev.view(),
                None => inputs.view(),
            };
            let mut z = a_in.dot(&self.weight(layer)?.t());
            z += &self.bias(layer)?;
            let a_out = self.activation_of(layer).apply_all(&z);
            pre.push(z);
            post.push(a_out);
        }
        let output = post.last().cloned().unwrap_or_else(|| inputs.to_owned());
        self.cache = Some(ForwardCache { inputs: inputs.to_owned(), pre, post });
        Ok(output)
    }

    fn output_gradient(&mut self, output_index: usize, inputs: BatchView<'_>) -> ModelResult<Grad> {
        let cache = match &self.cache {
            Some(cache) if same_batch(&cache.inputs, inputs) => cache,
            _ => return Err(ModelError::NoForwardPass),
        };
        let out_dim = self.output_dim();
        let len = inputs.nrows() * out_dim;
        if output_index >= len {
            return Err(ModelError::OutputIndexOutOfRange { index: output_index, len });
        }
        let (n, j) = (output_index / out_dim, output_index % out_dim);

        let layers = self.num_layers();
        let mut grad = vec![0.0; self.layout.total_len()];

        // One-hot cotangent through the output activation.
        let mut delta = Array1::<f64>::zeros(out_dim);
        delta[j] = self.activation_of(layers - 1).derivative(cache.pre[layers - 1][[n, j]]);

        for layer in (0..layers).rev() {
            let a_in = if layer == 0 { cache.inputs.row(n) } else { cache.post[layer - 1].row(n) };
            {
                let mut w_grad = self.layout.view_mut(2 * layer, &mut grad)?;
                for (r, &d) in delta.iter().enumerate() {
                    if d != 0.0 {
                        w_grad.row_mut(r).scaled_add(d, &a_in);
                    }
                }
            }
            {
                let mut b_grad = self.layout.view_mut(2 * layer + 1, &mut grad)?;
                b_grad.column_mut(0).assign(&delta);
            }
            if layer > 0 {
                let back = self.weight(layer)?.t().dot(&delta);
                let z_prev = cache.pre[layer - 1].row(n);
                let act = self.activation_of(layer - 1);
                delta = Array1::from_iter(back.iter().zip(z_prev.iter()).map(|(&b, &z)| b * act.derivative(z)));
            }
        }
        Ok(Array1::from(grad))
    }
}

/// Bitwise batch equality; `==` on floats would never match a NaN entry.
fn same_batch(cached: &Batch, inputs: BatchView<'_>) -> bool {
    cached.dim() == inputs.dim()
        && cached.iter().zip(inputs.iter()).all(|(a, b)| a.to_bits() == b.to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};
    use rand::{SeedableRng, rngs::StdRng};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Parameter layout and counts.
    // - Forward evaluation against a hand-computed network.
    // - Reverse-mode gradients against central differences.
    // - Misuse of `output_gradient` (no forward pass, index out of range).
    // -------------------------------------------------------------------------

    fn random_mlp(sizes: &[usize], seed: u64) -> Mlp {
        let mut rng = StdRng::seed_from_u64(seed);
        Mlp::random(sizes, Activation::Softsign, Activation::Identity, &mut rng).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // The 5-10-10-5 network has (5·10+10)+(10·10+10)+(10·5+5) = 225 parameters
    // laid out weight-then-bias per layer.
    fn layout_of_5_10_10_5_network() {
        let mlp = Mlp::new(&[5, 10, 10, 5], Activation::Softsign, Activation::Softsign).unwrap();
        let layout = mlp.layout();

        assert_eq!(mlp.num_parameters(), 225);
        assert_eq!(layout.slots().len(), 6);
        assert_eq!(layout.slot("layer0.weight").unwrap().range(), 0..50);
        assert_eq!(layout.slot("layer0.bias").unwrap().range(), 50..60);
        assert_eq!(layout.slot("layer2.bias").unwrap().range(), 220..225);
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        assert!(matches!(
            Mlp::new(&[3], Activation::Tanh, Activation::Identity),
            Err(ModelError::InvalidLayerSizes { .. })
        ));
        assert!(matches!(
            Mlp::new(&[3, 0, 1], Activation::Tanh, Activation::Identity),
            Err(ModelError::InvalidLayerSizes { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Random initialization respects the ±1/sqrt(fan_in) bound per layer.
    fn random_init_respects_fan_in_bound() {
        let mlp = random_mlp(&[4, 9, 2], 7);
        let theta = mlp.parameters();

        for slot in mlp.layout().slots() {
            let fan_in = if slot.name.starts_with("layer0") { 4.0_f64 } else { 9.0 };
            let bound = 1.0 / fan_in.sqrt();
            assert!(theta.slice(ndarray::s![slot.range()]).iter().all(|v| v.abs() <= bound));
        }
        assert!(theta.iter().any(|&v| v != 0.0));
    }

    #[test]
    // Purpose
    // -------
    // `parameters()` right after `set_parameters(v)` returns `v`; non-finite
    // and wrongly sized vectors are rejected without changing the parameters.
    fn set_then_get_parameters_round_trips() {
        // Arrange
        let mut mlp = random_mlp(&[2, 3, 1], 1);
        let before = mlp.parameters();
        let v = ParamVec::from_iter((0..13).map(|i| i as f64 * 0.1));
        let mut bad = v.clone();
        bad[4] = f64::NAN;

        // Act / Assert
        assert_eq!(
            mlp.set_parameters(&ParamVec::zeros(12)),
            Err(ModelError::ParameterLengthMismatch { expected: 13, actual: 12 })
        );
        assert!(matches!(mlp.set_parameters(&bad), Err(ModelError::NonFiniteParameter { index: 4, .. })));
        assert_eq!(mlp.parameters(), before);
        mlp.set_parameters(&v).unwrap();
        assert_eq!(mlp.parameters(), v);
    }

    #[test]
    // Purpose
    // -------
    // Forward pass of a 1-2-1 network matches a hand computation.
    //
    // Given
    // -----
    // - W0 = [[1], [−2]], b0 = [0, 1], W1 = [[1, 1]], b1 = [0.5], softsign hidden,
    //   identity output, x = 1.
    //
    // Expect
    // ------
    // - z0 = [1, −1], a0 = [0.5, −0.5], y = 0.5 − 0.5 + 0.5 = 0.5.
    fn forward_matches_hand_computation() {
        // Arrange
        let mut mlp = Mlp::new(&[1, 2, 1], Activation::Softsign, Activation::Identity).unwrap();
        mlp.set_parameters(&array![1.0, -2.0, 0.0, 1.0, 1.0, 1.0, 0.5]).unwrap();

        // Act
        let y = mlp.forward(array![[1.0]].view()).unwrap();

        // Assert
        assert_eq!(y.dim(), (1, 1));
        assert_abs_diff_eq!(y[[0, 0]], 0.5, epsilon = 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // Every reverse-mode Jacobian row matches central differences of the
    // corresponding output scalar.
    //
    // Given
    // -----
    // - A random 3-4-4-2 softsign/tanh network and a batch of 3 inputs.
    //
    // Expect
    // ------
    // - |analytic − numeric| < 1e-6 for all 6 rows and all parameters.
    fn output_gradients_match_central_differences() {
        // Arrange
        let mut rng = StdRng::seed_from_u64(3);
        let mut mlp = Mlp::random(&[3, 4, 4, 2], Activation::Softsign, Activation::Tanh, &mut rng).unwrap();
        let inputs = array![[0.3, -1.2, 0.8], [1.5, 0.1, -0.4], [-0.7, 0.9, 2.0]];
        let theta = mlp.parameters();
        let h = 1e-6;

        // Act
        mlp.forward(inputs.view()).unwrap();
        let rows: Vec<Grad> =
            (0..6).map(|k| mlp.output_gradient(k, inputs.view()).unwrap()).collect();

        // Assert
        for p in 0..theta.len() {
            let mut plus = theta.clone();
            let mut minus = theta.clone();
            plus[p] += h;
            minus[p] -= h;
            mlp.set_parameters(&plus).unwrap();
            let y_plus = mlp.forward(inputs.view()).unwrap();
            mlp.set_parameters(&minus).unwrap();
            let y_minus = mlp.forward(inputs.view()).unwrap();
            for (k, row) in rows.iter().enumerate() {
                let (n, j) = (k / 2, k % 2);
                let numeric = (y_plus[[n, j]] - y_minus[[n, j]]) / (2.0 * h);
                assert_abs_diff_eq!(row[p], numeric, epsilon = 1e-6);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Gradients require a matching forward pass and an in-range index.
    fn output_gradient_misuse_is_reported() {
        // Arrange
        let mut mlp = random_mlp(&[2, 3, 2], 5);
        let inputs = array![[1.0, 2.0]];
        let other = array![[0.0, 0.0], [1.0, 1.0]];

        // Act / Assert
        assert_eq!(mlp.output_gradient(0, inputs.view()), Err(ModelError::NoForwardPass));
        mlp.forward(inputs.view()).unwrap();
        assert_eq!(mlp.output_gradient(0, other.view()), Err(ModelError::NoForwardPass));
        assert_eq!(
            mlp.output_gradient(2, inputs.view()),
            Err(ModelError::OutputIndexOutOfRange { index: 2, len: 2 })
        );
        assert!(mlp.output_gradient(1, inputs.view()).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // A batch holding NaN still matches the forward pass it came from, and a
    // batch of the same shape with different bits does not.
    //
    // Given
    // -----
    // - A 2-3-2 network forwarded on `[[NaN, 1]]`.
    //
    // Expect
    // ------
    // - `output_gradient` on the same batch returns a full-length row.
    // - `output_gradient` on `[[0, 1]]` reports `NoForwardPass`.
    fn nan_batch_matches_its_own_forward_pass() {
        // Arrange
        let mut mlp = random_mlp(&[2, 3, 2], 6);
        let inputs = array![[f64::NAN, 1.0]];
        let other = array![[0.0, 1.0]];

        // Act
        mlp.forward(inputs.view()).unwrap();
        let grad = mlp.output_gradient(0, inputs.view());
        let stale = mlp.output_gradient(0, other.view());

        // Assert
        assert_eq!(grad.map(|g| g.len()), Ok(mlp.num_parameters()));
        assert_eq!(stale, Err(ModelError::NoForwardPass));
    }

    #[test]
    fn forward_checks_input_shape() {
        let mut mlp = random_mlp(&[2, 2], 0);
        assert_eq!(mlp.forward(Array2::zeros((0, 2)).view()), Err(ModelError::EmptyBatch));
        assert_eq!(
            mlp.forward(Array2::zeros((1, 3)).view()),
            Err(ModelError::InputDimMismatch { expected: 2, actual: 3 })
        );
    }
}
