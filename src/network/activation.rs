//! Element-wise activation functions for [`Mlp`](crate::network::mlp::Mlp).
//!
//! Each [`Activation`] provides its value `φ(z)` and its derivative `φ'(z)`
//! with respect to the pre-activation `z`. Derivatives are taken at the
//! pre-activation so the backward pass only needs the cached `z`.
//!
//! - `Softsign`: `φ(z) = z / (1 + |z|)`, `φ'(z) = 1 / (1 + |z|)²`.
//! - `Tanh`: `φ'(z) = 1 − tanh²(z)`.
//! - `Relu`: `φ'(0)` is taken as `0`.
use ndarray::{Array2, ArrayBase, Data, Ix2};

/// Supported element-wise activations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    Identity,
    #[default]
    Softsign,
    Tanh,
    Relu,
}

impl Activation {
    /// `φ(z)` for one scalar.
    pub fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Identity => z,
            Activation::Softsign => z / (1.0 + z.abs()),
            Activation::Tanh => z.tanh(),
            Activation::Relu => z.max(0.0),
        }
    }

    /// `φ'(z)` for one scalar.
    pub fn derivative(self, z: f64) -> f64 {
        match self {
            Activation::Identity => 1.0,
            Activation::Softsign => {
                let d = 1.0 + z.abs();
                1.0 / (d * d)
            }
            Activation::Tanh => {
                let t = z.tanh();
                1.0 - t * t
            }
            Activation::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// `φ` applied element-wise to a matrix.
    pub fn apply_all<S: Data<Elem = f64>>(self, z: &ArrayBase<S, Ix2>) -> Array2<f64> {
        z.mapv(|v| self.apply(v))
    }

    /// Parse a lowercase activation name (`"identity"`, `"softsign"`,
    /// `"tanh"`, `"relu"`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "identity" | "linear" => Some(Activation::Identity),
            "softsign" => Some(Activation::Softsign),
            "tanh" => Some(Activation::Tanh),
            "relu" => Some(Activation::Relu),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    // Purpose
    // -------
    // Softsign is bounded by ±1 and odd.
    fn softsign_values() {
        let act = Activation::Softsign;
        assert_eq!(act.apply(0.0), 0.0);
        assert_abs_diff_eq!(act.apply(1.0), 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(act.apply(-3.0), -0.75, epsilon = 1e-15);
        assert!(act.apply(1e12) < 1.0);
    }

    #[test]
    // Purpose
    // -------
    // Analytic derivatives match central differences away from kinks.
    //
    // Given
    // -----
    // - Every activation at z ∈ {−1.3, −0.2, 0.4, 2.1}, h = 1e-6.
    //
    // Expect
    // ------
    // - |φ'(z) − (φ(z+h) − φ(z−h)) / 2h| < 1e-8.
    fn derivatives_match_central_differences() {
        let h = 1e-6;
        for act in [Activation::Identity, Activation::Softsign, Activation::Tanh, Activation::Relu] {
            for z in [-1.3, -0.2, 0.4, 2.1] {
                let numeric = (act.apply(z + h) - act.apply(z - h)) / (2.0 * h);
                assert_abs_diff_eq!(act.derivative(z), numeric, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(Activation::from_name("Softsign"), Some(Activation::Softsign));
        assert_eq!(Activation::from_name("linear"), Some(Activation::Identity));
        assert_eq!(Activation::from_name("gelu"), None);
    }
}
