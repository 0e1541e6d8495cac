//! Error metrics for held-out evaluation.
use ndarray::{ArrayBase, Data, Ix2};

use crate::training::errors::{TrainingError, TrainingResult};

/// Mean of squared element-wise differences.
///
/// # Errors
/// [`TrainingError::MetricShape`] if shapes differ or the arrays are empty.
pub fn mse<S1, S2>(predictions: &ArrayBase<S1, Ix2>, targets: &ArrayBase<S2, Ix2>) -> TrainingResult<f64>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    if predictions.dim() != targets.dim() || predictions.is_empty() {
        return Err(TrainingError::MetricShape { predictions: predictions.dim(), targets: targets.dim() });
    }
    let sum: f64 = predictions.iter().zip(targets.iter()).map(|(p, t)| (p - t) * (p - t)).sum();
    Ok(sum / predictions.len() as f64)
}

/// `log10(mse)`; `-inf` for a perfect fit.
///
/// # Errors
/// Same as [`mse`].
pub fn log10_mse<S1, S2>(
    predictions: &ArrayBase<S1, Ix2>, targets: &ArrayBase<S2, Ix2>,
) -> TrainingResult<f64>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    Ok(mse(predictions, targets)?.log10())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array2, array};

    #[test]
    // Purpose
    // -------
    // mse averages over every element of the batch.
    //
    // Given
    // -----
    // - predictions [[1, 2], [3, 4]], targets [[1, 0], [3, 5]].
    //
    // Expect
    // ------
    // - mse = (0 + 4 + 0 + 1) / 4 = 1.25, log10 ≈ 0.09691.
    fn mse_averages_all_elements() {
        let p = array![[1.0, 2.0], [3.0, 4.0]];
        let t = array![[1.0, 0.0], [3.0, 5.0]];

        assert_relative_eq!(mse(&p, &t).unwrap(), 1.25);
        assert_relative_eq!(log10_mse(&p, &t).unwrap(), 1.25_f64.log10());
    }

    #[test]
    fn mismatched_or_empty_inputs_are_rejected() {
        let p = Array2::<f64>::zeros((2, 2));
        let t = Array2::<f64>::zeros((2, 3));
        let empty = Array2::<f64>::zeros((0, 2));

        assert!(matches!(mse(&p, &t), Err(TrainingError::MetricShape { .. })));
        assert!(mse(&empty, &empty).is_err());
        assert_eq!(log10_mse(&p, &p).unwrap(), f64::NEG_INFINITY);
    }
}
