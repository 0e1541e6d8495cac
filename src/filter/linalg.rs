//! filter::linalg — dense linear algebra for the EKF correct step.
//!
//! Purpose
//! -------
//! Solve the innovation systems `S·u = e` and `S·V = H·C` without ever
//! forming `S⁻¹`, and keep covariance matrices numerically symmetric.
//! Containers stay in `ndarray` everywhere else in the crate; this module
//! is the only place that copies into `nalgebra::DMatrix` for
//! factorizations.
//!
//! Key behaviors
//! -------------
//! - [`InnovationSolver::factorize`] tries a Cholesky factorization first
//!   (`S` is symmetric positive definite whenever `r > 0`) and falls back
//!   to LU with partial pivoting when Cholesky fails.
//! - Both paths reject numerically singular `S` using the ratio of the
//!   smallest to the largest pivot of the triangular factor, reported as
//!   [`EkfError::SingularInnovation`].
//! - [`symmetrize`] averages each off-diagonal pair in place;
//!   [`add_scaled_identity`] adds `s·I` in place.
//!
//! Conventions
//! -----------
//! - Copies between `ndarray` (row-major) and `nalgebra` (column-major) go
//!   through index-based constructors, so layout never leaks across.
//! - No explicit inverse is formed anywhere in the crate.
use nalgebra::{
    DMatrix, Dyn,
    linalg::{Cholesky, LU},
};
use ndarray::{Array2, ArrayBase, Data, Ix2};

use crate::filter::errors::{EkfError, EkfResult};

/// Relative pivot threshold (scaled by the system size) below which `S`
/// is treated as singular.
pub const PIVOT_RTOL: f64 = f64::EPSILON;

enum Factor {
    Cholesky(Cholesky<f64, Dyn>),
    Lu(LU<f64, Dyn, Dyn>),
}

/// Factorized innovation covariance, reusable for several right-hand sides.
pub struct InnovationSolver {
    dim: usize,
    factor: Factor,
}

impl InnovationSolver {
    /// Factorize a square innovation covariance `s`.
    ///
    /// # Errors
    /// Returns [`EkfError::SingularInnovation`] if neither Cholesky nor LU
    /// yields a factor whose pivot ratio exceeds `dim · PIVOT_RTOL`.
    pub fn factorize<S: Data<Elem = f64>>(s: &ArrayBase<S, Ix2>) -> EkfResult<Self> {
        let dim = s.nrows();
        let threshold = PIVOT_RTOL * dim.max(1) as f64;
        let s_nalg = to_dmatrix(s);

        if let Some(chol) = s_nalg.clone().cholesky() {
            // Pivots of S are the squares of L's diagonal.
            let diag = chol.l_dirty().diagonal().map(|d| d * d);
            if pivot_ratio(diag.iter().copied()) > threshold {
                return Ok(Self { dim, factor: Factor::Cholesky(chol) });
            }
        }

        let lu = s_nalg.lu();
        let ratio = pivot_ratio(lu.u().diagonal().iter().copied());
        if !lu.is_invertible() || ratio <= threshold {
            return Err(EkfError::SingularInnovation { dim });
        }
        Ok(Self { dim, factor: Factor::Lu(lu) })
    }

    /// `true` if the Cholesky path was taken.
    pub fn is_cholesky(&self) -> bool {
        matches!(self.factor, Factor::Cholesky(_))
    }

    /// Solve `S·X = B` for `X` (`B` is `dim × k`).
    ///
    /// # Errors
    /// Returns [`EkfError::SingularInnovation`] if the LU back-substitution fails.
    pub fn solve<S: Data<Elem = f64>>(&self, b: &ArrayBase<S, Ix2>) -> EkfResult<Array2<f64>> {
        let b_nalg = to_dmatrix(b);
        let x = match &self.factor {
            Factor::Cholesky(chol) => chol.solve(&b_nalg),
            Factor::Lu(lu) => {
                lu.solve(&b_nalg).ok_or(EkfError::SingularInnovation { dim: self.dim })?
            }
        };
        Ok(from_dmatrix(&x))
    }
}

/// Add `scale · I` to a square matrix in place.
pub fn add_scaled_identity(mat: &mut Array2<f64>, scale: f64) {
    mat.diag_mut().mapv_inplace(|v| v + scale);
}

/// Replace each off-diagonal pair `(i, j)` / `(j, i)` with its average.
///
/// The diagonal is left untouched; afterwards the matrix is exactly symmetric.
pub fn symmetrize(mat: &mut Array2<f64>) {
    for i in 0..mat.nrows() {
        for j in 0..i {
            let avg = 0.5 * (mat[[i, j]] + mat[[j, i]]);
            mat[[i, j]] = avg;
            mat[[j, i]] = avg;
        }
    }
}

/// Largest absolute asymmetry `max |A_ij − A_ji|`.
pub fn max_asymmetry<S: Data<Elem = f64>>(mat: &ArrayBase<S, Ix2>) -> f64 {
    let mut worst = 0.0_f64;
    for i in 0..mat.nrows() {
        for j in 0..i {
            worst = worst.max((mat[[i, j]] - mat[[j, i]]).abs());
        }
    }
    worst
}

// ---- Helper methods ----

fn to_dmatrix<S: Data<Elem = f64>>(a: &ArrayBase<S, Ix2>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// `min |d| / max |d|` over pivots; `0.0` when every pivot is zero or
/// any pivot is non-finite.
fn pivot_ratio(pivots: impl Iterator<Item = f64>) -> f64 {
    let mut lo = f64::INFINITY;
    let mut hi = 0.0_f64;
    for p in pivots {
        if !p.is_finite() {
            return 0.0;
        }
        lo = lo.min(p.abs());
        hi = hi.max(p.abs());
    }
    if hi == 0.0 { 0.0 } else { lo / hi }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // A symmetric positive definite system is solved through Cholesky and
    // reproduces the right-hand side.
    //
    // Given
    // -----
    // - S = [[4, 1], [1, 3]], B = [[1, 2], [2, 0]].
    //
    // Expect
    // ------
    // - `is_cholesky()` is true and S·X ≈ B.
    fn spd_system_uses_cholesky_and_solves() {
        // Arrange
        let s = array![[4.0, 1.0], [1.0, 3.0]];
        let b = array![[1.0, 2.0], [2.0, 0.0]];

        // Act
        let solver = InnovationSolver::factorize(&s).unwrap();
        let x = solver.solve(&b).unwrap();

        // Assert
        assert!(solver.is_cholesky());
        let back = s.dot(&x);
        for (got, want) in back.iter().zip(b.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // An invertible but indefinite system falls back to LU.
    fn indefinite_system_falls_back_to_lu() {
        // Arrange
        let s = array![[0.0, 1.0], [1.0, 0.0]];
        let b = array![[3.0], [5.0]];

        // Act
        let solver = InnovationSolver::factorize(&s).unwrap();
        let x = solver.solve(&b).unwrap();

        // Assert
        assert!(!solver.is_cholesky());
        assert_abs_diff_eq!(x[[0, 0]], 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[[1, 0]], 3.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The zero matrix and a rank-deficient matrix are both singular.
    fn singular_systems_are_rejected() {
        let zero = Array2::<f64>::zeros((3, 3));
        let rank_one = array![[1.0, 1.0], [1.0, 1.0]];

        assert!(matches!(
            InnovationSolver::factorize(&zero),
            Err(EkfError::SingularInnovation { dim: 3 })
        ));
        assert!(matches!(
            InnovationSolver::factorize(&rank_one),
            Err(EkfError::SingularInnovation { dim: 2 })
        ));
    }

    #[test]
    // Purpose
    // -------
    // `symmetrize` averages off-diagonal pairs and keeps the diagonal.
    fn symmetrize_averages_off_diagonal_pairs() {
        // Arrange
        let mut m = array![[1.0, 2.0], [0.0, 3.0]];

        // Act
        symmetrize(&mut m);

        // Assert
        assert_eq!(m, array![[1.0, 1.0], [1.0, 3.0]]);
        assert_eq!(max_asymmetry(&m), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // `add_scaled_identity` only touches the diagonal.
    fn add_scaled_identity_touches_only_diagonal() {
        let mut m = array![[1.0, 2.0], [3.0, 4.0]];
        add_scaled_identity(&mut m, 0.5);
        assert_eq!(m, array![[1.5, 2.0], [3.0, 4.5]]);
    }
}
