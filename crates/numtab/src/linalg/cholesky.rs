//! Cholesky factorization `A = L·Lᵀ` for symmetric positive-definite matrices.

use nalgebra::{DMatrix, DVector};

use super::triangular::{back_substitution, forward_substitution};
use super::{ensure_rhs, ensure_square, LinalgError};

/// Symmetry check: `|a[i,j] − a[j,i]| <= symmetry_tol · max(1, max|A|)`.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CholeskyConfig {
    /// Absolute tolerance, scaled by the largest entry magnitude (at least 1).
    pub symmetry_tol: f64,
}

impl Default for CholeskyConfig {
    fn default() -> Self {
        Self { symmetry_tol: 1e-8 }
    }
}

/// Lower-triangular Cholesky factor.
#[derive(Debug, Clone, PartialEq)]
pub struct CholeskyFactor {
    pub l: DMatrix<f64>,
}

impl CholeskyFactor {
    /// Solve `A·x = b` with `L·y = b` followed by `Lᵀ·x = y`.
    pub fn solve(&self, b: &DVector<f64>) -> Result<DVector<f64>, LinalgError> {
        let y = forward_substitution(&self.l, b, false)?;
        back_substitution(&self.l.transpose(), &y)
    }

    /// `L·Lᵀ`.
    pub fn reconstruct(&self) -> DMatrix<f64> {
        &self.l * self.l.transpose()
    }
}

/// Factor plus the solution of one right-hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct CholeskySolution {
    pub l: DMatrix<f64>,
    pub x: DVector<f64>,
}

fn check_symmetric(a: &DMatrix<f64>, cfg: &CholeskyConfig) -> Result<(), LinalgError> {
    let n = a.nrows();
    let scale = a.iter().fold(1.0f64, |m, v| m.max(v.abs()));
    let bound = cfg.symmetry_tol * scale;
    for row in 0..n {
        for col in (row + 1)..n {
            let upper = a[(row, col)];
            let lower = a[(col, row)];
            let delta = (upper - lower).abs();
            if delta > bound {
                return Err(LinalgError::NotSymmetric { row, col, delta });
            }
        }
    }
    Ok(())
}

/// Factor `a` with default symmetry tolerances.
pub fn cholesky_decompose(a: &DMatrix<f64>) -> Result<CholeskyFactor, LinalgError> {
    cholesky_decompose_with(a, &CholeskyConfig::default())
}

/// Factor `a` after checking symmetry against `cfg`.
///
/// Only the lower triangle of `a` is read once symmetry is established.
pub fn cholesky_decompose_with(
    a: &DMatrix<f64>,
    cfg: &CholeskyConfig,
) -> Result<CholeskyFactor, LinalgError> {
    let n = ensure_square(a)?;
    check_symmetric(a, cfg)?;

    let mut l = DMatrix::<f64>::zeros(n, n);
    for j in 0..n {
        let mut radicand = a[(j, j)];
        for k in 0..j {
            radicand -= l[(j, k)] * l[(j, k)];
        }
        if radicand <= 0.0 || !radicand.is_finite() {
            return Err(LinalgError::NotPositiveDefinite { row: j, radicand });
        }
        let diag = radicand.sqrt();
        l[(j, j)] = diag;

        for i in (j + 1)..n {
            let mut acc = a[(i, j)];
            for k in 0..j {
                acc -= l[(i, k)] * l[(j, k)];
            }
            l[(i, j)] = acc / diag;
        }
    }

    Ok(CholeskyFactor { l })
}

/// Factor `a` and solve `a·x = b`.
pub fn solve_cholesky(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<CholeskySolution, LinalgError> {
    let n = ensure_square(a)?;
    ensure_rhs(n, b)?;
    let factor = cholesky_decompose(a)?;
    let x = factor.solve(b)?;
    Ok(CholeskySolution { l: factor.l, x })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spd() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 3, &[25.0, 15.0, -5.0, 15.0, 18.0, 0.0, -5.0, 0.0, 11.0])
    }

    #[test]
    fn textbook_factor() {
        let f = cholesky_decompose(&spd()).unwrap();
        let expected =
            DMatrix::from_row_slice(3, 3, &[5.0, 0.0, 0.0, 3.0, 3.0, 0.0, -1.0, 1.0, 3.0]);
        assert_relative_eq!(f.l, expected, epsilon = 1e-12);
        assert_relative_eq!(f.reconstruct(), spd(), epsilon = 1e-12);
    }

    #[test]
    fn solves_spd_system() {
        let a = spd();
        let x_true = DVector::from_vec(vec![1.0, -2.0, 0.5]);
        let b = &a * &x_true;
        let sol = solve_cholesky(&a, &b).unwrap();
        assert_relative_eq!(sol.x, x_true, epsilon = 1e-12);
    }

    #[test]
    fn asymmetric_matrix_is_rejected() {
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 2.0, 3.0]);
        let err = cholesky_decompose(&a).unwrap_err();
        assert!(matches!(err, LinalgError::NotSymmetric { row: 0, col: 1, .. }));
    }

    #[test]
    fn indefinite_matrix_is_rejected() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let err = cholesky_decompose(&a).unwrap_err();
        match err {
            LinalgError::NotPositiveDefinite { row, radicand } => {
                assert_eq!(row, 1);
                assert_relative_eq!(radicand, -3.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tiny_asymmetry_within_tolerance_is_accepted() {
        let mut a = spd();
        a[(0, 1)] += 1e-10;
        assert!(cholesky_decompose(&a).is_ok());
    }

    #[test]
    fn small_relative_asymmetry_is_rejected() {
        let mut a = spd();
        a[(0, 1)] *= 1.0 + 1e-6;
        let err = cholesky_decompose(&a).unwrap_err();
        assert!(matches!(err, LinalgError::NotSymmetric { row: 0, col: 1, .. }));

        let b = DMatrix::from_row_slice(2, 2, &[2000.0, 1000.0, 1000.009, 2000.0]);
        assert!(matches!(
            cholesky_decompose(&b),
            Err(LinalgError::NotSymmetric { .. })
        ));
    }

    #[test]
    fn symmetry_tolerance_is_configurable() {
        let b = DMatrix::from_row_slice(2, 2, &[2000.0, 1000.0, 1000.009, 2000.0]);
        let cfg = CholeskyConfig { symmetry_tol: 1e-5 };
        assert!(cholesky_decompose_with(&b, &cfg).is_ok());
    }
}
