//! Doolittle LU factorization without pivoting.
//!
//! `A = L·U` with unit-diagonal `L`. Row `i` of `U` and column `i` of `L` are
//! produced together from the already known rows/columns:
//!
//! ```text
//! U[i,k] = A[i,k] − Σ_{j<i} L[i,j]·U[j,k]           k ≥ i
//! L[k,i] = (A[k,i] − Σ_{j<i} L[k,j]·U[j,i]) / U[i,i]  k > i
//! ```
//!
//! Callers must supply a matrix whose leading principal minors are nonzero;
//! anything else stops at the first zero pivot.

use nalgebra::{DMatrix, DVector};

use super::triangular::{back_substitution, forward_substitution};
use super::{check_pivot, ensure_rhs, ensure_square, LinalgError};

/// The two triangular factors of `A`.
#[derive(Debug, Clone, PartialEq)]
pub struct LuFactors {
    /// Lower-triangular factor with unit diagonal.
    pub l: DMatrix<f64>,
    /// Upper-triangular factor.
    pub u: DMatrix<f64>,
}

impl LuFactors {
    /// Order of the factored matrix.
    pub fn order(&self) -> usize {
        self.l.nrows()
    }

    /// Solve `A·x = b` with `L·y = b` followed by `U·x = y`.
    pub fn solve(&self, b: &DVector<f64>) -> Result<DVector<f64>, LinalgError> {
        let y = forward_substitution(&self.l, b, true)?;
        back_substitution(&self.u, &y)
    }

    /// `L·U`, i.e. the factored matrix up to round-off.
    pub fn reconstruct(&self) -> DMatrix<f64> {
        &self.l * &self.u
    }
}

/// Factors plus the solution of one right-hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct LuSolution {
    pub l: DMatrix<f64>,
    pub u: DMatrix<f64>,
    pub x: DVector<f64>,
}

/// Factor `a` into `L·U`.
pub fn lu_decompose(a: &DMatrix<f64>) -> Result<LuFactors, LinalgError> {
    let n = ensure_square(a)?;

    let mut l = DMatrix::<f64>::zeros(n, n);
    let mut u = DMatrix::<f64>::zeros(n, n);

    for i in 0..n {
        for k in i..n {
            let mut sum = 0.0;
            for j in 0..i {
                sum += l[(i, j)] * u[(j, k)];
            }
            u[(i, k)] = a[(i, k)] - sum;
        }

        check_pivot(i, u[(i, i)])?;
        l[(i, i)] = 1.0;

        for k in (i + 1)..n {
            let mut sum = 0.0;
            for j in 0..i {
                sum += l[(k, j)] * u[(j, i)];
            }
            l[(k, i)] = (a[(k, i)] - sum) / u[(i, i)];
        }
    }

    tracing::trace!("LU factorization of order {} complete", n);
    Ok(LuFactors { l, u })
}

/// Factor `a` and solve `a·x = b`.
pub fn solve_lu(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<LuSolution, LinalgError> {
    let n = ensure_square(a)?;
    ensure_rhs(n, b)?;
    let factors = lu_decompose(a)?;
    let x = factors.solve(b)?;
    Ok(LuSolution {
        l: factors.l,
        u: factors.u,
        x,
    })
}
