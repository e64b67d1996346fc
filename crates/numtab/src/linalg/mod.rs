//! Direct solvers for dense square systems `A·x = b`.
//!
//! Every method here is the textbook variant without row exchanges, so the
//! traces and factors match what a student computes by hand:
//!
//! - [`lu`] – Doolittle LU factorization (unit-diagonal `L`).
//! - [`cholesky`] – `A = L·Lᵀ` for symmetric positive-definite `A`.
//! - [`elimination`] – Gaussian and Gauss-Jordan elimination with a step trace.
//! - [`triangular`] – forward/back substitution shared by all of the above.
//!
//! A zero pivot is always reported as [`LinalgError::SingularMatrix`].

pub mod cholesky;
pub mod elimination;
pub mod errors;
pub mod lu;
pub mod triangular;

pub use cholesky::{
    cholesky_decompose, cholesky_decompose_with, solve_cholesky, CholeskyConfig, CholeskyFactor,
    CholeskySolution,
};
pub use elimination::{
    gauss_jordan, gaussian_elimination, EliminationRun, GaussJordanOp, GaussJordanStep, GaussStep,
    TraceStep,
};
pub use errors::LinalgError;
pub use lu::{lu_decompose, solve_lu, LuFactors, LuSolution};
pub use triangular::{back_substitution, forward_substitution};

use nalgebra::{DMatrix, DVector};

/// Validate that `a` is a non-empty, finite, square matrix and return its order.
pub(crate) fn ensure_square(a: &DMatrix<f64>) -> Result<usize, LinalgError> {
    let (rows, cols) = a.shape();
    if rows == 0 || cols == 0 {
        return Err(LinalgError::Empty);
    }
    if rows != cols {
        return Err(LinalgError::NotSquare { rows, cols });
    }
    for col in 0..cols {
        for row in 0..rows {
            if !a[(row, col)].is_finite() {
                return Err(LinalgError::NonFinite { row, col });
            }
        }
    }
    Ok(rows)
}

/// Validate a right-hand side against a system of order `n`.
pub(crate) fn ensure_rhs(n: usize, b: &DVector<f64>) -> Result<(), LinalgError> {
    if b.len() != n {
        return Err(LinalgError::DimensionMismatch { n, got: b.len() });
    }
    if let Some(row) = b.iter().position(|v| !v.is_finite()) {
        return Err(LinalgError::NonFinite { row, col: 0 });
    }
    Ok(())
}

/// A pivot fails only when it is exactly zero or not finite. Small pivots
/// are legitimate and are divided by as-is.
#[inline]
pub(crate) fn check_pivot(pivot: usize, value: f64) -> Result<(), LinalgError> {
    if value == 0.0 || !value.is_finite() {
        return Err(LinalgError::SingularMatrix { pivot, value });
    }
    Ok(())
}
