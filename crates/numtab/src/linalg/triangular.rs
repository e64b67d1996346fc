//! Forward and back substitution for triangular systems.

use nalgebra::{DMatrix, DVector};

use super::{check_pivot, ensure_rhs, ensure_square, LinalgError};

/// Solve `L·y = b` for lower-triangular `L`.
///
/// With `unit_diagonal` the diagonal of `L` is taken as 1 and never read,
/// which is the Doolittle convention used by [`crate::linalg::lu`].
/// Entries above the diagonal are ignored.
pub fn forward_substitution(
    l: &DMatrix<f64>,
    b: &DVector<f64>,
    unit_diagonal: bool,
) -> Result<DVector<f64>, LinalgError> {
    let n = ensure_square(l)?;
    ensure_rhs(n, b)?;

    let mut y = DVector::<f64>::zeros(n);
    for i in 0..n {
        let mut acc = b[i];
        for j in 0..i {
            acc -= l[(i, j)] * y[j];
        }
        y[i] = if unit_diagonal {
            acc
        } else {
            check_pivot(i, l[(i, i)])?;
            acc / l[(i, i)]
        };
    }
    Ok(y)
}

/// Solve `U·x = y` for upper-triangular `U`. Entries below the diagonal are ignored.
pub fn back_substitution(u: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>, LinalgError> {
    let n = ensure_square(u)?;
    ensure_rhs(n, y)?;

    let mut x = DVector::<f64>::zeros(n);
    for i in (0..n).rev() {
        check_pivot(i, u[(i, i)])?;
        let mut acc = y[i];
        for j in (i + 1)..n {
            acc -= u[(i, j)] * x[j];
        }
        x[i] = acc / u[(i, i)];
    }
    Ok(x)
}
