//! Polynomial interpolation through tabulated points.
//!
//! [`newton`] builds the divided-difference table and the Newton form of the
//! interpolating polynomial; [`report`] summarizes a fit the way the
//! statistics panel of a worked exercise does.

pub mod errors;
pub mod newton;
pub mod report;

pub use errors::InterpolationError;
pub use newton::{
    divided_differences, evaluate, newton_interpolate, DividedDifferenceTable, EvalRegion,
    NewtonInterpolation, NewtonPolynomial, NewtonTerm,
};
pub use report::FitReport;

/// Minimum separation below which two nodes count as the same x.
pub const DEFAULT_X_TOL: f64 = 1e-12;

/// Something that can be evaluated at arbitrary points.
pub trait Interpolant {
    /// Evaluates a single point.
    fn eval(&self, x: f64) -> f64;

    /// Evaluates many points.
    #[inline]
    fn eval_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&xq| self.eval(xq)).collect()
    }
}

pub(crate) fn non_finite_idx(xs: &[f64]) -> Option<usize> {
    xs.iter().position(|x| !x.is_finite())
}

/// Shared node validation: non-empty, equal length, finite, distinct x.
pub(crate) fn validate_nodes(x: &[f64], y: &[f64]) -> Result<(), InterpolationError> {
    if x.is_empty() || y.is_empty() {
        return Err(InterpolationError::EmptyInput);
    }
    if x.len() != y.len() {
        return Err(InterpolationError::UnequalLength {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    if let Some(idx) = non_finite_idx(x) {
        return Err(InterpolationError::NonFinite { which: "x", idx });
    }
    if let Some(idx) = non_finite_idx(y) {
        return Err(InterpolationError::NonFinite { which: "y", idx });
    }

    let mut sorted = x.to_vec();
    sorted.sort_by(f64::total_cmp);
    for pair in sorted.windows(2) {
        if (pair[1] - pair[0]).abs() < DEFAULT_X_TOL {
            return Err(InterpolationError::DuplicateX {
                x1: pair[0],
                x2: pair[1],
            });
        }
    }
    Ok(())
}
