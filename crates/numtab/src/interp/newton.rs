//! Newton (divided-difference) interpolation.
//!
//! The polynomial is kept in Newton form
//!
//! ```text
//! P(x) = c[0] + c[1](x − x0) + c[2](x − x0)(x − x1) + … + c[n−1](x − x0)…(x − x_{n−2})
//! ```
//!
//! with `c = table[0, :]`, and evaluated with Horner's nested scheme. A
//! power-basis expansion is available for printing. Nodes need to be
//! distinct but not sorted.

use std::fmt;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::{validate_nodes, Interpolant, InterpolationError};

// ── Divided-difference table ─────────────────────────────────────────

/// Triangular divided-difference table.
///
/// Column 0 holds the y-values, column `j` the `j`-th order differences.
/// Entries with `i + j >= n` are unused and stay zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DividedDifferenceTable {
    table: DMatrix<f64>,
}

impl DividedDifferenceTable {
    /// Number of nodes.
    pub fn order(&self) -> usize {
        self.table.nrows()
    }

    /// Entry `(i, j)` if it is part of the triangle.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        (i + j < self.order()).then(|| self.table[(i, j)])
    }

    /// Newton coefficients `a₀..aₙ₋₁` (the first row).
    pub fn coefficients(&self) -> Vec<f64> {
        self.table.row(0).iter().copied().collect()
    }

    /// Meaningful entries of column `j` (length `n − j`).
    pub fn column(&self, j: usize) -> Vec<f64> {
        let n = self.order();
        if j >= n {
            return Vec::new();
        }
        (0..n - j).map(|i| self.table[(i, j)]).collect()
    }

    /// The full square matrix including the unused zero entries.
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.table
    }

    /// Rows as plain vectors, convenient for serialization.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.table
            .row_iter()
            .map(|r| r.iter().copied().collect())
            .collect()
    }
}

/// Build the divided-difference table for nodes `(x, y)`.
pub fn divided_differences(
    x: &[f64],
    y: &[f64],
) -> Result<DividedDifferenceTable, InterpolationError> {
    validate_nodes(x, y)?;
    let n = x.len();

    let mut table = DMatrix::<f64>::zeros(n, n);
    table.set_column(0, &nalgebra::DVector::from_column_slice(y));

    for j in 1..n {
        for i in 0..(n - j) {
            table[(i, j)] = (table[(i + 1, j - 1)] - table[(i, j - 1)]) / (x[i + j] - x[i]);
        }
    }

    Ok(DividedDifferenceTable { table })
}

// ── Polynomial ───────────────────────────────────────────────────────

/// Whether a query point lies inside the node range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalRegion {
    Interpolation,
    Extrapolation,
}

/// Interpolating polynomial in Newton form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewtonPolynomial {
    coefficients: Vec<f64>,
    nodes: Vec<f64>,
}

impl NewtonPolynomial {
    /// Build from Newton coefficients and their nodes (same length).
    pub fn new(coefficients: Vec<f64>, nodes: Vec<f64>) -> Self {
        debug_assert_eq!(coefficients.len(), nodes.len());
        Self {
            coefficients,
            nodes,
        }
    }

    /// Degree of the form (number of nodes minus one).
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    /// `[min x, max x]` over the nodes.
    pub fn node_range(&self) -> (f64, f64) {
        self.nodes
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Interpolation inside `[min x, max x]`, extrapolation outside.
    pub fn classify(&self, x: f64) -> EvalRegion {
        let (lo, hi) = self.node_range();
        if x >= lo && x <= hi {
            EvalRegion::Interpolation
        } else {
            EvalRegion::Extrapolation
        }
    }

    /// Value at `x` together with its advisory region.
    pub fn eval_with_region(&self, x: f64) -> (f64, EvalRegion) {
        (self.eval(x), self.classify(x))
    }

    /// Ascending power-basis coefficients `p[k]` of `Σ p[k]·x^k`.
    pub fn to_power_basis(&self) -> Vec<f64> {
        let n = self.coefficients.len();
        let mut power = vec![0.0; n.max(1)];
        for (i, &c) in self.coefficients.iter().enumerate() {
            let basis = expand_product(&self.nodes[..i]);
            for (k, b) in basis.iter().enumerate() {
                power[k] += c * b;
            }
        }
        power
    }
}

impl Interpolant for NewtonPolynomial {
    fn eval(&self, x: f64) -> f64 {
        let n = self.coefficients.len();
        if n == 0 {
            return 0.0;
        }
        let mut p = self.coefficients[n - 1];
        for j in (0..n - 1).rev() {
            p = self.coefficients[j] + (x - self.nodes[j]) * p;
        }
        p
    }
}

impl fmt::Display for NewtonPolynomial {
    /// Power-basis text such as `1 + 0.5*x - 2*x^2`; honors `{:.N}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_power_basis(f, &self.to_power_basis())
    }
}

/// Ascending coefficients of `Π (x − r)` over `roots`.
fn expand_product(roots: &[f64]) -> Vec<f64> {
    let mut poly = vec![1.0];
    for &r in roots {
        let mut next = vec![0.0; poly.len() + 1];
        for (k, &p) in poly.iter().enumerate() {
            next[k + 1] += p;
            next[k] -= r * p;
        }
        poly = next;
    }
    poly
}

fn write_power_basis(f: &mut fmt::Formatter<'_>, coeffs: &[f64]) -> fmt::Result {
    let scale = coeffs.iter().fold(0.0f64, |m, c| m.max(c.abs()));
    let negligible = 1e-12 * scale.max(1.0);

    let mut wrote = false;
    for (k, &c) in coeffs.iter().enumerate() {
        if c.abs() <= negligible {
            continue;
        }
        let magnitude = c.abs();
        match (wrote, c < 0.0) {
            (false, true) => f.write_str("-")?,
            (true, true) => f.write_str(" - ")?,
            (true, false) => f.write_str(" + ")?,
            (false, false) => {}
        }
        match f.precision() {
            Some(prec) => write!(f, "{:.*}", prec, magnitude)?,
            None => write!(f, "{}", magnitude)?,
        }
        match k {
            0 => {}
            1 => f.write_str("*x")?,
            _ => write!(f, "*x^{}", k)?,
        }
        wrote = true;
    }
    if !wrote {
        f.write_str("0")?;
    }
    Ok(())
}

// ── Full interpolation result ────────────────────────────────────────

/// One incremental term `c_i · Π_{j<i}(x − x_j)` of the Newton form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewtonTerm {
    /// Order `i` of the term (0 is the constant).
    pub order: usize,
    pub coefficient: f64,
    /// Nodes `x_0..x_{i−1}` of the product.
    pub basis_points: Vec<f64>,
    /// The term expanded to ascending power-basis coefficients.
    pub expanded: Vec<f64>,
}

/// Result of [`newton_interpolate`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonInterpolation {
    pub polynomial: NewtonPolynomial,
    pub table: DividedDifferenceTable,
    /// Terms in increasing order; summing the first `k + 1` gives the
    /// interpolant through the first `k + 1` nodes.
    pub terms: Vec<NewtonTerm>,
}

/// Build the Newton interpolating polynomial through `(x, y)`.
pub fn newton_interpolate(x: &[f64], y: &[f64]) -> Result<NewtonInterpolation, InterpolationError> {
    let table = divided_differences(x, y)?;
    let coefficients = table.coefficients();

    let terms = coefficients
        .iter()
        .enumerate()
        .map(|(order, &coefficient)| {
            let basis_points = x[..order].to_vec();
            let expanded = expand_product(&basis_points)
                .into_iter()
                .map(|b| b * coefficient)
                .collect();
            NewtonTerm {
                order,
                coefficient,
                basis_points,
                expanded,
            }
        })
        .collect();

    let polynomial = NewtonPolynomial::new(coefficients, x.to_vec());
    tracing::debug!("newton polynomial of degree {}", polynomial.degree());

    Ok(NewtonInterpolation {
        polynomial,
        table,
        terms,
    })
}

/// Evaluate `polynomial` at each of `xs`.
pub fn evaluate(polynomial: &NewtonPolynomial, xs: &[f64]) -> Vec<f64> {
    polynomial.eval_many(xs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn table_matches_hand_computation() {
        let x = [1.0, 2.0, 4.0];
        let y = [1.0, 3.0, 2.0];
        let t = divided_differences(&x, &y).unwrap();
        assert_eq!(t.column(0), vec![1.0, 3.0, 2.0]);
        assert_relative_eq!(t.get(0, 1).unwrap(), 2.0);
        assert_relative_eq!(t.get(1, 1).unwrap(), -0.5);
        assert_relative_eq!(t.get(0, 2).unwrap(), (-0.5 - 2.0) / 3.0);
        assert_eq!(t.get(1, 2), None);
        assert_eq!(t.as_matrix()[(2, 2)], 0.0);
    }

    #[test]
    fn quadratic_data_has_zero_cubic_terms() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 2.0, 5.0, 10.0, 17.0];
        let interp = newton_interpolate(&x, &y).unwrap();
        assert_eq!(interp.polynomial.coefficients(), &[1.0, 1.0, 1.0, 0.0, 0.0]);
        let power = interp.polynomial.to_power_basis();
        assert_relative_eq!(power[0], 1.0);
        assert_relative_eq!(power[1], 0.0);
        assert_relative_eq!(power[2], 1.0);
        assert_eq!(interp.polynomial.to_string(), "1 + 1*x^2");
    }

    #[test]
    fn passes_through_unsorted_nodes() {
        let x = [3.0, -1.0, 0.5, 2.0];
        let y = [4.0, 0.0, -2.0, 7.5];
        let interp = newton_interpolate(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(y.iter()) {
            assert_relative_eq!(interp.polynomial.eval(*xi), *yi, epsilon = 1e-12);
        }
    }

    #[test]
    fn terms_sum_to_power_basis() {
        let x = [1.0, 2.0, 4.0, 5.0];
        let y = [0.0, 2.0, 12.0, 21.0];
        let interp = newton_interpolate(&x, &y).unwrap();
        assert_eq!(interp.terms.len(), 4);
        let mut sum = vec![0.0; 4];
        for term in &interp.terms {
            assert_eq!(term.basis_points.len(), term.order);
            for (k, v) in term.expanded.iter().enumerate() {
                sum[k] += v;
            }
        }
        let power = interp.polynomial.to_power_basis();
        for k in 0..4 {
            assert_relative_eq!(sum[k], power[k], epsilon = 1e-12);
        }
    }

    #[test]
    fn duplicate_x_is_rejected() {
        let err = divided_differences(&[0.0, 1.0, 0.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, InterpolationError::DuplicateX { x1: 0.0, x2: 0.0 });
    }

    #[test]
    fn unequal_lengths_are_rejected() {
        let err = newton_interpolate(&[0.0, 1.0], &[1.0]).unwrap_err();
        assert_eq!(err, InterpolationError::UnequalLength { x_len: 2, y_len: 1 });
    }

    #[test]
    fn single_node_is_a_constant() {
        let interp = newton_interpolate(&[2.0], &[7.0]).unwrap();
        assert_eq!(interp.polynomial.degree(), 0);
        assert_relative_eq!(interp.polynomial.eval(100.0), 7.0);
        assert_eq!(interp.polynomial.to_string(), "7");
    }

    #[test]
    fn region_classification() {
        let interp = newton_interpolate(&[0.0, 1.0, 2.0], &[0.0, 1.0, 4.0]).unwrap();
        let p = &interp.polynomial;
        assert_eq!(p.classify(1.5), EvalRegion::Interpolation);
        assert_eq!(p.classify(2.0), EvalRegion::Interpolation);
        let (v, region) = p.eval_with_region(3.0);
        assert_eq!(region, EvalRegion::Extrapolation);
        assert_relative_eq!(v, 9.0, epsilon = 1e-12);
    }

    #[test]
    fn display_signs_and_precision() {
        let p = NewtonPolynomial::new(vec![2.0, -3.0], vec![0.0, 1.0]);
        assert_eq!(p.to_string(), "2 - 3*x");
        let q = NewtonPolynomial::new(vec![-0.5, 0.25], vec![0.0, 1.0]);
        assert_eq!(format!("{:.2}", q), "-0.50 + 0.25*x");
        let zero = NewtonPolynomial::new(vec![0.0], vec![1.0]);
        assert_eq!(zero.to_string(), "0");
    }
}
