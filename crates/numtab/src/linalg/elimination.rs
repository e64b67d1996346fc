//! Gaussian and Gauss-Jordan elimination with a replayable step trace.
//!
//! Each row operation produces one trace entry holding a full snapshot of the
//! system, so a caller can show "step k of n" by indexing instead of
//! recomputing. Neither method exchanges rows: a zero pivot is fatal.
//!
//! | method        | trace length   | solution from              |
//! |---------------|----------------|----------------------------|
//! | Gaussian      | `n(n−1)/2`     | back substitution          |
//! | Gauss-Jordan  | `n²`           | last column of `[I | x]`   |

use std::fmt;

use nalgebra::{DMatrix, DVector};

use super::triangular::back_substitution;
use super::{check_pivot, ensure_rhs, ensure_square, LinalgError};

/// A trace entry that can be rendered as an augmented matrix `[A | b]`.
pub trait TraceStep {
    fn augmented(&self) -> DMatrix<f64>;
}

fn augment(a: &DMatrix<f64>, b: &DVector<f64>) -> DMatrix<f64> {
    let n = a.nrows();
    let mut ab = a.clone().insert_column(n, 0.0);
    ab.set_column(n, b);
    ab
}

// ── Gaussian elimination ──────────────────────────────────────────────

/// One row operation `row[target] -= factor · row[pivot]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussStep {
    pub pivot_row: usize,
    pub target_row: usize,
    pub factor: f64,
    /// Coefficient matrix after the operation.
    pub a: DMatrix<f64>,
    /// Right-hand side after the operation.
    pub b: DVector<f64>,
}

impl TraceStep for GaussStep {
    fn augmented(&self) -> DMatrix<f64> {
        augment(&self.a, &self.b)
    }
}

impl fmt::Display for GaussStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R{} <- R{} - ({}) * R{}",
            self.target_row + 1,
            self.target_row + 1,
            self.factor,
            self.pivot_row + 1
        )
    }
}

// ── Gauss-Jordan ──────────────────────────────────────────────────────

/// Kind of row operation recorded by Gauss-Jordan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GaussJordanOp {
    /// `row /= pivot`.
    Normalize { row: usize, pivot: f64 },
    /// `row[target] -= factor · row[pivot]`.
    Eliminate {
        pivot_row: usize,
        target_row: usize,
        factor: f64,
    },
}

impl fmt::Display for GaussJordanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Normalize { row, pivot } => {
                write!(f, "normalize R{} (divide by {})", row + 1, pivot)
            }
            Self::Eliminate {
                pivot_row,
                target_row,
                factor,
            } => write!(
                f,
                "eliminate ({}, {}): R{} <- R{} - ({}) * R{}",
                target_row + 1,
                pivot_row + 1,
                target_row + 1,
                target_row + 1,
                factor,
                pivot_row + 1
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaussJordanStep {
    pub op: GaussJordanOp,
    /// Augmented matrix `[A | b]` after the operation.
    pub augmented: DMatrix<f64>,
}

impl TraceStep for GaussJordanStep {
    fn augmented(&self) -> DMatrix<f64> {
        self.augmented.clone()
    }
}

impl fmt::Display for GaussJordanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.op, f)
    }
}

// ── Trace container ───────────────────────────────────────────────────

/// Completed elimination: initial system, every step, and the solution.
#[derive(Debug, Clone, PartialEq)]
pub struct EliminationRun<S> {
    initial: DMatrix<f64>,
    steps: Vec<S>,
    solution: DVector<f64>,
}

impl<S: TraceStep> EliminationRun<S> {
    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step `k` (0-based).
    pub fn step(&self, k: usize) -> Option<&S> {
        self.steps.get(k)
    }

    pub fn steps(&self) -> &[S] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.steps.iter()
    }

    pub fn solution(&self) -> &DVector<f64> {
        &self.solution
    }

    /// Augmented input `[A | b]`.
    pub fn initial(&self) -> &DMatrix<f64> {
        &self.initial
    }

    /// Augmented matrix after `k` steps; `state_at(0)` is the input and
    /// `state_at(len())` the terminal state.
    pub fn state_at(&self, k: usize) -> Option<DMatrix<f64>> {
        match k {
            0 => Some(self.initial.clone()),
            _ => self.steps.get(k - 1).map(TraceStep::augmented),
        }
    }

    pub fn into_parts(self) -> (Vec<S>, DVector<f64>) {
        (self.steps, self.solution)
    }
}

/// Reduce `a·x = b` to upper-triangular form, then back-substitute.
pub fn gaussian_elimination(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
) -> Result<EliminationRun<GaussStep>, LinalgError> {
    let n = ensure_square(a)?;
    ensure_rhs(n, b)?;

    let mut a_work = a.clone();
    let mut b_work = b.clone();
    let mut steps = Vec::with_capacity(n * n.saturating_sub(1) / 2);

    for i in 0..n.saturating_sub(1) {
        let pivot = a_work[(i, i)];
        check_pivot(i, pivot)?;
        for j in (i + 1)..n {
            let factor = a_work[(j, i)] / pivot;
            for k in 0..n {
                a_work[(j, k)] -= factor * a_work[(i, k)];
            }
            b_work[j] -= factor * b_work[i];
            steps.push(GaussStep {
                pivot_row: i,
                target_row: j,
                factor,
                a: a_work.clone(),
                b: b_work.clone(),
            });
        }
    }

    // The last pivot is only divided by during substitution.
    check_pivot(n - 1, a_work[(n - 1, n - 1)])?;
    let solution = back_substitution(&a_work, &b_work)?;
    tracing::debug!("gaussian elimination: {} steps for order {}", steps.len(), n);

    Ok(EliminationRun {
        initial: augment(a, b),
        steps,
        solution,
    })
}

/// Reduce `[a | b]` to `[I | x]`.
pub fn gauss_jordan(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
) -> Result<EliminationRun<GaussJordanStep>, LinalgError> {
    let n = ensure_square(a)?;
    ensure_rhs(n, b)?;

    let initial = augment(a, b);
    let mut ab = initial.clone();
    let mut steps = Vec::with_capacity(n * n);

    for i in 0..n {
        let pivot = ab[(i, i)];
        check_pivot(i, pivot)?;
        for k in 0..=n {
            ab[(i, k)] /= pivot;
        }
        steps.push(GaussJordanStep {
            op: GaussJordanOp::Normalize { row: i, pivot },
            augmented: ab.clone(),
        });

        for j in (0..n).filter(|&j| j != i) {
            let factor = ab[(j, i)];
            for k in 0..=n {
                ab[(j, k)] -= factor * ab[(i, k)];
            }
            steps.push(GaussJordanStep {
                op: GaussJordanOp::Eliminate {
                    pivot_row: i,
                    target_row: j,
                    factor,
                },
                augmented: ab.clone(),
            });
        }
    }

    let solution = ab.column(n).into_owned();
    tracing::debug!("gauss-jordan: {} steps for order {}", steps.len(), n);

    Ok(EliminationRun {
        initial,
        steps,
        solution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn textbook() -> (DMatrix<f64>, DVector<f64>) {
        let a =
            DMatrix::from_row_slice(3, 3, &[2.0, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0]);
        let b = DVector::from_vec(vec![8.0, -11.0, -3.0]);
        (a, b)
    }

    #[test]
    fn gaussian_trace_length_and_solution() {
        let (a, b) = textbook();
        let run = gaussian_elimination(&a, &b).unwrap();
        assert_eq!(run.len(), 3);
        let x = run.solution();
        assert_relative_eq!(x[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-12);
        assert_relative_eq!(x[2], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn gaussian_trace_records_row_pairs_in_order() {
        let (a, b) = textbook();
        let run = gaussian_elimination(&a, &b).unwrap();
        let pairs: Vec<(usize, usize)> =
            run.iter().map(|s| (s.pivot_row, s.target_row)).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);
        let last = run.step(2).unwrap();
        for r in 1..3 {
            for c in 0..r {
                assert_relative_eq!(last.a[(r, c)], 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn gaussian_first_step_factor() {
        let (a, b) = textbook();
        let run = gaussian_elimination(&a, &b).unwrap();
        assert_relative_eq!(run.step(0).unwrap().factor, -1.5);
        assert_eq!(run.step(0).unwrap().to_string(), "R2 <- R2 - (-1.5) * R1");
    }

    #[test]
    fn gaussian_zero_pivot_fails() {
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 1.0]);
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let err = gaussian_elimination(&a, &b).unwrap_err();
        assert!(matches!(err, LinalgError::SingularMatrix { pivot: 0, .. }));
    }

    #[test]
    fn small_pivots_are_not_treated_as_zero() {
        let a = DMatrix::from_row_slice(2, 2, &[1e-18, 1e-18, 1e-18, 2e-18]);
        let b = DVector::from_vec(vec![2e-18, 3e-18]);
        let expected = DVector::from_vec(vec![1.0, 1.0]);
        let ge = gaussian_elimination(&a, &b).unwrap();
        assert_relative_eq!(ge.solution().clone(), expected, epsilon = 1e-9);
        let gj = gauss_jordan(&a, &b).unwrap();
        assert_relative_eq!(gj.solution().clone(), expected, epsilon = 1e-9);
    }

    #[test]
    fn gauss_jordan_reaches_identity() {
        let (a, b) = textbook();
        let run = gauss_jordan(&a, &b).unwrap();
        assert_eq!(run.len(), 9);
        let last = run.state_at(run.len()).unwrap();
        let left = last.columns(0, 3).into_owned();
        assert_relative_eq!(left, DMatrix::identity(3, 3), epsilon = 1e-12);
        assert_relative_eq!(last[(0, 3)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(last[(1, 3)], 3.0, epsilon = 1e-12);
        assert_relative_eq!(last[(2, 3)], -1.0, epsilon = 1e-12);
        assert_relative_eq!(run.solution()[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn gauss_jordan_alternates_normalize_and_eliminate() {
        let (a, b) = textbook();
        let run = gauss_jordan(&a, &b).unwrap();
        let normalize_at: Vec<usize> = run
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s.op, GaussJordanOp::Normalize { .. }))
            .map(|(k, _)| k)
            .collect();
        assert_eq!(normalize_at, vec![0, 3, 6]);
    }

    #[test]
    fn state_zero_is_the_input() {
        let (a, b) = textbook();
        let run = gauss_jordan(&a, &b).unwrap();
        let s0 = run.state_at(0).unwrap();
        assert_eq!(s0.shape(), (3, 4));
        assert_eq!(s0[(1, 0)], -3.0);
        assert_eq!(s0[(2, 3)], -3.0);
        assert!(run.state_at(10).is_none());
    }

    #[test]
    fn order_one_system() {
        let a = DMatrix::from_row_slice(1, 1, &[4.0]);
        let b = DVector::from_vec(vec![2.0]);
        let gauss = gaussian_elimination(&a, &b).unwrap();
        assert!(gauss.is_empty());
        assert_relative_eq!(gauss.solution()[0], 0.5);
        let gj = gauss_jordan(&a, &b).unwrap();
        assert_eq!(gj.len(), 1);
        assert_relative_eq!(gj.solution()[0], 0.5);
    }
}
