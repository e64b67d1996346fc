use thiserror::Error;

/// Errors raised by the direct linear solvers.
///
/// All of them are fatal: the solvers never pivot, reorder or coerce input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinalgError {
    #[error("empty matrix")]
    Empty,

    #[error("matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("dimension mismatch: matrix is {n}x{n}, right-hand side has {got} entries")]
    DimensionMismatch { n: usize, got: usize },

    #[error("non-finite value at ({row}, {col})")]
    NonFinite { row: usize, col: usize },

    #[error("singular matrix: zero pivot {value:e} at row {pivot}")]
    SingularMatrix { pivot: usize, value: f64 },

    #[error("matrix is not symmetric: a[{row},{col}] differs from a[{col},{row}] by {delta:e}")]
    NotSymmetric { row: usize, col: usize, delta: f64 },

    #[error("matrix is not positive definite: radicand {radicand} at row {row}")]
    NotPositiveDefinite { row: usize, radicand: f64 },
}
