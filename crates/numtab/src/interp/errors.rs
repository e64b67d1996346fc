use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpolationError {
    #[error("empty input vector(s)")]
    EmptyInput,

    #[error("unequal length: x has {x_len} elements, y has {y_len}")]
    UnequalLength { x_len: usize, y_len: usize },

    #[error("non-finite value in {which} at index {idx}")]
    NonFinite { which: &'static str, idx: usize },

    #[error("duplicate x-values detected: {x1} and {x2}")]
    DuplicateX { x1: f64, x2: f64 },
}
