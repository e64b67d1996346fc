use thiserror::Error;

/// Extraction failures that reach the caller. Engine failures are absorbed
/// and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("too few numbers detected ({found})")]
    NoNumbersDetected { found: usize },

    #[error("no x/y table could be formed from {rows} row(s)")]
    InvalidTableShape { rows: usize },

    #[error("no OCR backend is available")]
    NoBackendAvailable,
}
