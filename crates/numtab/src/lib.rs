//! numtab: numerical-methods toolkit for worked exercises.
//!
//! The crate covers the direct solvers and the interpolation method taught
//! in an introductory numerical analysis course, plus a best-effort reader
//! for x/y tables photographed from exercise sheets:
//!
//! 1. **Linear systems** – LU (Doolittle), Cholesky, Gaussian and
//!    Gauss-Jordan elimination with step-by-step traces.
//! 2. **Interpolation** – Newton divided differences, polynomial expansion
//!    and evaluation, fit statistics.
//! 3. **Extraction** – image preprocessing, OCR through external engines,
//!    table reconstruction.
//! 4. **Text input** – matrices, vectors and point lists from plain text.
//!
//! # Public API
//! - [`solve_lu`], [`solve_cholesky`], [`gaussian_elimination`],
//!   [`gauss_jordan`] for linear systems
//! - [`newton_interpolate`] and [`evaluate`] for interpolation
//! - [`TableExtractor`] and [`extract_table_from_image`] for images
//!
//! Numeric routines fail fast with typed errors. Extraction fails soft:
//! engine failures are logged and only an unusable result is reported.

pub mod extract;
pub mod interp;
pub mod linalg;
pub mod textio;

pub use extract::config::{
    BackendChoice, BackendConfig, ConfigError, ExtractConfig, PreprocessConfig,
    RecognitionConfig, TableConfig, VariantKind,
};
pub use extract::table::{ExtractedTable, TableStrategy};
pub use extract::tokens::NumberToken;
pub use extract::{
    extract_table_from_image, ExtractError, ExtractionReport, TableExtractor, TableOutcome,
};
pub use interp::{
    divided_differences, evaluate, newton_interpolate, DividedDifferenceTable, EvalRegion,
    FitReport, Interpolant, InterpolationError, NewtonInterpolation, NewtonPolynomial, NewtonTerm,
};
pub use linalg::{
    cholesky_decompose, gauss_jordan, gaussian_elimination, lu_decompose, solve_cholesky,
    solve_lu, CholeskyConfig, CholeskyFactor, CholeskySolution, EliminationRun, GaussJordanStep,
    GaussStep, LinalgError, LuFactors, LuSolution,
};
pub use textio::{parse_matrix, parse_points, parse_vector, ParseError};

#[cfg(test)]
pub(crate) mod test_utils;
