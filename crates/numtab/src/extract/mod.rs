//! Image to x/y table extraction.
//!
//! Pipeline stages:
//!
//! 1. **Preprocess** – grayscale, upscale, denoise, CLAHE, binarize, sharpen,
//!    morphology; several labeled variants.
//! 2. **Recognize** – OCR engines over every variant, numeric tokens with
//!    positions, merged and deduplicated.
//! 3. **Table** – row grouping and x/y selection.

pub mod backend;
pub mod config;
mod errors;
mod extractor;
pub mod preprocess;
pub mod recognize;
pub mod table;
pub mod tokens;

pub use errors::ExtractError;
pub use extractor::{extract_table_from_image, ExtractionReport, TableExtractor, TableOutcome};
