use std::path::Path;

use thiserror::Error;

/// Failure to load an [`ExtractConfig`] from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One preprocessed rendition of the input image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Clahe,
    DenoiseClahe,
    Sharpened,
    Otsu,
    Adaptive,
    AdaptiveInverted,
    Morphology,
}

impl VariantKind {
    /// Canonical production order.
    pub const ALL: [VariantKind; 7] = [
        VariantKind::Clahe,
        VariantKind::DenoiseClahe,
        VariantKind::Sharpened,
        VariantKind::Otsu,
        VariantKind::Adaptive,
        VariantKind::AdaptiveInverted,
        VariantKind::Morphology,
    ];

    pub fn label(self) -> &'static str {
        match self {
            VariantKind::Clahe => "clahe",
            VariantKind::DenoiseClahe => "denoise_clahe",
            VariantKind::Sharpened => "sharpened",
            VariantKind::Otsu => "otsu",
            VariantKind::Adaptive => "adaptive",
            VariantKind::AdaptiveInverted => "adaptive_inverted",
            VariantKind::Morphology => "morphology",
        }
    }
}

/// Edge-preserving denoise parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BilateralParams {
    /// Window radius in pixels.
    pub radius: u32,
    /// Intensity sigma (0..255 scale).
    pub sigma_color: f32,
    /// Spatial sigma in pixels.
    pub sigma_space: f32,
}

impl Default for BilateralParams {
    fn default() -> Self {
        Self {
            radius: 4,
            sigma_color: 75.0,
            sigma_space: 75.0,
        }
    }
}

/// Contrast-limited adaptive histogram equalization.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClaheParams {
    /// Tiles per axis.
    pub tiles: u32,
    /// Histogram clip limit, relative to a uniform histogram.
    pub clip_limit: f32,
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            tiles: 8,
            clip_limit: 3.0,
        }
    }
}

/// Image preprocessing controls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Images whose smaller side is below this are upscaled to it.
    pub min_side_px: u32,
    pub bilateral: BilateralParams,
    pub clahe: ClaheParams,
    /// Local threshold window radius (window side `2r + 1`).
    pub adaptive_radius: u32,
    /// Offset subtracted from the local mean.
    pub adaptive_c: i16,
    /// Structuring element radius for close/open.
    pub morph_radius: u8,
    /// Enabled variants. Output order is always [`VariantKind::ALL`] order.
    pub variants: Vec<VariantKind>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_side_px: 800,
            bilateral: BilateralParams::default(),
            clahe: ClaheParams::default(),
            adaptive_radius: 5,
            adaptive_c: 2,
            morph_radius: 1,
            variants: VariantKind::ALL.to_vec(),
        }
    }
}

/// Token filtering and deduplication.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Detections below this confidence in [0, 1] are dropped.
    pub min_confidence: f32,
    /// Fewer positioned tokens than this triggers the whitelist fallback,
    /// and fewer kept tokens than this fails the extraction.
    pub min_tokens: usize,
    /// Two tokens are duplicates when their values differ by less than this...
    pub dedup_value_tol: f64,
    /// ...and both coordinates differ by less than this (pixels).
    pub dedup_position_px: f32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            min_tokens: 4,
            dedup_value_tol: 1e-3,
            dedup_position_px: 12.0,
        }
    }
}

/// Row grouping and table selection.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Row tolerance as a fraction of image height.
    pub row_tolerance_frac: f32,
    /// Lower bound on the row tolerance (pixels).
    pub row_tolerance_min_px: f32,
    /// Take the first valid row pair in index order. When false, the valid
    /// pair with the most columns wins (ties keep index order).
    pub first_match_wins: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_tolerance_frac: 0.04,
            row_tolerance_min_px: 20.0,
            first_match_wins: true,
        }
    }
}

impl TableConfig {
    pub fn row_tolerance(&self, image_height: u32) -> f32 {
        (self.row_tolerance_frac * image_height as f32).max(self.row_tolerance_min_px)
    }
}

/// Positioned OCR engines, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendChoice {
    SceneText,
    TesseractTsv,
}

/// External OCR process settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub order: Vec<BackendChoice>,
    /// Run the digit-whitelist pass when positioned engines come up short.
    pub whitelist_fallback: bool,
    /// Tesseract executable.
    pub tesseract_path: String,
    /// Page segmentation mode for the positioned TSV pass.
    pub tsv_psm: u8,
    /// Page segmentation modes for the whitelist pass.
    pub whitelist_psm: Vec<u8>,
    /// Scene-text detector: program followed by its arguments. It receives a
    /// PNG on stdin and prints a JSON array of detections on stdout.
    pub scene_text_command: Option<Vec<String>>,
    /// Per-call timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            order: vec![BackendChoice::SceneText, BackendChoice::TesseractTsv],
            whitelist_fallback: true,
            tesseract_path: "tesseract".to_string(),
            tsv_psm: 6,
            whitelist_psm: vec![6, 4, 11],
            scene_text_command: None,
            timeout_ms: 30_000,
        }
    }
}

/// Top-level extraction configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub preprocess: PreprocessConfig,
    pub recognition: RecognitionConfig,
    pub table: TableConfig,
    pub backends: BackendConfig,
}

impl ExtractConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
