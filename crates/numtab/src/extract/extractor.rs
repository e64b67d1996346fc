//! High-level extraction API.
//!
//! [`TableExtractor`] owns an [`ExtractConfig`] and the OCR engines built
//! from it. Create once, extract from many images.

use std::path::Path;
use std::time::Duration;

use image::DynamicImage;

use super::backend::{SceneTextCommand, TesseractTsv, TesseractWhitelist, TextBackend};
use super::config::{BackendChoice, BackendConfig, ConfigError, ExtractConfig};
use super::preprocess::preprocess;
use super::recognize::{recognize, BackendStatus};
use super::table::{reconstruct, ExtractedTable, TableStrategy};
use super::ExtractError;

/// Diagnostics of one extraction call.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ExtractionReport {
    pub image_size: [u32; 2],
    /// Size after upscaling; all variants share it.
    pub working_size: [u32; 2],
    pub variants: Vec<String>,
    pub backends: Vec<BackendStatus>,
    pub fallback_used: bool,
    pub raw_tokens: usize,
    pub kept_tokens: usize,
    pub rows: usize,
    pub strategy: TableStrategy,
}

/// Soft-failing result for callers that only want the numbers.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct TableOutcome {
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
    pub success: bool,
}

/// Primary extraction interface.
///
/// # Examples
///
/// ```no_run
/// use numtab::TableExtractor;
///
/// let image = image::open("table.png").unwrap();
/// let extractor = TableExtractor::new();
/// match extractor.extract(&image) {
///     Ok((table, report)) => println!("{:?} via {:?}", table, report.strategy),
///     Err(err) => eprintln!("enter the values by hand: {err}"),
/// }
/// ```
pub struct TableExtractor {
    config: ExtractConfig,
    positioned: Vec<Box<dyn TextBackend>>,
    fallback: Vec<Box<dyn TextBackend>>,
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TableExtractor {
    /// Default configuration and engines.
    pub fn new() -> Self {
        Self::with_config(ExtractConfig::default())
    }

    /// Engines are built from `config.backends`.
    pub fn with_config(config: ExtractConfig) -> Self {
        let (positioned, fallback) = build_backends(&config.backends);
        Self {
            config,
            positioned,
            fallback,
        }
    }

    /// Explicit engines; `config.backends` is ignored.
    pub fn with_backends(
        config: ExtractConfig,
        positioned: Vec<Box<dyn TextBackend>>,
        fallback: Vec<Box<dyn TextBackend>>,
    ) -> Self {
        Self {
            config,
            positioned,
            fallback,
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::with_config(ExtractConfig::from_json_file(path)?))
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Extract the x/y table from `image`.
    pub fn extract(
        &self,
        image: &DynamicImage,
    ) -> Result<(ExtractedTable, ExtractionReport), ExtractError> {
        let _span = tracing::info_span!("extract", width = image.width(), height = image.height())
            .entered();

        let variants = preprocess(image, &self.config.preprocess);
        let working = variants
            .first()
            .map(|v| v.image.dimensions())
            .unwrap_or((image.width(), image.height()));
        tracing::info!(variants = variants.len(), "preprocessing done");

        let recognition = recognize(
            &variants,
            &self.positioned,
            &self.fallback,
            &self.config.recognition,
        )?;
        let rec = reconstruct(&recognition.tokens, working.1, &self.config.table)?;
        tracing::info!(
            points = rec.table.len(),
            strategy = ?rec.strategy,
            "table reconstructed"
        );

        let report = ExtractionReport {
            image_size: [image.width(), image.height()],
            working_size: [working.0, working.1],
            variants: variants.iter().map(|v| v.label().to_string()).collect(),
            backends: recognition.backends,
            fallback_used: recognition.fallback_used,
            raw_tokens: recognition.raw_count,
            kept_tokens: recognition.tokens.len(),
            rows: rec.rows,
            strategy: rec.strategy,
        };
        Ok((rec.table, report))
    }

    /// Like [`extract`](Self::extract), but failure yields empty lists and
    /// `success = false`.
    pub fn extract_outcome(&self, image: &DynamicImage) -> TableOutcome {
        match self.extract(image) {
            Ok((table, _)) => TableOutcome {
                x_values: table.x_values,
                y_values: table.y_values,
                success: true,
            },
            Err(err) => {
                tracing::warn!(error = %err, "table extraction failed");
                TableOutcome::default()
            }
        }
    }
}

fn build_backends(cfg: &BackendConfig) -> (Vec<Box<dyn TextBackend>>, Vec<Box<dyn TextBackend>>) {
    let timeout = Duration::from_millis(cfg.timeout_ms);
    let mut positioned: Vec<Box<dyn TextBackend>> = Vec::new();
    for choice in &cfg.order {
        match choice {
            BackendChoice::SceneText => {
                match cfg
                    .scene_text_command
                    .as_deref()
                    .and_then(|cmd| SceneTextCommand::from_command_line(cmd, timeout))
                {
                    Some(backend) => positioned.push(Box::new(backend)),
                    None => tracing::debug!("no scene-text command configured"),
                }
            }
            BackendChoice::TesseractTsv => positioned.push(Box::new(TesseractTsv::new(
                cfg.tesseract_path.clone(),
                cfg.tsv_psm,
                timeout,
            ))),
        }
    }

    let fallback: Vec<Box<dyn TextBackend>> = if cfg.whitelist_fallback {
        cfg.whitelist_psm
            .iter()
            .map(|&psm| {
                Box::new(TesseractWhitelist::new(cfg.tesseract_path.clone(), psm, timeout))
                    as Box<dyn TextBackend>
            })
            .collect()
    } else {
        Vec::new()
    };
    (positioned, fallback)
}

/// Extract with the default configuration, never failing.
pub fn extract_table_from_image(image: &DynamicImage) -> TableOutcome {
    TableExtractor::new().extract_outcome(image)
}
