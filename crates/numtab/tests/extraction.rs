//! Extraction pipeline through the public API, with scripted OCR engines.

use std::time::Duration;

use image::{DynamicImage, GrayImage};
use numtab::extract::backend::{
    BackendError, BackendKind, SceneTextCommand, TextBackend, TextDetection,
};
use numtab::{
    newton_interpolate, ExtractConfig, ExtractError, Interpolant, PreprocessConfig,
    TableExtractor, TableStrategy, VariantKind,
};

struct Scripted {
    kind: BackendKind,
    detections: Vec<TextDetection>,
}

impl TextBackend for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn probe(&self) -> bool {
        true
    }

    fn detect(&self, _image: &GrayImage) -> Result<Vec<TextDetection>, BackendError> {
        Ok(self.detections.clone())
    }
}

fn word(text: &str, x: f32, y: f32) -> TextDetection {
    TextDetection {
        text: text.to_string(),
        bbox: Some([x, y, x + 30.0, y + 20.0]),
        confidence: 0.95,
    }
}

fn config() -> ExtractConfig {
    ExtractConfig {
        preprocess: PreprocessConfig {
            min_side_px: 100,
            variants: vec![VariantKind::Clahe, VariantKind::Adaptive],
            ..PreprocessConfig::default()
        },
        ..ExtractConfig::default()
    }
}

fn page() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(300, 200, image::Luma([230])))
}

#[test]
fn labeled_two_row_table_feeds_newton() {
    // OCR confusions: "O" for 0, "l" for 1, "Z" for 2, "," decimal mark.
    let detections = vec![
        word("x", 10.0, 40.0),
        word("O", 60.0, 42.0),
        word("l", 110.0, 40.0),
        word("Z", 160.0, 41.0),
        word("y", 10.0, 120.0),
        word("1,0", 60.0, 120.0),
        word("2", 110.0, 122.0),
        word("5", 160.0, 119.0),
    ];
    let extractor = TableExtractor::with_backends(
        config(),
        vec![Box::new(Scripted {
            kind: BackendKind::Positioned,
            detections,
        })],
        Vec::new(),
    );

    let (table, report) = extractor.extract(&page()).unwrap();
    assert_eq!(table.x_values, vec![0.0, 1.0, 2.0]);
    assert_eq!(table.y_values, vec![1.0, 2.0, 5.0]);
    assert_eq!(report.strategy, TableStrategy::RowPair { x_row: 0, y_row: 1 });
    assert_eq!(report.variants, vec!["clahe", "adaptive"]);
    assert!(!report.fallback_used);

    let interp = newton_interpolate(&table.x_values, &table.y_values).unwrap();
    assert!((interp.polynomial.eval(3.0) - 10.0).abs() < 1e-10);
}

#[test]
fn whitelist_only_engine_splits_stream() {
    let extractor = TableExtractor::with_backends(
        config(),
        Vec::new(),
        vec![Box::new(Scripted {
            kind: BackendKind::Whitelist,
            detections: vec![TextDetection {
                text: "0 1 2 3 4 6 9 15".to_string(),
                bbox: None,
                confidence: 1.0,
            }],
        })],
    );
    let (table, report) = extractor.extract(&page()).unwrap();
    assert_eq!(table.x_values, vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(table.y_values, vec![4.0, 6.0, 9.0, 15.0]);
    assert_eq!(report.strategy, TableStrategy::FlatSplit);
    assert!(report.fallback_used);
}

#[test]
fn no_engines_soft_fails() {
    let extractor = TableExtractor::with_backends(config(), Vec::new(), Vec::new());
    assert_eq!(
        extractor.extract(&page()).unwrap_err(),
        ExtractError::NoBackendAvailable
    );
    let outcome = extractor.extract_outcome(&page());
    assert!(!outcome.success);
    assert!(outcome.x_values.is_empty() && outcome.y_values.is_empty());
}

#[cfg(unix)]
#[test]
fn scene_text_command_runs_as_child_process() {
    let script = r#"cat > /dev/null; echo '[
        {"text": "1", "confidence": 0.9, "bbox": [20, 20, 40, 40]},
        {"text": "2", "confidence": 0.9, "bbox": [80, 20, 100, 40]},
        {"text": "3", "confidence": 0.9, "bbox": [20, 150, 40, 170]},
        {"text": "7", "confidence": 0.9, "bbox": [80, 150, 100, 170]}
    ]'"#;
    let command = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
    let backend = SceneTextCommand::from_command_line(&command, Duration::from_secs(10)).unwrap();
    assert!(backend.probe());

    let extractor = TableExtractor::with_backends(config(), vec![Box::new(backend)], Vec::new());
    let (table, report) = extractor.extract(&page()).unwrap();
    assert_eq!(table.x_values, vec![1.0, 2.0]);
    assert_eq!(table.y_values, vec![3.0, 7.0]);
    assert_eq!(report.kept_tokens, 4);
    assert_eq!(report.raw_tokens, 8);
}
