//! Shared helpers for unit tests: synthetic images and a scripted OCR engine.

use image::{GrayImage, Luma};

use crate::extract::backend::{BackendError, BackendKind, TextBackend, TextDetection};

/// Horizontal ramp from 0 to 255.
pub(crate) fn gradient_image(w: u32, h: u32) -> GrayImage {
    GrayImage::from_fn(w, h, |x, _| {
        Luma([(x * 255 / w.saturating_sub(1).max(1)) as u8])
    })
}

/// Light background with dark vertical bars 8 px wide every 16 px.
pub(crate) fn draw_bars_image(w: u32, h: u32) -> GrayImage {
    GrayImage::from_fn(w, h, |x, _| {
        let pix = if (x / 8) % 2 == 1 { 30 } else { 220 };
        Luma([pix])
    })
}

/// A 20×10 box centered on `(cx, cy)`.
pub(crate) fn detection(text: &str, cx: f32, cy: f32, confidence: f32) -> TextDetection {
    TextDetection {
        text: text.to_string(),
        bbox: Some([cx - 10.0, cy - 5.0, cx + 10.0, cy + 5.0]),
        confidence,
    }
}

enum Script {
    Detections(Vec<TextDetection>),
    Fail(fn() -> BackendError),
}

/// OCR engine returning the same answer for every image.
pub(crate) struct MockBackend {
    name: String,
    kind: BackendKind,
    available: bool,
    script: Script,
}

impl MockBackend {
    pub(crate) fn positioned(name: &str, detections: Vec<TextDetection>) -> Self {
        Self {
            name: name.to_string(),
            kind: BackendKind::Positioned,
            available: true,
            script: Script::Detections(detections),
        }
    }

    /// One unpositioned detection per line of `text`.
    pub(crate) fn whitelist(name: &str, text: &str) -> Self {
        let detections = text
            .lines()
            .map(|line| TextDetection {
                text: line.to_string(),
                bbox: None,
                confidence: 1.0,
            })
            .collect();
        Self {
            name: name.to_string(),
            kind: BackendKind::Whitelist,
            available: true,
            script: Script::Detections(detections),
        }
    }

    pub(crate) fn failing(name: &str, err: fn() -> BackendError) -> Self {
        Self {
            name: name.to_string(),
            kind: BackendKind::Positioned,
            available: true,
            script: Script::Fail(err),
        }
    }

    pub(crate) fn unavailable(name: &str) -> Self {
        Self {
            available: false,
            ..Self::positioned(name, Vec::new())
        }
    }
}

impl TextBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn probe(&self) -> bool {
        self.available
    }

    fn detect(&self, _image: &GrayImage) -> Result<Vec<TextDetection>, BackendError> {
        match &self.script {
            Script::Detections(d) => Ok(d.clone()),
            Script::Fail(err) => Err(err()),
        }
    }
}
