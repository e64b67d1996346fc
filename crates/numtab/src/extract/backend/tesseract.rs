use std::time::Duration;

use image::GrayImage;

use super::{
    cached_probe, encode_png, run_with_timeout, BackendError, BackendKind, TextBackend,
    TextDetection,
};

const WHITELIST: &str = "tessedit_char_whitelist=0123456789.,-";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

fn probe_tesseract(path: &str) -> bool {
    cached_probe(&format!("tesseract:{path}"), || {
        run_with_timeout(path, &["--version".to_string()], Vec::new(), PROBE_TIMEOUT).is_ok()
    })
}

/// Tesseract in TSV mode: word boxes with confidences.
#[derive(Debug, Clone)]
pub struct TesseractTsv {
    path: String,
    psm: u8,
    timeout: Duration,
}

impl TesseractTsv {
    pub fn new(path: impl Into<String>, psm: u8, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            psm,
            timeout,
        }
    }
}

impl TextBackend for TesseractTsv {
    fn name(&self) -> &str {
        "tesseract-tsv"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Positioned
    }

    fn probe(&self) -> bool {
        probe_tesseract(&self.path)
    }

    fn detect(&self, image: &GrayImage) -> Result<Vec<TextDetection>, BackendError> {
        let args = [
            "stdin".to_string(),
            "stdout".to_string(),
            "--psm".to_string(),
            self.psm.to_string(),
            "tsv".to_string(),
        ];
        let out = run_with_timeout(&self.path, &args, encode_png(image)?, self.timeout)?;
        parse_tsv(&String::from_utf8_lossy(&out))
    }
}

/// Parse Tesseract TSV output, keeping word-level rows with text.
pub(crate) fn parse_tsv(tsv: &str) -> Result<Vec<TextDetection>, BackendError> {
    let mut lines = tsv.lines();
    let header: Vec<&str> = match lines.next() {
        Some(h) => h.split('\t').collect(),
        None => return Ok(Vec::new()),
    };
    let col = |name: &str| {
        header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| BackendError::Parse(format!("TSV header lacks '{name}'")))
    };
    let (level, left, top, width, height, conf, text) = (
        col("level")?,
        col("left")?,
        col("top")?,
        col("width")?,
        col("height")?,
        col("conf")?,
        col("text")?,
    );

    let mut detections = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < header.len() || fields[level].trim() != "5" {
            continue;
        }
        let word = fields[text].trim();
        let confidence: f32 = fields[conf].trim().parse().unwrap_or(-1.0);
        if word.is_empty() || confidence < 0.0 {
            continue;
        }
        let num = |idx: usize| -> Result<f32, BackendError> {
            fields[idx]
                .trim()
                .parse()
                .map_err(|_| BackendError::Parse(format!("bad TSV number '{}'", fields[idx])))
        };
        let (x, y, w, h) = (num(left)?, num(top)?, num(width)?, num(height)?);
        detections.push(TextDetection {
            text: word.to_string(),
            bbox: Some([x, y, x + w, y + h]),
            confidence: (confidence / 100.0).clamp(0.0, 1.0),
        });
    }
    Ok(detections)
}

/// Tesseract restricted to digits and `.,-`, plain text output.
#[derive(Debug, Clone)]
pub struct TesseractWhitelist {
    path: String,
    psm: u8,
    timeout: Duration,
    name: String,
}

impl TesseractWhitelist {
    pub fn new(path: impl Into<String>, psm: u8, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            psm,
            timeout,
            name: format!("tesseract-whitelist-psm{psm}"),
        }
    }
}

impl TextBackend for TesseractWhitelist {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Whitelist
    }

    fn probe(&self) -> bool {
        probe_tesseract(&self.path)
    }

    fn detect(&self, image: &GrayImage) -> Result<Vec<TextDetection>, BackendError> {
        let args = [
            "stdin".to_string(),
            "stdout".to_string(),
            "--psm".to_string(),
            self.psm.to_string(),
            "-c".to_string(),
            WHITELIST.to_string(),
        ];
        let out = run_with_timeout(&self.path, &args, encode_png(image)?, self.timeout)?;
        Ok(String::from_utf8_lossy(&out)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| TextDetection {
                text: l.to_string(),
                bbox: None,
                confidence: 1.0,
            })
            .collect())
    }
}
