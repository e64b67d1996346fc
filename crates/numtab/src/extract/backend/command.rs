use std::time::Duration;

use image::GrayImage;
use serde::Deserialize;

use super::{
    cached_probe, encode_png, find_executable, run_with_timeout, BackendError, BackendKind,
    TextBackend, TextDetection,
};

/// External scene-text detector.
///
/// The command reads a PNG from stdin and prints a JSON array on stdout:
///
/// ```json
/// [{"text": "2.5", "confidence": 0.93, "bbox": [12, 40, 58, 71]},
///  {"text": "7", "confidence": 0.88, "bbox": [[90, 41], [120, 41], [120, 70], [90, 70]]}]
/// ```
///
/// `bbox` is either `[x_min, y_min, x_max, y_max]` or a polygon of corner
/// points; `confidence` defaults to 1.
#[derive(Debug, Clone)]
pub struct SceneTextCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

#[derive(Deserialize)]
struct RawDetection {
    text: String,
    #[serde(default = "full_confidence")]
    confidence: f32,
    #[serde(default)]
    bbox: Option<RawBox>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBox {
    Rect([f32; 4]),
    Polygon(Vec<[f32; 2]>),
}

fn full_confidence() -> f32 {
    1.0
}

impl RawBox {
    fn bounds(&self) -> Option<[f32; 4]> {
        match self {
            RawBox::Rect(r) => Some(*r),
            RawBox::Polygon(pts) if !pts.is_empty() => {
                let mut b = [f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY];
                for [x, y] in pts {
                    b[0] = b[0].min(*x);
                    b[1] = b[1].min(*y);
                    b[2] = b[2].max(*x);
                    b[3] = b[3].max(*y);
                }
                Some(b)
            }
            RawBox::Polygon(_) => None,
        }
    }
}

impl SceneTextCommand {
    /// `command[0]` is the program, the rest its arguments. `None` for an
    /// empty command.
    pub fn from_command_line(command: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }
}

impl TextBackend for SceneTextCommand {
    fn name(&self) -> &str {
        "scene-text"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Positioned
    }

    fn probe(&self) -> bool {
        cached_probe(&format!("scene-text:{}", self.program), || {
            find_executable(&self.program)
        })
    }

    fn detect(&self, image: &GrayImage) -> Result<Vec<TextDetection>, BackendError> {
        let out = run_with_timeout(&self.program, &self.args, encode_png(image)?, self.timeout)?;
        parse_detections(&out)
    }
}

pub(crate) fn parse_detections(json: &[u8]) -> Result<Vec<TextDetection>, BackendError> {
    let raw: Vec<RawDetection> =
        serde_json::from_slice(json).map_err(|e| BackendError::Parse(e.to_string()))?;
    Ok(raw
        .into_iter()
        .map(|d| TextDetection {
            bbox: d.bbox.as_ref().and_then(RawBox::bounds),
            text: d.text,
            confidence: d.confidence,
        })
        .collect())
}
