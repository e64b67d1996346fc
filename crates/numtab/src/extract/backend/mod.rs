//! OCR engines behind one trait.
//!
//! Every engine is an external process fed a PNG on stdin. Calls are bounded
//! by a timeout: the child is killed when it overruns and pipes its
//! descendants keep open are abandoned. Availability is
//! probed once per process and cached.

mod command;
mod tesseract;

pub use command::SceneTextCommand;
pub use tesseract::{TesseractTsv, TesseractWhitelist};

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use image::{GrayImage, ImageFormat};
use once_cell::sync::{Lazy, OnceCell};
use thiserror::Error;

/// Whether an engine reports where its text sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Detections carry bounding boxes.
    Positioned,
    /// Plain text only; tokens land at (0, 0).
    Whitelist,
}

/// One text fragment as reported by an engine.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextDetection {
    pub text: String,
    /// `[x_min, y_min, x_max, y_max]` in pixels.
    pub bbox: Option<[f32; 4]>,
    /// Engine confidence in [0, 1].
    pub confidence: f32,
}

impl TextDetection {
    pub fn center(&self) -> Option<[f32; 2]> {
        self.bbox
            .map(|[x0, y0, x1, y1]| [(x0 + x1) * 0.5, (y0 + y1) * 0.5])
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' timed out after {timeout_ms} ms")]
    Timeout { program: String, timeout_ms: u64 },
    #[error("'{program}' exited with {status:?}: {stderr}")]
    Exit {
        program: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("unparseable engine output: {0}")]
    Parse(String),
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

pub trait TextBackend {
    fn name(&self) -> &str;
    fn kind(&self) -> BackendKind;
    /// True when the engine can run on this machine. Expected to be cheap
    /// after the first call.
    fn probe(&self) -> bool;
    fn detect(&self, image: &GrayImage) -> Result<Vec<TextDetection>, BackendError>;
}

// ── Probe cache ────────────────────────────────────────────────────────────

static PROBES: Lazy<Mutex<HashMap<String, Arc<OnceCell<bool>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Run `probe` at most once per process for `key`. Concurrent callers for
/// the same key block on the first probe instead of repeating it.
pub(crate) fn cached_probe(key: &str, probe: impl FnOnce() -> bool) -> bool {
    let cell = {
        let mut map = match PROBES.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(map.entry(key.to_string()).or_default())
    };
    *cell.get_or_init(|| {
        let available = probe();
        tracing::debug!(backend = key, available, "probed OCR backend");
        available
    })
}

/// Locate `program` either as a path or on `PATH`.
pub(crate) fn find_executable(program: &str) -> bool {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

// ── Process runner ─────────────────────────────────────────────────────────

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const READER_GRACE: Duration = Duration::from_millis(50);

pub(crate) fn encode_png(image: &GrayImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

/// Run `program args…` with `input` on stdin and return its stdout.
///
/// The whole call is bounded by `timeout`: the child is killed if it is still
/// running at the deadline, and output still held open by its descendants
/// (a wrapper script that backgrounded the engine) is abandoned instead of
/// waited for.
pub(crate) fn run_with_timeout(
    program: &str,
    args: &[String],
    input: Vec<u8>,
    timeout: Duration,
) -> Result<Vec<u8>, BackendError> {
    let deadline = Instant::now() + timeout;
    let timed_out = || BackendError::Timeout {
        program: program.to_string(),
        timeout_ms: timeout.as_millis() as u64,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| BackendError::Spawn {
            program: program.to_string(),
            source,
        })?;

    // Pipes are serviced on detached threads so neither a chatty child nor a
    // grandchild holding a pipe open can stall the caller past the deadline.
    if let Some(mut stdin) = child.stdin.take() {
        thread::spawn(move || {
            let _ = stdin.write_all(&input);
        });
    }
    let stdout_rx = spawn_reader(child.stdout.take());
    let stderr_rx = spawn_reader(child.stderr.take());

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::debug!(program, "killed overrunning OCR engine");
                return Err(timed_out());
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                let _ = child.kill();
                return Err(BackendError::Spawn {
                    program: program.to_string(),
                    source,
                });
            }
        }
    };

    let stdout = collect_before(&stdout_rx, deadline).ok_or_else(timed_out)?;
    let stderr = collect_before(&stderr_rx, deadline).unwrap_or_default();

    if !status.success() {
        return Err(BackendError::Exit {
            program: program.to_string(),
            status: status.code(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }
    Ok(stdout)
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

/// Output of a reader thread, or `None` if the pipe is still open at
/// `deadline`. A child that exits right at the deadline gets a short grace
/// period for its reader to drain.
fn collect_before(rx: &mpsc::Receiver<Vec<u8>>, deadline: Instant) -> Option<Vec<u8>> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    rx.recv_timeout(remaining.max(READER_GRACE)).ok()
}
