//! Run OCR engines over preprocessed variants and collect numeric tokens.

use super::backend::{BackendKind, TextBackend};
use super::config::RecognitionConfig;
use super::preprocess::Variant;
use super::tokens::{dedup_tokens, tokens_from_detection, NumberToken};
use super::ExtractError;

/// Availability of one engine for the current call.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BackendStatus {
    pub name: String,
    pub kind: BackendKind,
    pub available: bool,
}

/// Tokens plus bookkeeping for the extraction report.
#[derive(Debug, Clone)]
pub struct Recognition {
    pub tokens: Vec<NumberToken>,
    pub raw_count: usize,
    pub backends: Vec<BackendStatus>,
    pub fallback_used: bool,
}

fn probe_all<'a>(
    backends: &'a [Box<dyn TextBackend>],
    statuses: &mut Vec<BackendStatus>,
) -> Vec<&'a dyn TextBackend> {
    let mut available = Vec::new();
    for backend in backends {
        let ok = backend.probe();
        statuses.push(BackendStatus {
            name: backend.name().to_string(),
            kind: backend.kind(),
            available: ok,
        });
        if ok {
            available.push(backend.as_ref());
        } else {
            tracing::debug!(backend = backend.name(), "backend unavailable, skipped");
        }
    }
    available
}

/// Every backend over every variant. A failing call contributes nothing.
fn run_backends(
    variants: &[Variant],
    backends: &[&dyn TextBackend],
    min_confidence: f32,
) -> Vec<NumberToken> {
    let mut tokens = Vec::new();
    for variant in variants {
        let _variant_span = tracing::info_span!("variant", label = variant.label()).entered();
        for backend in backends {
            let _backend_span = tracing::info_span!("backend", name = backend.name()).entered();
            let detections = match backend.detect(&variant.image) {
                Ok(d) => d,
                Err(err) => {
                    tracing::warn!(error = %err, "OCR call failed, counting zero tokens");
                    continue;
                }
            };
            let before = tokens.len();
            for det in &detections {
                let found = tokens_from_detection(det, min_confidence);
                let found = match backend.kind() {
                    BackendKind::Positioned => found,
                    BackendKind::Whitelist => found
                        .into_iter()
                        .map(|t| NumberToken::unpositioned(t.value, t.confidence))
                        .collect(),
                };
                for t in &found {
                    tracing::trace!(value = t.value, x = t.x, y = t.y, "token");
                }
                tokens.extend(found);
            }
            tracing::debug!(
                detections = detections.len(),
                tokens = tokens.len() - before,
                "backend pass"
            );
        }
    }
    tokens
}

/// Positioned engines first; the whitelist engines only run when those are
/// missing or produce fewer than `min_tokens` distinct tokens. Results are
/// merged and deduplicated.
pub fn recognize(
    variants: &[Variant],
    positioned: &[Box<dyn TextBackend>],
    fallback: &[Box<dyn TextBackend>],
    cfg: &RecognitionConfig,
) -> Result<Recognition, ExtractError> {
    let mut statuses = Vec::new();
    let live_positioned = probe_all(positioned, &mut statuses);

    let primary = run_backends(variants, &live_positioned, cfg.min_confidence);
    let mut raw_count = primary.len();
    // Repeated reads across variants must not count towards `min_tokens`.
    let mut tokens = dedup_tokens(primary, cfg.dedup_value_tol, cfg.dedup_position_px);
    let mut fallback_used = false;
    let mut any_available = !live_positioned.is_empty();

    if tokens.len() < cfg.min_tokens {
        let live_fallback = probe_all(fallback, &mut statuses);
        any_available |= !live_fallback.is_empty();
        if !live_fallback.is_empty() {
            tracing::info!(
                positioned_tokens = tokens.len(),
                "running whitelist fallback"
            );
            // Whitelist output has no reliable confidence; keep every token.
            let extra = run_backends(variants, &live_fallback, 0.0);
            raw_count += extra.len();
            tokens.extend(extra);
            tokens = dedup_tokens(tokens, cfg.dedup_value_tol, cfg.dedup_position_px);
            fallback_used = true;
        }
    }

    if !any_available {
        return Err(ExtractError::NoBackendAvailable);
    }

    tracing::info!(raw = raw_count, kept = tokens.len(), "numeric tokens collected");

    if tokens.len() < cfg.min_tokens {
        return Err(ExtractError::NoNumbersDetected {
            found: tokens.len(),
        });
    }

    Ok(Recognition {
        tokens,
        raw_count,
        backends: statuses,
        fallback_used,
    })
}
