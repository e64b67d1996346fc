use crate::textio::NUMBER_RE;

use super::backend::TextDetection;

/// A number read from the image.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NumberToken {
    pub value: f64,
    /// Pixel position of the source fragment's center, 0 when unknown.
    pub x: i32,
    pub y: i32,
    pub confidence: f32,
}

impl NumberToken {
    pub fn unpositioned(value: f64, confidence: f32) -> Self {
        Self {
            value,
            x: 0,
            y: 0,
            confidence,
        }
    }

    pub fn has_position(&self) -> bool {
        self.x != 0 || self.y != 0
    }
}

/// Undo common OCR confusions between letters and digits.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'O' | 'o' | 'D' => '0',
            'l' | 'I' | 'i' | '|' => '1',
            'S' | 's' => '5',
            'Z' | 'z' => '2',
            'B' => '8',
            'G' => '6',
            'T' => '7',
            ',' => '.',
            other => other,
        })
        .collect()
}

/// Numbers in `text` after normalization, in reading order.
pub fn extract_numbers(text: &str) -> Vec<f64> {
    let normalized = normalize_text(text);
    NUMBER_RE
        .find_iter(&normalized)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect()
}

/// Tokens for one detection, or none when it is below `min_confidence`.
pub fn tokens_from_detection(det: &TextDetection, min_confidence: f32) -> Vec<NumberToken> {
    if det.confidence < min_confidence {
        return Vec::new();
    }
    let [cx, cy] = det.center().unwrap_or([0.0, 0.0]);
    extract_numbers(&det.text)
        .into_iter()
        .map(|value| NumberToken {
            value,
            x: cx.round() as i32,
            y: cy.round() as i32,
            confidence: det.confidence,
        })
        .collect()
}

/// Drop tokens matching an earlier kept token in value and position.
/// Order of the survivors is preserved.
pub fn dedup_tokens(tokens: Vec<NumberToken>, value_tol: f64, position_px: f32) -> Vec<NumberToken> {
    let mut keep = vec![true; tokens.len()];

    for i in 0..tokens.len() {
        if !keep[i] {
            continue;
        }
        for j in (i + 1)..tokens.len() {
            if !keep[j] {
                continue;
            }
            let (a, b) = (&tokens[i], &tokens[j]);
            if (a.value - b.value).abs() < value_tol
                && (a.x.abs_diff(b.x) as f32) < position_px
                && (a.y.abs_diff(b.y) as f32) < position_px
            {
                keep[j] = false;
            }
        }
    }

    tokens
        .into_iter()
        .enumerate()
        .filter_map(|(index, token)| keep[index].then_some(token))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(value: f64, x: i32, y: i32) -> NumberToken {
        NumberToken {
            value,
            x,
            y,
            confidence: 0.9,
        }
    }

    #[test]
    fn confusable_letters_become_digits() {
        assert_eq!(normalize_text("lO.S"), "10.5");
        assert_eq!(normalize_text("Z,B G T|"), "2.8 6 71");
        assert_eq!(normalize_text("x"), "x");
    }

    #[test]
    fn numbers_are_pulled_from_text() {
        assert_eq!(extract_numbers("x: 1, 2,5 -3"), vec![1.0, 2.5, -3.0]);
        assert_eq!(extract_numbers("y=O.5"), vec![0.5]);
        assert!(extract_numbers("---").is_empty());
    }

    #[test]
    fn low_confidence_detection_yields_nothing() {
        let det = TextDetection {
            text: "42".into(),
            bbox: Some([0.0, 0.0, 10.0, 10.0]),
            confidence: 0.2,
        };
        assert!(tokens_from_detection(&det, 0.3).is_empty());
        let toks = tokens_from_detection(&det, 0.1);
        assert_eq!(toks, vec![NumberToken { value: 42.0, x: 5, y: 5, confidence: 0.2 }]);
    }

    #[test]
    fn dedup_respects_both_tolerances() {
        let tokens = vec![
            tok(1.0, 100, 100),
            tok(1.0005, 105, 96),  // duplicate
            tok(1.0, 130, 100),    // same value, far away
            tok(2.0, 100, 100),    // same place, different value
            tok(1.0, 100, 100),    // exact duplicate
        ];
        let kept = dedup_tokens(tokens, 1e-3, 12.0);
        assert_eq!(kept, vec![tok(1.0, 100, 100), tok(1.0, 130, 100), tok(2.0, 100, 100)]);
    }

    #[test]
    fn dedup_handles_saturated_coordinates() {
        let tokens = vec![tok(5.0, i32::MIN, i32::MIN), tok(5.0, i32::MAX, i32::MAX)];
        assert_eq!(dedup_tokens(tokens, 1e-3, 12.0).len(), 2);
    }

    #[test]
    fn unpositioned_tokens_collapse_by_value() {
        let tokens = vec![
            NumberToken::unpositioned(3.0, 1.0),
            NumberToken::unpositioned(3.0, 1.0),
            NumberToken::unpositioned(4.0, 1.0),
        ];
        assert!(!tokens[0].has_position());
        assert_eq!(dedup_tokens(tokens, 1e-3, 12.0).len(), 2);
    }
}
