//! Plain-text input formats.
//!
//! - Matrices: rows separated by `;` or newlines, cells by `,` or whitespace
//!   (`"2,1,1; 4,-6,0; -2,7,2"`).
//! - Vectors: values separated by `,` or whitespace.
//! - Point lists: free text such as OCR output or a pasted table, see
//!   [`parse_points`].

use nalgebra::{DMatrix, DVector};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Signed decimal number as written in exercise tables.
pub(crate) static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+\.?\d*").expect("static number pattern"));

static PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\s*(-?\d+\.?\d*)\s*[,;]\s*(-?\d+\.?\d*)\s*\)").expect("static pair pattern")
});

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty input")]
    EmptyInput,

    #[error("invalid number '{token}' in row {row}")]
    InvalidNumber { row: usize, token: String },

    #[error("row {row} has {got} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        got: usize,
        expected: usize,
    },
}

fn split_cells(row: &str) -> impl Iterator<Item = &str> {
    row.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_row(row_idx: usize, row: &str) -> Result<Vec<f64>, ParseError> {
    split_cells(row)
        .map(|tok| {
            tok.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ParseError::InvalidNumber {
                    row: row_idx,
                    token: tok.to_string(),
                })
        })
        .collect()
}

/// Parse a square or rectangular matrix.
pub fn parse_matrix(text: &str) -> Result<DMatrix<f64>, ParseError> {
    let rows: Vec<Vec<f64>> = text
        .split(|c: char| c == ';' || c == '\n')
        .filter(|r| !r.trim().is_empty())
        .enumerate()
        .map(|(i, r)| parse_row(i, r))
        .collect::<Result<_, _>>()?;

    let expected = match rows.first() {
        Some(first) if !first.is_empty() => first.len(),
        _ => return Err(ParseError::EmptyInput),
    };
    if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
        return Err(ParseError::RaggedRow {
            row,
            got: r.len(),
            expected,
        });
    }

    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(DMatrix::from_row_slice(rows.len(), expected, &flat))
}

/// Parse a vector.
pub fn parse_vector(text: &str) -> Result<DVector<f64>, ParseError> {
    let values = parse_row(0, text)?;
    if values.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    Ok(DVector::from_vec(values))
}

/// All numbers in `text`, in reading order.
pub(crate) fn find_numbers(text: &str) -> Vec<f64> {
    NUMBER_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

/// Recover `(x, y)` lists from free text.
///
/// Patterns are tried in order and the first hit wins:
/// 1. at least two parenthesized pairs `(x, y)`;
/// 2. a line mentioning `x` (but not `y`) and one mentioning `y` (but not
///    `x`) with the same number count;
/// 3. the first two lines carrying at least two numbers each;
/// 4. all numbers, split in half when the count is even and at least 4.
pub fn parse_points(text: &str) -> Option<(Vec<f64>, Vec<f64>)> {
    if text.trim().len() < 3 {
        return None;
    }
    let text = text.replace(['|', ':'], " ");

    let pairs: Vec<(f64, f64)> = PAIR_RE
        .captures_iter(&text)
        .filter_map(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)))
        .collect();
    if pairs.len() >= 2 {
        return Some(pairs.into_iter().unzip());
    }

    let mut x_line = Vec::new();
    let mut y_line = Vec::new();
    for line in text.lines() {
        let lower = line.to_lowercase();
        let (has_x, has_y) = (lower.contains('x'), lower.contains('y'));
        if has_x && !has_y {
            let nums = find_numbers(line);
            if !nums.is_empty() {
                x_line = nums;
            }
        } else if has_y && !has_x {
            let nums = find_numbers(line);
            if !nums.is_empty() {
                y_line = nums;
            }
        }
    }
    if !x_line.is_empty() && x_line.len() == y_line.len() {
        return Some((x_line, y_line));
    }

    let mut numeric_lines = text
        .lines()
        .map(find_numbers)
        .filter(|nums| nums.len() >= 2);
    if let (Some(first), Some(second)) = (numeric_lines.next(), numeric_lines.next()) {
        return Some((first, second));
    }

    let all = find_numbers(&text);
    if all.len() >= 4 && all.len() % 2 == 0 {
        let mut x = all;
        let y = x.split_off(x.len() / 2);
        return Some((x, y));
    }
    None
}
