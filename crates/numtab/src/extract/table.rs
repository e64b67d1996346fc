//! Turn a bag of numeric tokens into an x/y table.
//!
//! Exercise tables are laid out either as two rows (x on top, y below) or as
//! a single row holding both series back to back. When the OCR engines gave
//! no positions, the token stream is split in half.

use crate::interp::validate_nodes;

use super::config::TableConfig;
use super::tokens::NumberToken;
use super::ExtractError;

/// Paired x/y series ready for interpolation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExtractedTable {
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
}

impl ExtractedTable {
    pub fn len(&self) -> usize {
        self.x_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_values.is_empty()
    }
}

/// Which rule produced the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TableStrategy {
    /// Two rows of equal length.
    RowPair { x_row: usize, y_row: usize },
    /// One row split at its midpoint.
    SplitRow { row: usize },
    /// Unpositioned token stream split at its midpoint.
    FlatSplit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub table: ExtractedTable,
    pub strategy: TableStrategy,
    /// Rows found by grouping (0 for the flat strategy).
    pub rows: usize,
}

/// Accept `x`/`y` as a table: equal length of at least 2, finite, distinct x.
pub fn is_valid_table(x: &[f64], y: &[f64]) -> bool {
    x.len() >= 2 && validate_nodes(x, y).is_ok()
}

/// Group tokens into rows by y, each row sorted by x.
///
/// Tokens are visited top to bottom; a token joins the current row when its
/// y is within `tolerance` of the row's first token.
pub fn group_rows(tokens: &[NumberToken], tolerance: f32) -> Vec<Vec<NumberToken>> {
    let mut sorted = tokens.to_vec();
    sorted.sort_by_key(|t| (t.y, t.x));

    let mut rows: Vec<Vec<NumberToken>> = Vec::new();
    let mut reference_y = None;
    for token in sorted {
        match (reference_y, rows.last_mut()) {
            (Some(ry), Some(row)) if (token.y.abs_diff(ry) as f32) <= tolerance => {
                row.push(token)
            }
            _ => {
                reference_y = Some(token.y);
                rows.push(vec![token]);
            }
        }
    }
    for row in &mut rows {
        row.sort_by_key(|t| t.x);
    }
    rows
}

fn values(row: &[NumberToken]) -> Vec<f64> {
    row.iter().map(|t| t.value).collect()
}

fn split_half(values: &[f64]) -> Option<ExtractedTable> {
    if values.len() < 4 || values.len() % 2 != 0 {
        return None;
    }
    let (x, y) = values.split_at(values.len() / 2);
    is_valid_table(x, y).then(|| ExtractedTable {
        x_values: x.to_vec(),
        y_values: y.to_vec(),
    })
}

fn from_rows(rows: &[Vec<NumberToken>], cfg: &TableConfig) -> Option<(ExtractedTable, TableStrategy)> {
    let mut best: Option<(ExtractedTable, TableStrategy)> = None;
    for i in 0..rows.len() {
        for j in (i + 1)..rows.len() {
            if rows[i].len() != rows[j].len() || rows[i].len() < 2 {
                continue;
            }
            let (x, y) = (values(&rows[i]), values(&rows[j]));
            if !is_valid_table(&x, &y) {
                continue;
            }
            let candidate = (
                ExtractedTable {
                    x_values: x,
                    y_values: y,
                },
                TableStrategy::RowPair { x_row: i, y_row: j },
            );
            if cfg.first_match_wins {
                return Some(candidate);
            }
            if best.as_ref().map_or(true, |(t, _)| candidate.0.len() > t.len()) {
                best = Some(candidate);
            }
        }
    }
    if best.is_some() {
        return best;
    }

    rows.iter().enumerate().find_map(|(row, tokens)| {
        split_half(&values(tokens)).map(|table| (table, TableStrategy::SplitRow { row }))
    })
}

/// Reconstruct the x/y table from recognized tokens.
pub fn reconstruct(
    tokens: &[NumberToken],
    image_height: u32,
    cfg: &TableConfig,
) -> Result<Reconstruction, ExtractError> {
    let (positioned, flat): (Vec<NumberToken>, Vec<NumberToken>) =
        tokens.iter().copied().partition(|t| t.has_position());

    let mut rows_found = 0;
    if !positioned.is_empty() {
        let tolerance = cfg.row_tolerance(image_height);
        let rows = group_rows(&positioned, tolerance);
        rows_found = rows.len();
        tracing::debug!(
            rows = rows.len(),
            tolerance,
            lengths = ?rows.iter().map(Vec::len).collect::<Vec<_>>(),
            "grouped tokens into rows"
        );
        if let Some((table, strategy)) = from_rows(&rows, cfg) {
            return Ok(Reconstruction {
                table,
                strategy,
                rows: rows_found,
            });
        }
    }

    // Without usable rows, split the tokens in collection order: the
    // unpositioned ones when there are enough, otherwise everything.
    let stream = if flat.len() >= 4 { values(&flat) } else { values(tokens) };
    split_half(&stream)
        .map(|table| Reconstruction {
            table,
            strategy: TableStrategy::FlatSplit,
            rows: rows_found,
        })
        .ok_or(ExtractError::InvalidTableShape { rows: rows_found })
}
