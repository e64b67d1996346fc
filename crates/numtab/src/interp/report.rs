//! Summary statistics for a completed interpolation.
//!
//! [`FitReport`] collects what a worked exercise reports next to the final
//! polynomial: degree, node residuals, data ranges, and a short table of
//! interpolated values across the node range.

use serde::Serialize;

use super::newton::NewtonInterpolation;
use super::Interpolant;

/// Upper bound on the number of rows in [`FitReport::samples`].
pub const MAX_SAMPLES: usize = 20;

/// Statistics of a Newton fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    pub algorithm_name: &'static str,
    pub degree: usize,
    pub n_points: usize,
    /// Largest `|P(x_i) − y_i|` over the nodes.
    pub max_abs_residual: f64,
    /// Mean `|P(x_i) − y_i|` over the nodes.
    pub mean_abs_residual: f64,
    pub x_min: f64,
    pub x_max: f64,
    pub x_range: f64,
    pub y_range: f64,
    /// `min(20, 3n)` evenly spaced `[x, P(x)]` pairs over `[x_min, x_max]`.
    pub samples: Vec<[f64; 2]>,
}

impl FitReport {
    pub fn from_interpolation(interp: &NewtonInterpolation) -> Self {
        let poly = &interp.polynomial;
        let xs = poly.nodes();
        let ys = interp.table.column(0);
        let n = xs.len();

        let residuals: Vec<f64> = xs
            .iter()
            .zip(ys.iter())
            .map(|(&x, &y)| (poly.eval(x) - y).abs())
            .collect();
        let max_abs_residual = residuals.iter().copied().fold(0.0, f64::max);
        let mean_abs_residual = if n > 0 {
            residuals.iter().sum::<f64>() / n as f64
        } else {
            0.0
        };

        let (x_min, x_max) = poly.node_range();
        let (y_min, y_max) = ys
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        let n_samples = (3 * n).min(MAX_SAMPLES);
        let samples = linspace(x_min, x_max, n_samples)
            .into_iter()
            .map(|x| [x, poly.eval(x)])
            .collect();

        Self {
            algorithm_name: "newton",
            degree: poly.degree(),
            n_points: n,
            max_abs_residual,
            mean_abs_residual,
            x_min,
            x_max,
            x_range: x_max - x_min,
            y_range: y_max - y_min,
            samples,
        }
    }
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n).map(|i| lo + step * i as f64).collect()
        }
    }
}
