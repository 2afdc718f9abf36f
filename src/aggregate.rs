//! Curve alignment and ensemble statistics
//!
//! Trials of a percolation ensemble emit samples at slightly different
//! removed fractions. Each trial is linearly interpolated onto the canonical
//! grid of `R + 2` evenly spaced points in [0, 1] before the pointwise mean
//! and population standard deviation are taken.

use crate::percolation::CurvePoint;
use serde::{Deserialize, Serialize};

/// One grid point of an aggregated resilience curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResilienceRow {
    pub removed_fraction: f64,
    pub mean: f64,
    pub std: f64,
}

/// Aggregated resilience result for one (network, strategy) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResilienceTable {
    pub rows: Vec<ResilienceRow>,
    /// Trials that contributed to the statistics
    pub trials: usize,
}

impl ResilienceTable {
    pub fn removed_fraction(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.removed_fraction).collect()
    }

    pub fn mean(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.mean).collect()
    }

    /// Robustness integral R_b of the mean curve
    pub fn robustness(&self) -> f64 {
        robustness_integral(&self.removed_fraction(), &self.mean())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `R + 2` evenly spaced values from 0 to 1 inclusive
pub fn canonical_grid(removal_steps: usize) -> Vec<f64> {
    let intervals = (removal_steps + 1) as f64;
    (0..removal_steps + 2).map(|i| i as f64 / intervals).collect()
}

/// Piecewise-linear interpolation of `curve` at every point of `grid`.
///
/// Points left of the first sample take its value, points right of the last
/// sample take the last value. `curve` must be sorted by `q`; repeated `q`
/// values resolve to the last sample at that position.
pub fn interpolate(grid: &[f64], curve: &[CurvePoint]) -> Vec<f64> {
    let (first, last) = match (curve.first(), curve.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return vec![0.0; grid.len()],
    };

    grid.iter()
        .map(|&x| {
            let upper = curve.partition_point(|p| p.q <= x);
            if upper == 0 {
                first.s
            } else if upper == curve.len() {
                last.s
            } else {
                let a = curve[upper - 1];
                let b = curve[upper];
                let t = (x - a.q) / (b.q - a.q);
                a.s + t * (b.s - a.s)
            }
        })
        .collect()
}

/// Align trials onto the canonical grid and reduce them.
///
/// Empty trajectories carry no signal and are skipped. Returns None when no
/// trial has any sample.
pub fn aggregate(trajectories: &[Vec<CurvePoint>], removal_steps: usize) -> Option<ResilienceTable> {
    let grid = canonical_grid(removal_steps);
    let aligned: Vec<Vec<f64>> = trajectories
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| interpolate(&grid, t))
        .collect();

    if aligned.is_empty() {
        return None;
    }

    let count = aligned.len() as f64;
    let rows = grid
        .iter()
        .enumerate()
        .map(|(i, &q)| {
            let mean = aligned.iter().map(|row| row[i]).sum::<f64>() / count;
            let variance = aligned
                .iter()
                .map(|row| (row[i] - mean).powi(2))
                .sum::<f64>()
                / count;
            ResilienceRow {
                removed_fraction: q,
                mean,
                std: variance.sqrt(),
            }
        })
        .collect();

    Some(ResilienceTable {
        rows,
        trials: aligned.len(),
    })
}

/// Trapezoidal integral of `y` over `x`; 0.0 for fewer than two points
pub fn robustness_integral(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (ys[0] + ys[1]) * (xs[1] - xs[0]))
        .sum()
}
