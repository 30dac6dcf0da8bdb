//! Locally weighted scatterplot smoothing.
//!
//! For each point a weighted straight line is fitted over its `frac · n`
//! nearest neighbours (tricube distance weights). Robustifying passes then
//! down-weight points with large residuals using bisquare weights.

use crate::analysis::stats;
use crate::analysis::{FitResult, Unavailable};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowessParams {
    /// Share of the data used in each local fit.
    pub frac: f64,
    /// Number of robustifying iterations after the initial fit.
    pub iterations: usize,
}

impl Default for LowessParams {
    fn default() -> Self {
        Self {
            frac: 0.5,
            iterations: 3,
        }
    }
}

/// Smooths `(x, y)` pairs. Returns the fitted curve sorted by x, one point per
/// input point.
pub fn lowess(points: &[(f64, f64)], params: LowessParams) -> FitResult<Vec<(f64, f64)>> {
    let n = points.len();
    if n < 2 {
        return Err(Unavailable::insufficient(format!(
            "smoothing needs at least 2 points, got {n}"
        )));
    }
    if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(Unavailable::degenerate("non-finite input point"));
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
    let xs: Vec<f64> = sorted.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = sorted.iter().map(|p| p.1).collect();

    let k = ((params.frac * n as f64) as usize).clamp(2, n);
    let x_range = xs[n - 1] - xs[0];

    let mut robustness = vec![1.0; n];
    let mut fitted = vec![0.0; n];

    for pass in 0..=params.iterations {
        let mut left = 0usize;
        let mut right = k - 1;

        for i in 0..n {
            // slide the k-wide window while it brings x[i] closer to its centre
            while right + 1 < n && xs[i] - xs[left] > xs[right + 1] - xs[i] {
                left += 1;
                right += 1;
            }

            let h = (xs[i] - xs[left]).max(xs[right] - xs[i]);
            fitted[i] = local_fit(&xs, &ys, &robustness, i, left, right, h, x_range);
        }

        if pass == params.iterations {
            break;
        }

        let residuals: Vec<f64> = ys.iter().zip(&fitted).map(|(y, f)| (y - f).abs()).collect();
        let scale = 6.0 * stats::median(&residuals).unwrap_or(0.0);
        let mean_abs_y = ys.iter().map(|y| y.abs()).sum::<f64>() / n as f64;
        if scale < 1e-7 * mean_abs_y || scale == 0.0 {
            // residuals are already negligible
            break;
        }

        for (w, r) in robustness.iter_mut().zip(&residuals) {
            let u = r / scale;
            *w = if u <= 0.001 {
                1.0
            } else if u <= 0.999 {
                (1.0 - u * u).powi(2)
            } else {
                0.0
            };
        }
    }

    if fitted.iter().any(|f| !f.is_finite()) {
        return Err(Unavailable::degenerate("smoother produced non-finite values"));
    }

    Ok(xs.into_iter().zip(fitted).collect())
}

#[allow(clippy::too_many_arguments)]
fn local_fit(
    xs: &[f64],
    ys: &[f64],
    robustness: &[f64],
    i: usize,
    left: usize,
    right: usize,
    h: f64,
    x_range: f64,
) -> f64 {
    let x0 = xs[i];
    let h_full = 0.001 * h;
    let h_cut = 0.999 * h;

    let mut weights = Vec::with_capacity(right - left + 1);
    let mut total = 0.0;
    for j in left..=right {
        let d = (xs[j] - x0).abs();
        let tricube = if h <= 0.0 || d <= h_full {
            1.0
        } else if d <= h_cut {
            (1.0 - (d / h).powi(3)).powi(3)
        } else {
            0.0
        };
        let w = tricube * robustness[j];
        weights.push(w);
        total += w;
    }

    if total <= 0.0 {
        return ys[i];
    }

    let x_bar: f64 = (left..=right).zip(&weights).map(|(j, w)| w * xs[j]).sum::<f64>() / total;
    let y_bar: f64 = (left..=right).zip(&weights).map(|(j, w)| w * ys[j]).sum::<f64>() / total;

    let spread: f64 = (left..=right)
        .zip(&weights)
        .map(|(j, w)| w * (xs[j] - x_bar).powi(2))
        .sum();

    if spread.sqrt() <= 0.001 * x_range || spread <= 0.0 {
        return y_bar;
    }

    let slope = (left..=right)
        .zip(&weights)
        .map(|(j, w)| w * (xs[j] - x_bar) * (ys[j] - y_bar))
        .sum::<f64>()
        / spread;

    y_bar + slope * (x0 - x_bar)
}
