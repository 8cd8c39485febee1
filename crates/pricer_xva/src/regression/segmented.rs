//! Piecewise-linear regression on a single regression variable.
//!
//! Paths are sorted by the regression variable and split into segments
//! holding equal numbers of paths. Breakpoints sit halfway between the last
//! value of one segment and the first value of the next. Each segment is
//! fitted independently, or, when continuity is required, the whole curve is
//! fitted at once on the hinge basis
//!
//! ```text
//! y = a + b·x + Σⱼ cⱼ · max(x − kⱼ, 0)
//! ```
//!
//! and converted back to per-segment lines.

use super::linear::LinearModel;
use super::multiple::least_squares;
use super::{check_inputs, is_degenerate, mean, Predict, Regression};
use crate::error::XvaError;

/// Lines joined (or not) at breakpoints.
///
/// `pieces[j]` applies to `x` in `(breakpoints[j - 1], breakpoints[j]]`,
/// with the first and last pieces extended to infinity.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentedLinearModel {
    /// Ascending segment boundaries; one fewer than `pieces`.
    pub breakpoints: Vec<f64>,
    /// One line per segment.
    pub pieces: Vec<LinearModel>,
}

impl SegmentedLinearModel {
    /// Prediction at a scalar `x`.
    pub fn at(&self, x: f64) -> f64 {
        let segment = self.breakpoints.partition_point(|&b| b < x);
        self.pieces[segment].at(x)
    }

    /// Number of segments actually fitted.
    pub fn segments(&self) -> usize {
        self.pieces.len()
    }
}

impl Predict for SegmentedLinearModel {
    fn predict(&self, x: &[f64]) -> f64 {
        self.at(x[0])
    }
}

/// Segmented OLS with `segments` equal-count pieces.
///
/// The effective segment count is capped so every segment holds at least
/// two paths.
///
/// # Examples
///
/// ```
/// use pricer_xva::regression::{Regression, SegmentedLinearRegression};
///
/// // a call-style kink at 0
/// let x: Vec<f64> = (-50..50).map(|i| i as f64 / 10.0).collect();
/// let y: Vec<f64> = x.iter().map(|v| v.max(0.0)).collect();
///
/// let model = SegmentedLinearRegression::new(2).unwrap().fit(&[&x], &y).unwrap();
/// assert!(model.at(-3.0).abs() < 1e-9);
/// assert!((model.at(3.0) - 3.0).abs() < 1e-9);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentedLinearRegression {
    segments: usize,
    continuous: bool,
}

impl SegmentedLinearRegression {
    /// Independent per-segment fits.
    ///
    /// # Errors
    ///
    /// `InvalidSegments` if `segments` is zero.
    pub fn new(segments: usize) -> Result<Self, XvaError> {
        if segments == 0 {
            return Err(XvaError::InvalidSegments(segments));
        }
        Ok(Self {
            segments,
            continuous: false,
        })
    }

    /// Requires adjacent pieces to meet at the breakpoints.
    pub fn continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    /// Requested segment count.
    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Whether the pieces are continuity-constrained.
    pub fn is_continuous(&self) -> bool {
        self.continuous
    }
}

impl Regression for SegmentedLinearRegression {
    type Model = SegmentedLinearModel;

    fn factors(&self) -> usize {
        1
    }

    fn fit(&self, columns: &[&[f64]], targets: &[f64]) -> Result<SegmentedLinearModel, XvaError> {
        let n = check_inputs(1, columns, targets)?;
        let x = columns[0];
        if is_degenerate(x) {
            return Ok(SegmentedLinearModel {
                breakpoints: Vec::new(),
                pieces: vec![LinearModel::constant(mean(targets))],
            });
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));
        let xs: Vec<f64> = order.iter().map(|&i| x[i]).collect();
        let ys: Vec<f64> = order.iter().map(|&i| targets[i]).collect();

        let segments = self.segments.min((n / 2).max(1));
        let bounds: Vec<usize> = (0..=segments).map(|j| j * n / segments).collect();
        let breakpoints: Vec<f64> = bounds[1..segments]
            .iter()
            .map(|&b| 0.5 * (xs[b - 1] + xs[b]))
            .collect();

        let pieces = if self.continuous {
            hinge_fit(&xs, &ys, &breakpoints)
        } else {
            bounds
                .windows(2)
                .map(|w| LinearModel::ols(&xs[w[0]..w[1]], &ys[w[0]..w[1]]))
                .collect()
        };
        Ok(SegmentedLinearModel {
            breakpoints,
            pieces,
        })
    }
}

fn hinge_fit(xs: &[f64], ys: &[f64], knots: &[f64]) -> Vec<LinearModel> {
    let hinges: Vec<Vec<f64>> = knots
        .iter()
        .map(|&k| xs.iter().map(|&x| (x - k).max(0.0)).collect())
        .collect();
    let mut columns: Vec<&[f64]> = Vec::with_capacity(knots.len() + 1);
    columns.push(xs);
    columns.extend(hinges.iter().map(Vec::as_slice));

    let fit = least_squares(&columns, ys, xs.len());
    let mut line = LinearModel {
        intercept: fit.intercept,
        slope: fit.coefficients[0],
    };
    let mut pieces = Vec::with_capacity(knots.len() + 1);
    pieces.push(line);
    for (&k, &c) in knots.iter().zip(&fit.coefficients[1..]) {
        line.slope += c;
        line.intercept -= c * k;
        pieces.push(line);
    }
    pieces
}
