//! Multiple linear regression across several simulated factors.
//!
//! Columns are centred before the normal equations are formed, so the
//! intercept drops out of the linear system and is recovered from the
//! means. Columns without spread are left out of the system with a zero
//! coefficient. The reduced system is solved by LU, falling back to SVD
//! when the remaining columns are collinear.

use nalgebra::{DMatrix, DVector};

use super::{check_inputs, is_degenerate, mean, Predict, Regression};
use crate::error::XvaError;

/// Singular values below this fraction of the largest are treated as zero.
const SVD_TOLERANCE: f64 = 1e-10;

/// `y = intercept + Σ coefficients[i] · x[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct MultipleLinearModel {
    /// Value at the origin.
    pub intercept: f64,
    /// One coefficient per regression variable.
    pub coefficients: Vec<f64>,
}

impl Predict for MultipleLinearModel {
    fn predict(&self, x: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(x)
            .fold(self.intercept, |acc, (b, xi)| b.mul_add(*xi, acc))
    }
}

/// Intercept plus `factors` regression variables, fitted by least squares.
///
/// # Examples
///
/// ```
/// use pricer_xva::regression::{MultipleLinearRegression, Predict, Regression};
///
/// let x1 = [0.0, 1.0, 0.0, 1.0, 2.0];
/// let x2 = [0.0, 0.0, 1.0, 1.0, 3.0];
/// let y: Vec<f64> = x1.iter().zip(&x2).map(|(a, b)| 1.0 + 2.0 * a - b).collect();
///
/// let model = MultipleLinearRegression::new(2).fit(&[&x1, &x2], &y).unwrap();
/// assert!((model.predict(&[4.0, 4.0]) - 5.0).abs() < 1e-9);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MultipleLinearRegression {
    factors: usize,
}

impl MultipleLinearRegression {
    /// A regression on `factors` variables.
    pub fn new(factors: usize) -> Self {
        Self { factors }
    }
}

impl Regression for MultipleLinearRegression {
    type Model = MultipleLinearModel;

    fn factors(&self) -> usize {
        self.factors
    }

    fn fit(&self, columns: &[&[f64]], targets: &[f64]) -> Result<MultipleLinearModel, XvaError> {
        let n = check_inputs(self.factors, columns, targets)?;
        Ok(least_squares(columns, targets, n))
    }
}

/// Centred least squares over `columns`; shared with the hinge basis of the
/// continuous segmented fit.
pub(crate) fn least_squares(columns: &[&[f64]], targets: &[f64], n: usize) -> MultipleLinearModel {
    let my = mean(targets);
    let means: Vec<f64> = columns.iter().map(|c| mean(c)).collect();
    let active: Vec<usize> = (0..columns.len())
        .filter(|&j| !is_degenerate(columns[j]))
        .collect();

    let mut coefficients = vec![0.0; columns.len()];
    if !active.is_empty() {
        let x = DMatrix::from_fn(n, active.len(), |row, k| {
            let j = active[k];
            columns[j][row] - means[j]
        });
        let y = DVector::from_fn(n, |row, _| targets[row] - my);
        let xtx = x.transpose() * &x;
        let xty = x.transpose() * &y;

        let beta = match xtx.clone().lu().solve(&xty) {
            Some(beta) if beta.iter().all(|b| b.is_finite()) => beta,
            _ => {
                tracing::debug!(factors = active.len(), "Singular normal equations; using SVD");
                let svd = xtx.svd(true, true);
                let tolerance = SVD_TOLERANCE * svd.singular_values.max();
                svd.solve(&xty, tolerance)
                    .unwrap_or_else(|_| DVector::zeros(active.len()))
            }
        };
        for (k, &j) in active.iter().enumerate() {
            coefficients[j] = beta[k];
        }
    }

    let intercept = coefficients
        .iter()
        .zip(&means)
        .fold(my, |acc, (b, m)| acc - b * m);
    MultipleLinearModel {
        intercept,
        coefficients,
    }
}
