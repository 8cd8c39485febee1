//! Ordinary least squares on a single regression variable.

use super::{check_inputs, is_degenerate, mean, Predict, Regression};
use crate::error::XvaError;

/// `y = intercept + slope · x`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearModel {
    /// Value at `x = 0`.
    pub intercept: f64,
    /// Sensitivity to `x`.
    pub slope: f64,
}

impl LinearModel {
    /// A model predicting `value` everywhere.
    pub fn constant(value: f64) -> Self {
        Self {
            intercept: value,
            slope: 0.0,
        }
    }

    /// Prediction at a scalar `x`.
    #[inline]
    pub fn at(&self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept)
    }

    /// OLS on paired slices of equal, non-zero length.
    pub(crate) fn ols(x: &[f64], y: &[f64]) -> Self {
        if is_degenerate(x) {
            return Self::constant(mean(y));
        }
        let (mx, my) = (mean(x), mean(y));
        let (sxy, sxx) = x.iter().zip(y).fold((0.0, 0.0), |(sxy, sxx), (&xi, &yi)| {
            let dx = xi - mx;
            (sxy + dx * (yi - my), sxx + dx * dx)
        });
        let slope = sxy / sxx;
        Self {
            intercept: my - slope * mx,
            slope,
        }
    }
}

impl Predict for LinearModel {
    fn predict(&self, x: &[f64]) -> f64 {
        self.at(x[0])
    }
}

/// Single-variable OLS.
///
/// # Examples
///
/// ```
/// use pricer_xva::regression::{LinearRegression, Predict, Regression};
///
/// let x = [0.0, 1.0, 2.0, 3.0];
/// let y = [1.0, 3.0, 5.0, 7.0];
/// let model = LinearRegression.fit(&[&x], &y).unwrap();
///
/// assert!((model.slope - 2.0).abs() < 1e-12);
/// assert!((model.predict(&[10.0]) - 21.0).abs() < 1e-12);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinearRegression;

impl Regression for LinearRegression {
    type Model = LinearModel;

    fn factors(&self) -> usize {
        1
    }

    fn fit(&self, columns: &[&[f64]], targets: &[f64]) -> Result<LinearModel, XvaError> {
        check_inputs(1, columns, targets)?;
        Ok(LinearModel::ols(columns[0], targets))
    }
}
