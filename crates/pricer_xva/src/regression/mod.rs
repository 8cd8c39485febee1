//! Least-squares fitters mapping simulated regression variables to
//! expected remaining value.
//!
//! A [`Regression`] is a fitting method; fitting yields a [`Predict`]
//! model. Inputs are column-major: one slice per regression variable, each
//! holding one value per path.
//!
//! | Method | Variables | Model |
//! |--------|-----------|-------|
//! | [`LinearRegression`] | 1 | `a + b·x` |
//! | [`MultipleLinearRegression`] | k | `a + Σ bᵢ·xᵢ` |
//! | [`SegmentedLinearRegression`] | 1 | piecewise `aⱼ + bⱼ·x` |
//!
//! Degenerate inputs (a regression variable with no spread) never fail:
//! the affected coefficients are zero and the intercept absorbs the mean.

mod linear;
mod multiple;
mod segmented;

pub use linear::{LinearModel, LinearRegression};
pub use multiple::{MultipleLinearModel, MultipleLinearRegression};
pub use segmented::{SegmentedLinearModel, SegmentedLinearRegression};

use crate::error::XvaError;

/// A fitted regression model.
pub trait Predict {
    /// Predicted value for one path's regression variables.
    fn predict(&self, x: &[f64]) -> f64;
}

/// A least-squares fitting method.
pub trait Regression: Send + Sync {
    /// The fitted model.
    type Model: Predict + Clone + std::fmt::Debug + Send + Sync;

    /// Number of regression variables the method fits.
    fn factors(&self) -> usize;

    /// Fits `targets` against `columns`.
    ///
    /// # Errors
    ///
    /// - `FactorCountMismatch` if `columns.len() != self.factors()`
    /// - `SampleCountMismatch` if a column's length differs from `targets`
    /// - `NoPaths` if there are no targets
    fn fit(&self, columns: &[&[f64]], targets: &[f64]) -> Result<Self::Model, XvaError>;
}

/// Validates column-major inputs and returns the path count.
pub(crate) fn check_inputs(
    factors: usize,
    columns: &[&[f64]],
    targets: &[f64],
) -> Result<usize, XvaError> {
    if columns.len() != factors {
        return Err(XvaError::FactorCountMismatch {
            expected: factors,
            actual: columns.len(),
        });
    }
    if targets.is_empty() {
        return Err(XvaError::NoPaths);
    }
    if let Some(column) = columns.iter().find(|c| c.len() != targets.len()) {
        return Err(XvaError::SampleCountMismatch {
            expected: targets.len(),
            actual: column.len(),
        });
    }
    Ok(targets.len())
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Whether a column's spread is negligible relative to its magnitude.
pub(crate) fn is_degenerate(column: &[f64]) -> bool {
    let m = mean(column);
    let (spread, scale) = column.iter().fold((0.0, 0.0), |(s, q), &x| {
        (s + (x - m) * (x - m), q + x * x)
    });
    spread <= f64::EPSILON * scale
}
