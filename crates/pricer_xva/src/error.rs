//! Exposure estimation error types.

use pricer_core::market_data::MarketDataError;
use pricer_core::types::Date;
use thiserror::Error;

/// Errors raised while fitting or querying exposure regressors.
///
/// `Clone` so a failed lazy fit can be reported to every caller.
///
/// # Examples
///
/// ```
/// use pricer_xva::XvaError;
///
/// let err = XvaError::InvalidConfidence(1.5);
/// assert!(format!("{}", err).contains("1.5"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum XvaError {
    /// Neither explicit exposure dates nor sampled dates were available.
    #[error("No exposure dates configured")]
    NoExposureDates,

    /// A regression variable was not sampled at an exposure date.
    #[error("No samples for exposure date {date}")]
    MissingSamples {
        /// The exposure date
        date: Date,
    },

    /// Sample and cashflow path counts disagree.
    #[error("Sample count mismatch: expected {expected} paths, got {actual}")]
    SampleCountMismatch {
        /// Paths in the cashflow schedules
        expected: usize,
        /// Paths in the samples
        actual: usize,
    },

    /// Confidence level outside `[0, 1]`.
    #[error("Confidence level must lie in [0, 1], got {0}")]
    InvalidConfidence(f64),

    /// Number of regression variables differs from what the method expects.
    #[error("Regression expects {expected} factor(s), got {actual}")]
    FactorCountMismatch {
        /// Factors the method fits
        expected: usize,
        /// Factors supplied
        actual: usize,
    },

    /// Nothing to regress on.
    #[error("No simulated paths")]
    NoPaths,

    /// Segmented regression needs at least one segment.
    #[error("Invalid segment count: {0}")]
    InvalidSegments(usize),

    /// Discounting or FX lookup failed.
    #[error(transparent)]
    MarketData(#[from] MarketDataError),
}
