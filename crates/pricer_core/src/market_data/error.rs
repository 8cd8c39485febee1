//! Market data error types.

use crate::types::Currency;
use thiserror::Error;

/// Errors raised by discounting and FX lookups.
///
/// # Examples
///
/// ```
/// use pricer_core::market_data::MarketDataError;
/// use pricer_core::types::Currency;
///
/// let err = MarketDataError::MissingCurve(Currency::CHF);
/// assert!(format!("{}", err).contains("CHF"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// No discount curve registered for the currency.
    #[error("No discount curve for currency {0}")]
    MissingCurve(Currency),

    /// No FX spot registered against the base currency.
    #[error("No FX rate for {from}/{to}")]
    MissingFxRate {
        /// Source currency
        from: Currency,
        /// Target currency
        to: Currency,
    },

    /// FX spot must be strictly positive and finite.
    #[error("Invalid FX rate for {currency}: {rate}")]
    InvalidFxRate {
        /// Currency quoted against the base
        currency: Currency,
        /// The rejected rate
        rate: f64,
    },
}
