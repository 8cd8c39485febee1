//! Discounting collaborator used by the exposure regressors.
//!
//! The simulation core only ever reads discount factors and FX spots; curve
//! construction lives elsewhere. [`Discounter`] is the seam, and
//! [`FlatRateDiscounter`] is a continuously-compounded flat-rate
//! implementation suitable for tests and prototyping.

use std::collections::HashMap;

use super::error::MarketDataError;
use crate::types::{Currency, Date, DayCountConvention};

/// Read-only discounting and FX conversion.
///
/// # Contract
///
/// - `discount_factor(ccy, d, d) == 1`
/// - `discount_factor(ccy, from, to)` is the value at `from` of one unit of
///   `ccy` paid at `to`
/// - `fx_rate(a, b)` is the number of units of `b` per unit of `a`
pub trait Discounter: Send + Sync {
    /// Discount factor for `currency` between `from` and `to`.
    fn discount_factor(
        &self,
        currency: Currency,
        from: Date,
        to: Date,
    ) -> Result<f64, MarketDataError>;

    /// Spot FX conversion rate from `from` into `to`.
    fn fx_rate(&self, from: Currency, to: Currency) -> Result<f64, MarketDataError>;
}

/// Flat continuously-compounded rates per currency plus spot FX quoted
/// against a single base currency.
///
/// # Example
///
/// ```
/// use pricer_core::market_data::{Discounter, FlatRateDiscounter};
/// use pricer_core::types::{Currency, Date};
///
/// let disc = FlatRateDiscounter::new(Currency::USD)
///     .with_rate(Currency::USD, 0.05)
///     .with_rate(Currency::EUR, 0.02)
///     .with_fx_spot(Currency::EUR, 1.10)
///     .unwrap();
///
/// let today = Date::from_ymd(2024, 1, 1).unwrap();
/// let df = disc.discount_factor(Currency::USD, today, today.add_days(365)).unwrap();
/// assert!((df - (-0.05_f64).exp()).abs() < 1e-12);
///
/// // EUR -> USD uses the base quote directly
/// assert!((disc.fx_rate(Currency::EUR, Currency::USD).unwrap() - 1.10).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct FlatRateDiscounter {
    base: Currency,
    day_count: DayCountConvention,
    rates: HashMap<Currency, f64>,
    /// Units of `base` per unit of the keyed currency.
    spots: HashMap<Currency, f64>,
}

impl FlatRateDiscounter {
    /// Creates an empty discounter with the given FX base currency.
    pub fn new(base: Currency) -> Self {
        let mut spots = HashMap::new();
        spots.insert(base, 1.0);
        Self {
            base,
            day_count: DayCountConvention::ActualActual365,
            rates: HashMap::new(),
            spots,
        }
    }

    /// Sets the flat continuously-compounded rate for a currency.
    pub fn with_rate(mut self, currency: Currency, rate: f64) -> Self {
        self.rates.insert(currency, rate);
        self
    }

    /// Sets the spot for `currency` expressed as units of the base currency.
    ///
    /// # Errors
    /// [`MarketDataError::InvalidFxRate`] if the rate is not positive and finite.
    pub fn with_fx_spot(mut self, currency: Currency, rate: f64) -> Result<Self, MarketDataError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(MarketDataError::InvalidFxRate { currency, rate });
        }
        self.spots.insert(currency, rate);
        Ok(self)
    }

    /// Overrides the day count used to turn dates into year fractions.
    pub fn with_day_count(mut self, day_count: DayCountConvention) -> Self {
        self.day_count = day_count;
        self
    }

    /// The FX base currency.
    #[inline]
    pub fn base(&self) -> Currency {
        self.base
    }

    fn spot(&self, currency: Currency, other: Currency) -> Result<f64, MarketDataError> {
        self.spots
            .get(&currency)
            .copied()
            .ok_or(MarketDataError::MissingFxRate {
                from: currency,
                to: other,
            })
    }
}

impl Discounter for FlatRateDiscounter {
    fn discount_factor(
        &self,
        currency: Currency,
        from: Date,
        to: Date,
    ) -> Result<f64, MarketDataError> {
        let rate = self
            .rates
            .get(&currency)
            .copied()
            .ok_or(MarketDataError::MissingCurve(currency))?;
        let t = self.day_count.year_fraction(from, to);
        Ok((-rate * t).exp())
    }

    fn fx_rate(&self, from: Currency, to: Currency) -> Result<f64, MarketDataError> {
        if from == to {
            return Ok(1.0);
        }
        let from_in_base = self.spot(from, to)?;
        let to_in_base = self.spot(to, from)?;
        Ok(from_in_base / to_in_base)
    }
}
