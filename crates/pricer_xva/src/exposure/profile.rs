//! Dated exposure profiles.

use pricer_core::types::{Date, DayCountConvention};

use super::calculator::ExposureCalculator;

/// One exposure figure per exposure date, dates ascending.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExposureProfile {
    /// Exposure dates.
    pub dates: Vec<Date>,
    /// Discounted exposure at each date.
    pub values: Vec<f64>,
}

impl ExposureProfile {
    /// Number of dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the profile has no dates.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Exposure at `date`, if it is an exposure date.
    pub fn value_at(&self, date: Date) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| self.values[i])
    }

    /// `(date, value)` pairs in date order.
    pub fn iter(&self) -> impl Iterator<Item = (Date, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Largest value, floored at zero.
    pub fn peak(&self) -> f64 {
        ExposureCalculator::peak(&self.values)
    }

    /// Year fractions of the dates from `origin`.
    pub fn times(&self, origin: Date, day_count: DayCountConvention) -> Vec<f64> {
        self.dates
            .iter()
            .map(|&d| day_count.year_fraction(origin, d))
            .collect()
    }

    /// Trapezoidal time average over the profile's own span.
    pub fn time_weighted_average(&self, origin: Date, day_count: DayCountConvention) -> f64 {
        ExposureCalculator::time_weighted_average(&self.values, &self.times(origin, day_count))
    }

    /// Time average of the running maximum up to `horizon` years from `origin`.
    pub fn effective_average(
        &self,
        origin: Date,
        day_count: DayCountConvention,
        horizon: f64,
    ) -> f64 {
        ExposureCalculator::effective_epe(&self.values, &self.times(origin, day_count), horizon)
    }
}
