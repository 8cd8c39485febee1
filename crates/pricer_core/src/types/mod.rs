//! Core time and financial types.
//!
//! - `time`: [`Date`] and [`DayCountConvention`]
//! - `currency`: ISO 4217 currency codes
//! - `error`: date and currency errors

pub mod currency;
pub mod error;
pub mod time;

pub use currency::Currency;
pub use error::{CurrencyError, DateError};
pub use time::{Date, DayCountConvention};
