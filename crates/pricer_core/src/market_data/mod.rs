//! Market data collaborators consumed read-only by the simulation core.
//!
//! - [`discounting`]: the [`Discounter`] trait and [`FlatRateDiscounter`]
//! - [`error`]: [`MarketDataError`]

pub mod discounting;
pub mod error;

pub use discounting::{Discounter, FlatRateDiscounter};
pub use error::MarketDataError;
