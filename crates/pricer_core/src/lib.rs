//! # pricer_core: Foundation types for the path-simulation core
//!
//! ## Layer 1 (Foundation) Role
//!
//! pricer_core is the bottom layer of the workspace, providing:
//! - Time types: `Date`, `DayCountConvention` (`types::time`)
//! - Currency codes: `Currency` (`types::currency`)
//! - The read-only discounting/FX collaborator (`market_data::Discounter`)
//!
//! It has no dependencies on other pricer_* crates.
//!
//! ## Usage Example
//!
//! ```rust
//! use pricer_core::market_data::{Discounter, FlatRateDiscounter};
//! use pricer_core::types::{Currency, Date};
//!
//! let disc = FlatRateDiscounter::new(Currency::EUR).with_rate(Currency::EUR, 0.03);
//! let start = Date::from_ymd(2024, 1, 1).unwrap();
//! let df = disc.discount_factor(Currency::EUR, start, start.add_days(730)).unwrap();
//! assert!(df < 1.0);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialisation for `Date`, `Currency`, `DayCountConvention`

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod market_data;
pub mod types;
