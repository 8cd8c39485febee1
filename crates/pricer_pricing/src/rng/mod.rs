//! # Random Number Generation
//!
//! Pseudo-random and quasi-random (Sobol) number generation for the path
//! engine.
//!
//! ## Module Structure
//!
//! - [`prng`]: seeded [`PricerRng`] with per-path stream derivation
//! - [`qmc`]: the [`LowDiscrepancySequence`] trait
//! - [`direction_numbers`]: Joe–Kuo style direction-number tables
//! - [`sobol`]: [`SobolGenerator`] (random access) and [`SobolSequence`]
//! - [`normal`]: inverse standard normal CDF
//! - [`path_generators`]: [`SobolPathGenerator`] and
//!   [`PseudoRandomPathGenerator`] processes
//!
//! ## Usage Example
//!
//! ```rust
//! use pricer_pricing::rng::{DirectionNumberTable, SobolGenerator};
//!
//! let table = DirectionNumberTable::embedded().unwrap();
//! let sobol = SobolGenerator::new(&table, 0, 4, 1_000)
//!     .unwrap()
//!     .with_normal_transform(true);
//!
//! let mut column = vec![0.0; 1_000];
//! sobol.fill_dimension(2, 1, &mut column);
//! assert!(column.iter().all(|z| z.is_finite()));
//! ```
//!
//! All documentation in this module uses British English spelling.

pub mod direction_numbers;
mod error;
pub mod normal;
pub mod path_generators;
pub mod prng;
pub mod qmc;
pub mod sobol;

pub use direction_numbers::{DirectionNumberTable, DirectionNumbers};
pub use error::SobolError;
pub use normal::inverse_normal_cdf;
pub use path_generators::{PseudoRandomPathGenerator, SobolPathGenerator};
pub use prng::{path_seed, PricerRng};
pub use qmc::LowDiscrepancySequence;
pub use sobol::{bits_for_points, SobolGenerator, SobolSequence, SobolShift};
