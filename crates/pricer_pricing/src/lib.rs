//! # pricer_pricing: Block-parallel path simulation engine
//!
//! ## Layer Role
//!
//! pricer_pricing sits above pricer_core and provides:
//! - The path engine: lane-interleaved [`mc::PathBlock`] storage, the
//!   [`mc::FeatureCollection`] setup and finishing protocol, and level-barrier
//!   execution of [`mc::PathProcess`] stages on a rayon pool
//! - Random number generation: Sobol points from Joe–Kuo direction numbers,
//!   seeded pseudo-random streams and the inverse normal CDF ([`rng`])
//! - Built-in processes: GBM diffusion and regression sampling
//!
//! pricer_xva consumes the sampled paths to regress exposures.
//!
//! ## Usage Example
//!
//! ```rust
//! use pricer_core::types::Date;
//! use pricer_pricing::mc::{EngineConfig, Executor, PathEngine, RegressionSampler};
//! use pricer_pricing::rng::SobolPathGenerator;
//!
//! let config = EngineConfig::builder().number_of_paths(4_096).build().unwrap();
//! let mut engine = PathEngine::new(&config, Executor::sequential());
//!
//! let date = Date::from_ymd(2025, 3, 31).unwrap();
//! let sampler = RegressionSampler::new("u", [date]);
//! let store = sampler.store();
//!
//! engine.add_process(0, Box::new(SobolPathGenerator::with_embedded_table().unwrap()));
//! engine.add_process(1, Box::new(sampler));
//! engine.run().unwrap();
//!
//! let values = store.values_at(date).unwrap();
//! let mean = values.iter().sum::<f64>() / values.len() as f64;
//! assert!((mean - 0.5).abs() < 1e-3);
//! ```
//!
//! ## Logging
//!
//! The crate emits `tracing` events (`info` per run, `debug` for setup and
//! level dispatch, `trace` per block). Install a subscriber in the
//! application to see them.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod mc;
pub mod rng;
