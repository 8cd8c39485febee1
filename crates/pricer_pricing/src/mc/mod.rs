//! Block-parallel path simulation.
//!
//! # Architecture
//!
//! ```text
//! PathEngine
//! ├── EngineConfig / Executor   (paths, seed, worker pool)
//! ├── FeatureCollection         (factors, time grid, shared settings)
//! ├── levels: Vec<Vec<Box<dyn PathProcess>>>
//! └── BlockSet (per run)
//!     └── PathBlock × 2·parallelism   (lane-interleaved path storage)
//! ```
//!
//! A run goes through setup, close, finish and execution; see
//! [`PathEngine`] for the protocol and [`PathBlock`] for the memory layout.
//!
//! # Built-in processes
//!
//! - [`GbmDiffusion`]: log-space GBM over the engine time grid
//! - [`RegressionSampler`]: captures one factor at chosen dates into a
//!   [`SampleStore`]
//!
//! Random generators live in [`crate::rng`].
//!
//! # Examples
//!
//! ```rust
//! use pricer_core::types::Date;
//! use pricer_pricing::mc::{EngineConfig, Executor, GbmDiffusion, GbmParams, PathEngine, RegressionSampler};
//! use pricer_pricing::rng::PseudoRandomPathGenerator;
//!
//! let config = EngineConfig::builder()
//!     .number_of_paths(1_024)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//! let mut engine = PathEngine::new(&config, Executor::with_threads(2).unwrap());
//!
//! let today = Date::from_ymd(2025, 1, 2).unwrap();
//! let horizon = Date::from_ymd(2026, 1, 2).unwrap();
//! let sampler = RegressionSampler::new("spx", [horizon]);
//! let store = sampler.store();
//!
//! engine.features_mut().set_time_origin(today).unwrap();
//! engine.add_process(0, Box::new(PseudoRandomPathGenerator::new()));
//! engine.add_process(1, Box::new(GbmDiffusion::new("spx", GbmParams::default())));
//! engine.add_process(2, Box::new(sampler));
//!
//! let summary = engine.run().unwrap();
//! assert_eq!(summary.number_of_paths, 1_024);
//! assert!(store.values_at(horizon).unwrap().iter().all(|s| *s > 0.0));
//! ```

mod block;
mod block_set;
mod config;
mod engine;
mod error;
mod executor;
mod features;
mod paths;
mod process;
mod sampler;

pub use block::{Lane, PathBlock, SIMD_WIDTH};
pub use block_set::BlockSet;
pub use config::{EngineConfig, EngineConfigBuilder, MAX_PATHS, MAX_THREADS};
pub use engine::{PathEngine, RunSummary};
pub use error::{ConfigError, SimulationError};
pub use executor::{CancellationToken, Executor};
pub use features::{DimensionsFeature, EngineFeature, FeatureCollection, TimeStepsFeature};
pub use paths::{GbmDiffusion, GbmParams};
pub use process::{FinishStatus, PathProcess};
pub use sampler::{RegressionSampler, SampleStore};
