//! # Pricer XVA (L4: Application)
//!
//! Regression-based forward exposure over simulated paths.
//!
//! This crate provides:
//! - Least-squares fitters: OLS, multiple linear, segmented linear
//! - Cashflow schedule collaborator trait for payoffs
//! - PFE, EPE and ENE profiles estimated without nested simulation
//! - Rayon-parallel per-date fitting
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            pricer_xva (L4)              │
//! ├─────────────────────────────────────────┤
//! │  regression/ - Linear, Multiple,        │
//! │                Segmented fitters        │
//! │  exposure/   - CashFlow, regressors,    │
//! │                PFE/EPE/ENE profiles     │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │          pricer_pricing (L3)            │
//! │  Path engine, Sobol, sample capture     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use pricer_core::market_data::FlatRateDiscounter;
//! use pricer_core::types::{Currency, Date};
//! use pricer_pricing::mc::{EngineConfig, Executor, PathEngine, RegressionSampler};
//! use pricer_pricing::rng::SobolPathGenerator;
//! use pricer_xva::exposure::{CashFlow, LinearRegressor};
//! use pricer_xva::regression::LinearRegression;
//!
//! let today = Date::from_ymd(2025, 1, 1).unwrap();
//! let t = Date::from_ymd(2025, 7, 1).unwrap();
//! let maturity = Date::from_ymd(2026, 1, 1).unwrap();
//!
//! // capture a uniform regression variable at t
//! let config = EngineConfig::builder().number_of_paths(1_024).build().unwrap();
//! let mut engine = PathEngine::new(&config, Executor::sequential());
//! let sampler = RegressionSampler::new("u", [t]);
//! let samples = sampler.store();
//! engine.add_process(0, Box::new(SobolPathGenerator::with_embedded_table().unwrap()));
//! engine.add_process(1, Box::new(sampler));
//! engine.run().unwrap();
//!
//! // a payoff paying 2u - 1 at maturity
//! let flows: Vec<Vec<CashFlow>> = samples
//!     .values_at(t)
//!     .unwrap()
//!     .into_iter()
//!     .map(|u| vec![CashFlow::new(maturity, Currency::USD, 2.0 * u - 1.0)])
//!     .collect();
//!
//! let disc = FlatRateDiscounter::new(Currency::USD).with_rate(Currency::USD, 0.0);
//! let regressor = LinearRegressor::new(
//!     LinearRegression,
//!     today,
//!     Currency::USD,
//!     Arc::new(flows),
//!     Arc::new(disc),
//! )
//! .with_regression_variable(samples);
//!
//! let epe = regressor.epe().unwrap();
//! assert!((epe.values[0] - 0.25).abs() < 1e-2);
//! assert!(regressor.pfe(0.99).unwrap().values[0] >= regressor.pfe(0.95).unwrap().values[0]);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod exposure;
pub mod regression;

pub use error::XvaError;
pub use exposure::{
    CashFlow, ExpectedFlows, ExposureCalculator, ExposureProfile, ExposureRegressor,
    LinearRegressor, MultipleLinearRegressor, SegmentedLinearRegressor,
};
pub use regression::{
    LinearRegression, MultipleLinearRegression, Predict, Regression, SegmentedLinearRegression,
};
