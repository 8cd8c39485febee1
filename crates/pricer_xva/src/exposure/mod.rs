//! Forward exposure estimation.
//!
//! This module turns captured path samples and per-path cashflow schedules
//! into exposure profiles:
//!
//! - Potential Future Exposure (PFE)
//! - Expected Positive Exposure (EPE)
//! - Expected Negative Exposure (ENE)
//!
//! ## Module Structure
//!
//! - [`flows`]: [`CashFlow`] and the [`ExpectedFlows`] collaborator trait
//! - [`regressor`]: [`ExposureRegressor`] and its method aliases
//! - [`profile`]: dated [`ExposureProfile`] results
//! - [`calculator`]: [`ExposureCalculator`] statistics

pub mod calculator;
pub mod flows;
pub mod profile;
pub mod regressor;

pub use calculator::ExposureCalculator;
pub use flows::{CashFlow, ExpectedFlows};
pub use profile::ExposureProfile;
pub use regressor::{
    DateFit, ExposureRegressor, LinearRegressor, MultipleLinearRegressor,
    SegmentedLinearRegressor,
};
