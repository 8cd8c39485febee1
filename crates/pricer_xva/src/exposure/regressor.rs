//! Regression-based forward exposure.
//!
//! At every exposure date `t`, the remaining value of path `p` is
//!
//! ```text
//! V_p(t) = Σ_{flows settling after t} fv · FX(ccy → reporting) · df(ccy, t, settle)
//! ```
//!
//! The regressor fits `V(t)` against the simulated regression variables at
//! `t`, predicts every path from the fit, and reports statistics of the
//! predictions discounted back to the valuation date. The fit runs once, on
//! first use, and is shared by every later query.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use pricer_core::market_data::{Discounter, MarketDataError};
use pricer_core::types::{Currency, Date};
use pricer_pricing::mc::SampleStore;
use rayon::prelude::*;
use tracing::{debug, info};

use super::calculator::ExposureCalculator;
use super::flows::{CashFlow, ExpectedFlows};
use super::profile::ExposureProfile;
use crate::error::XvaError;
use crate::regression::{
    LinearRegression, MultipleLinearRegression, Predict, Regression, SegmentedLinearRegression,
};

/// Single-variable OLS exposure regressor.
pub type LinearRegressor = ExposureRegressor<LinearRegression>;
/// Multi-factor exposure regressor.
pub type MultipleLinearRegressor = ExposureRegressor<MultipleLinearRegression>;
/// Piecewise-linear exposure regressor.
pub type SegmentedLinearRegressor = ExposureRegressor<SegmentedLinearRegression>;

/// The fit at one exposure date.
#[derive(Clone, Debug)]
pub struct DateFit<M> {
    /// Exposure date.
    pub date: Date,
    /// Reporting-currency discount factor from the valuation date.
    pub discount_factor: f64,
    /// Fitted model.
    pub model: M,
    /// Undiscounted predictions for every path, ascending.
    pub predictions: Vec<f64>,
}

/// Estimates PFE/EPE/ENE profiles by regressing remaining value on
/// simulated regression variables.
///
/// Regression variables are [`SampleStore`]s filled by an engine run, one
/// per factor the method fits. Exposure dates default to the first
/// variable's sampled dates; dates before the valuation date are ignored.
///
/// Queries take `&self` and may come from several threads; the first one
/// performs the fit.
pub struct ExposureRegressor<R: Regression> {
    regression: R,
    valuation_date: Date,
    reporting_currency: Currency,
    exposure_dates: Vec<Date>,
    variables: Vec<SampleStore>,
    flows: Arc<dyn ExpectedFlows>,
    discounter: Arc<dyn Discounter>,
    fitted: OnceLock<Result<Vec<DateFit<R::Model>>, XvaError>>,
}

impl<R: Regression> ExposureRegressor<R> {
    /// A regressor with no variables and default exposure dates.
    pub fn new(
        regression: R,
        valuation_date: Date,
        reporting_currency: Currency,
        flows: Arc<dyn ExpectedFlows>,
        discounter: Arc<dyn Discounter>,
    ) -> Self {
        Self {
            regression,
            valuation_date,
            reporting_currency,
            exposure_dates: Vec::new(),
            variables: Vec::new(),
            flows,
            discounter,
            fitted: OnceLock::new(),
        }
    }

    /// Uses `dates` instead of the sampled dates.
    pub fn with_exposure_dates(mut self, dates: impl IntoIterator<Item = Date>) -> Self {
        self.exposure_dates = dates.into_iter().collect();
        self.exposure_dates.sort_unstable();
        self.exposure_dates.dedup();
        self.fitted = OnceLock::new();
        self
    }

    /// Appends a regression variable.
    pub fn with_regression_variable(mut self, store: SampleStore) -> Self {
        self.variables.push(store);
        self.fitted = OnceLock::new();
        self
    }

    /// The fitting method.
    pub fn regression(&self) -> &R {
        &self.regression
    }

    /// Valuation date exposures are discounted to.
    pub fn valuation_date(&self) -> Date {
        self.valuation_date
    }

    /// Currency exposures are reported in.
    pub fn reporting_currency(&self) -> Currency {
        self.reporting_currency
    }

    /// Whether the fit has been attempted.
    pub fn is_fitted(&self) -> bool {
        self.fitted.get().is_some()
    }

    /// Runs the fit if it has not run yet.
    ///
    /// # Errors
    ///
    /// The fit's error, every time it is asked for.
    pub fn fit(&self) -> Result<&[DateFit<R::Model>], XvaError> {
        self.fitted
            .get_or_init(|| self.fit_all())
            .as_deref()
            .map_err(|e| e.clone())
    }

    /// Undiscounted prediction at an exposure date.
    pub fn predict(&self, date: Date, x: &[f64]) -> Result<f64, XvaError> {
        let fits = self.fit()?;
        let fit = fits
            .iter()
            .find(|f| f.date == date)
            .ok_or(XvaError::MissingSamples { date })?;
        Ok(fit.model.predict(x))
    }

    /// Potential Future Exposure: the `confidence`-quantile of predicted
    /// values at each date, discounted to the valuation date.
    ///
    /// # Errors
    ///
    /// `InvalidConfidence` unless `confidence` lies in `[0, 1]`; otherwise
    /// any fitting error.
    pub fn pfe(&self, confidence: f64) -> Result<ExposureProfile, XvaError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(XvaError::InvalidConfidence(confidence));
        }
        self.profile(|p| ExposureCalculator::quantile(p, confidence))
    }

    /// Expected Positive Exposure at each date, discounted.
    pub fn epe(&self) -> Result<ExposureProfile, XvaError> {
        self.profile(ExposureCalculator::expected_positive)
    }

    /// Expected Negative Exposure at each date, discounted, as a
    /// non-negative amount.
    pub fn ene(&self) -> Result<ExposureProfile, XvaError> {
        self.profile(ExposureCalculator::expected_negative)
    }

    fn profile(&self, statistic: impl Fn(&[f64]) -> f64) -> Result<ExposureProfile, XvaError> {
        let fits = self.fit()?;
        Ok(ExposureProfile {
            dates: fits.iter().map(|f| f.date).collect(),
            values: fits
                .iter()
                .map(|f| statistic(&f.predictions) * f.discount_factor)
                .collect(),
        })
    }

    fn resolve_dates(&self) -> Result<Vec<Date>, XvaError> {
        let dates = if self.exposure_dates.is_empty() {
            self.variables
                .first()
                .map(SampleStore::dates)
                .unwrap_or_default()
        } else {
            self.exposure_dates.clone()
        };
        let dates: Vec<Date> = dates
            .into_iter()
            .filter(|&d| d >= self.valuation_date)
            .collect();
        if dates.is_empty() {
            return Err(XvaError::NoExposureDates);
        }
        Ok(dates)
    }

    fn fit_all(&self) -> Result<Vec<DateFit<R::Model>>, XvaError> {
        let dates = self.resolve_dates()?;
        let expected = self.regression.factors();
        if self.variables.len() != expected {
            return Err(XvaError::FactorCountMismatch {
                expected,
                actual: self.variables.len(),
            });
        }

        let flows = self.flows.expected_flows_by_path();
        if flows.is_empty() {
            return Err(XvaError::NoPaths);
        }
        let fx = self.fx_rates(&flows)?;
        debug!(
            dates = dates.len(),
            paths = flows.len(),
            currencies = fx.len(),
            "Fitting exposure regression"
        );

        let fits = dates
            .par_iter()
            .map(|&date| self.fit_date(date, &flows, &fx))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            dates = fits.len(),
            paths = flows.len(),
            "Exposure regression fitted"
        );
        Ok(fits)
    }

    fn fx_rates(&self, flows: &[Vec<CashFlow>]) -> Result<HashMap<Currency, f64>, XvaError> {
        let mut fx = HashMap::new();
        for flow in flows.iter().flatten() {
            if !fx.contains_key(&flow.currency) {
                let rate = self.discounter.fx_rate(flow.currency, self.reporting_currency)?;
                fx.insert(flow.currency, rate);
            }
        }
        Ok(fx)
    }

    fn fit_date(
        &self,
        date: Date,
        flows: &[Vec<CashFlow>],
        fx: &HashMap<Currency, f64>,
    ) -> Result<DateFit<R::Model>, XvaError> {
        let n = flows.len();
        let columns = self
            .variables
            .iter()
            .map(|store| -> Result<Vec<f64>, XvaError> {
                let values = store
                    .values_at(date)
                    .ok_or(XvaError::MissingSamples { date })?;
                if values.len() == n {
                    Ok(values)
                } else {
                    Err(XvaError::SampleCountMismatch {
                        expected: n,
                        actual: values.len(),
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        let targets = flows
            .iter()
            .map(|path| self.remaining_value(date, path, fx))
            .collect::<Result<Vec<_>, _>>()?;

        let slices: Vec<&[f64]> = columns.iter().map(Vec::as_slice).collect();
        let model = self.regression.fit(&slices, &targets)?;

        let mut row = vec![0.0; columns.len()];
        let mut predictions: Vec<f64> = (0..n)
            .map(|p| {
                for (slot, column) in row.iter_mut().zip(&columns) {
                    *slot = column[p];
                }
                model.predict(&row)
            })
            .collect();
        predictions.sort_by(f64::total_cmp);

        let discount_factor =
            self.discounter
                .discount_factor(self.reporting_currency, self.valuation_date, date)?;
        Ok(DateFit {
            date,
            discount_factor,
            model,
            predictions,
        })
    }

    fn remaining_value(
        &self,
        date: Date,
        flows: &[CashFlow],
        fx: &HashMap<Currency, f64>,
    ) -> Result<f64, XvaError> {
        flows
            .iter()
            .filter(|f| f.settle_date > date)
            .try_fold(0.0, |acc, f| -> Result<f64, XvaError> {
                let rate = fx.get(&f.currency).copied().ok_or(MarketDataError::MissingFxRate {
                    from: f.currency,
                    to: self.reporting_currency,
                })?;
                let df = self.discounter.discount_factor(f.currency, date, f.settle_date)?;
                Ok(acc + f.future_value * rate * df)
            })
    }
}

impl<R: Regression + std::fmt::Debug> std::fmt::Debug for ExposureRegressor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExposureRegressor")
            .field("regression", &self.regression)
            .field("valuation_date", &self.valuation_date)
            .field("reporting_currency", &self.reporting_currency)
            .field("exposure_dates", &self.exposure_dates)
            .field("variables", &self.variables.len())
            .field("fitted", &self.is_fitted())
            .finish()
    }
}
