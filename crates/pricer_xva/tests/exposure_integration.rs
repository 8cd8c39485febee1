//! End-to-end exposure tests: engine run, sample capture, regression.
//!
//! # Test Coverage
//!
//! - Linear regressor on a simulated forward: fit, PFE ordering, EPE − ENE
//! - Segmented and multiple-factor regressors on the same simulation
//! - Concurrent first use triggers exactly one fit
//! - Degenerate regression variable yields the mean payoff

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use pricer_core::market_data::{Discounter, FlatRateDiscounter};
use pricer_core::types::{Currency, Date};
use pricer_pricing::mc::{
    EngineConfig, Executor, FeatureCollection, FinishStatus, GbmDiffusion, GbmParams, PathBlock,
    PathEngine, PathProcess, RegressionSampler, SampleStore, SimulationError,
};
use pricer_pricing::rng::{SobolPathGenerator, SobolShift};
use pricer_xva::exposure::{
    CashFlow, ExpectedFlows, LinearRegressor, MultipleLinearRegressor, SegmentedLinearRegressor,
};
use pricer_xva::regression::{
    LinearRegression, MultipleLinearRegression, SegmentedLinearRegression,
};
use pricer_xva::XvaError;

const RATE: f64 = 0.03;
const SPOT: f64 = 100.0;
const STRIKE: f64 = 100.0;

fn d(y: i32, m: u32, day: u32) -> Date {
    Date::from_ymd(y, m, day).unwrap()
}

/// Long one forward on a factor, settled at maturity.
#[derive(Clone)]
struct ForwardPayoff {
    factor_name: String,
    maturity: Date,
    strike: f64,
    factor: usize,
    step: usize,
    terminal: Arc<Mutex<Vec<f64>>>,
}

impl ForwardPayoff {
    fn new(factor_name: &str, maturity: Date, strike: f64) -> Self {
        Self {
            factor_name: factor_name.to_string(),
            maturity,
            strike,
            factor: 0,
            step: 0,
            terminal: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl PathProcess for ForwardPayoff {
    fn name(&self) -> &str {
        "forward"
    }

    fn setup_features(&mut self, features: &mut FeatureCollection) -> Result<(), SimulationError> {
        features.add_dimension(&self.factor_name)?;
        features.add_dates([self.maturity])
    }

    fn requires_finish(&self) -> bool {
        true
    }

    fn finish(&mut self, features: &FeatureCollection) -> Result<FinishStatus, SimulationError> {
        let unresolved = |message: &str| SimulationError::Process {
            name: "forward".to_string(),
            message: message.to_string(),
        };
        self.factor = features
            .dimensions()
            .index_of(&self.factor_name)
            .ok_or_else(|| unresolved("factor not registered"))?;
        self.step = features
            .time_steps()
            .index_of(self.maturity)
            .ok_or_else(|| unresolved("maturity not on the grid"))?;
        *self.terminal.lock().unwrap() = vec![0.0; features.engine().number_of_paths];
        Ok(FinishStatus::Complete)
    }

    fn process(&self, block: &mut PathBlock) -> Result<(), SimulationError> {
        let start = block.global_path_index();
        let mut terminal = self.terminal.lock().unwrap();
        for path in 0..block.number_of_paths() {
            terminal[start + path] = block.get(path, self.factor, self.step);
        }
        Ok(())
    }
}

impl ExpectedFlows for ForwardPayoff {
    fn expected_flows_by_path(&self) -> Vec<Vec<CashFlow>> {
        self.terminal
            .lock()
            .unwrap()
            .iter()
            .map(|s| vec![CashFlow::new(self.maturity, Currency::USD, s - self.strike)])
            .collect()
    }
}

/// Counts how often the schedules are requested.
struct Counting<F> {
    inner: F,
    calls: AtomicUsize,
}

impl<F: ExpectedFlows> ExpectedFlows for Counting<F> {
    fn expected_flows_by_path(&self) -> Vec<Vec<CashFlow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.expected_flows_by_path()
    }
}

struct Simulation {
    today: Date,
    maturity: Date,
    dates: Vec<Date>,
    spot: SampleStore,
    other: SampleStore,
    payoff: ForwardPayoff,
}

/// Two GBM factors over quarterly dates to a one-year forward on the first.
fn simulate(paths: usize) -> Simulation {
    let today = d(2025, 1, 1);
    let maturity = d(2026, 1, 1);
    let dates = vec![d(2025, 4, 1), d(2025, 7, 1), d(2025, 10, 1), maturity];

    let config = EngineConfig::builder()
        .number_of_paths(paths)
        .seed(99)
        .build()
        .unwrap();
    let mut engine = PathEngine::new(&config, Executor::with_threads(2).unwrap());
    engine.features_mut().set_time_origin(today).unwrap();

    let spot = RegressionSampler::new("spx", dates.clone());
    let other = RegressionSampler::new("eurusd", dates.clone());
    let payoff = ForwardPayoff::new("spx", maturity, STRIKE);
    let (spot_store, other_store) = (spot.store(), other.store());

    engine.add_process(
        0,
        Box::new(
            SobolPathGenerator::with_embedded_table()
                .unwrap()
                .with_shift(SobolShift::Rotation { seed: 17 })
                .with_normal_transform(true),
        ),
    );
    engine.add_process(1, Box::new(GbmDiffusion::new("spx", GbmParams::new(SPOT, RATE, 0.2))));
    engine.add_process(1, Box::new(GbmDiffusion::new("eurusd", GbmParams::new(1.1, 0.0, 0.1))));
    engine.add_process(2, Box::new(spot));
    engine.add_process(2, Box::new(other));
    engine.add_process(2, Box::new(payoff.clone()));
    let summary = engine.run().unwrap();
    assert_eq!(summary.factors, 2);
    assert_eq!(summary.steps, 4);

    Simulation {
        today,
        maturity,
        dates,
        spot: spot_store,
        other: other_store,
        payoff,
    }
}

fn discounter() -> Arc<dyn Discounter> {
    Arc::new(FlatRateDiscounter::new(Currency::USD).with_rate(Currency::USD, RATE))
}

fn year_fraction(from: Date, to: Date) -> f64 {
    (to - from) as f64 / 365.0
}

#[test]
fn test_linear_regressor_on_forward() {
    let sim = simulate(1 << 14);
    let regressor = LinearRegressor::new(
        LinearRegression,
        sim.today,
        Currency::USD,
        Arc::new(sim.payoff.clone()),
        discounter(),
    )
    .with_regression_variable(sim.spot.clone());

    // V(t) = S(t) - K·df(t, T)
    let t = sim.dates[1];
    let fits = regressor.fit().unwrap();
    assert_eq!(fits.len(), 4);
    let tau = year_fraction(t, sim.maturity);
    assert_relative_eq!(regressor.predict(t, &[0.0]).unwrap(), -STRIKE * (-RATE * tau).exp(), epsilon = 4.0);
    let slope = regressor.predict(t, &[1.0]).unwrap() - regressor.predict(t, &[0.0]).unwrap();
    assert_relative_eq!(slope, 1.0, epsilon = 0.05);

    let pfe95 = regressor.pfe(0.95).unwrap();
    let pfe99 = regressor.pfe(0.99).unwrap();
    for (lo, hi) in pfe95.values.iter().zip(&pfe99.values) {
        assert!(hi >= lo);
    }

    // mean prediction equals mean target, so EPE − ENE is the forward's value
    let epe = regressor.epe().unwrap();
    let ene = regressor.ene().unwrap();
    let value = SPOT - STRIKE * (-RATE * year_fraction(sim.today, sim.maturity)).exp();
    for i in 0..3 {
        assert!(epe.values[i] > 0.0 && ene.values[i] > 0.0);
        assert_relative_eq!(epe.values[i] - ene.values[i], value, epsilon = 0.15);
    }

    // nothing settles after maturity
    assert_eq!(epe.value_at(sim.maturity), Some(0.0));
    assert_eq!(pfe99.value_at(sim.maturity), Some(0.0));
    assert!(epe.peak() > 0.0);
}

#[test]
fn test_segmented_and_multiple_regressors() {
    let sim = simulate(1 << 14);
    let t = sim.dates[1];

    let segmented = SegmentedLinearRegressor::new(
        SegmentedLinearRegression::new(4).unwrap().continuous(true),
        sim.today,
        Currency::USD,
        Arc::new(sim.payoff.clone()),
        discounter(),
    )
    .with_exposure_dates([t])
    .with_regression_variable(sim.spot.clone());
    let pfe95 = segmented.pfe(0.95).unwrap();
    let pfe99 = segmented.pfe(0.99).unwrap();
    assert_eq!(pfe95.dates, vec![t]);
    assert!(pfe99.values[0] >= pfe95.values[0]);
    let fits = segmented.fit().unwrap();
    assert_eq!(fits[0].model.segments(), 4);

    let multiple = MultipleLinearRegressor::new(
        MultipleLinearRegression::new(2),
        sim.today,
        Currency::USD,
        Arc::new(sim.payoff.clone()),
        discounter(),
    )
    .with_exposure_dates([t])
    .with_regression_variable(sim.spot.clone())
    .with_regression_variable(sim.other.clone());
    let model = &multiple.fit().unwrap()[0].model;
    assert_relative_eq!(model.coefficients[0], 1.0, epsilon = 0.05);
    // the second factor is independent of the payoff
    assert!(model.coefficients[1].abs() < 10.0);

    let wrong = MultipleLinearRegressor::new(
        MultipleLinearRegression::new(3),
        sim.today,
        Currency::USD,
        Arc::new(sim.payoff.clone()),
        discounter(),
    )
    .with_regression_variable(sim.spot);
    assert_eq!(
        wrong.epe().unwrap_err(),
        XvaError::FactorCountMismatch {
            expected: 3,
            actual: 1
        }
    );
}

#[test]
fn test_concurrent_first_use_fits_once() {
    let sim = simulate(1 << 12);
    let flows = Arc::new(Counting {
        inner: sim.payoff.clone(),
        calls: AtomicUsize::new(0),
    });
    let regressor = LinearRegressor::new(
        LinearRegression,
        sim.today,
        Currency::USD,
        flows.clone(),
        discounter(),
    )
    .with_regression_variable(sim.spot.clone());

    let profiles: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8).map(|_| s.spawn(|| regressor.epe().unwrap())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(flows.calls.load(Ordering::SeqCst), 1);
    assert!(profiles.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_degenerate_variable_predicts_mean_payoff() {
    let sim = simulate(1 << 10);
    let t = sim.dates[0];
    let flows = sim.payoff.expected_flows_by_path();
    let n = flows.len();

    // a regression variable with no spread
    let flat = RegressionSampler::new("flat", [t]);
    let store = flat.store();
    let config = EngineConfig::builder().number_of_paths(n).build().unwrap();
    let mut engine = PathEngine::new(&config, Executor::sequential());
    engine.add_process(0, Box::new(flat));
    engine.run().unwrap();
    assert!(store.values_at(t).unwrap().iter().all(|&v| v == 0.0));

    let zero_rate: Arc<dyn Discounter> =
        Arc::new(FlatRateDiscounter::new(Currency::USD).with_rate(Currency::USD, 0.0));
    let regressor = LinearRegressor::new(
        LinearRegression,
        sim.today,
        Currency::USD,
        Arc::new(flows.clone()),
        zero_rate,
    )
    .with_regression_variable(store);

    let mean_payoff = flows.iter().map(|f| f[0].future_value).sum::<f64>() / n as f64;
    let prediction = regressor.predict(t, &[123.0]).unwrap();
    assert_relative_eq!(prediction, mean_payoff, epsilon = 1e-9);

    let pfe = regressor.pfe(0.99).unwrap();
    assert_relative_eq!(pfe.values[0], mean_payoff, epsilon = 1e-9);
}
