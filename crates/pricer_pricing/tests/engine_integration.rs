//! End-to-end tests for the path engine.
//!
//! # Test Coverage
//!
//! - Sobol dimension-0 ensemble mean over 2^16 paths
//! - Output independence from block partitioning (Sobol and pseudo-random)
//! - Finishing fixpoint: dependency chains and cycles
//! - Single-threaded levels and cancellation
//! - GBM forward under the pseudo-random generator
//! - TOML configuration through to an engine run

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use pricer_core::types::Date;
use pricer_pricing::mc::{
    EngineConfig, Executor, FeatureCollection, FinishStatus, GbmDiffusion, GbmParams, PathBlock,
    PathEngine, PathProcess, RegressionSampler, SimulationError,
};
use pricer_pricing::rng::{PseudoRandomPathGenerator, SobolPathGenerator, SobolShift};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn config(paths: usize) -> EngineConfig {
    EngineConfig::builder()
        .number_of_paths(paths)
        .seed(2024)
        .build()
        .unwrap()
}

/// Ten monthly dates from 2025-01-31.
fn grid() -> Vec<Date> {
    let start = Date::from_ymd(2025, 1, 31).unwrap();
    (0..10).map(|i| start.add_days(30 * i)).collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

// ============================================================================
// Sobol ensemble
// ============================================================================

#[test]
fn test_sobol_dimension_zero_mean_is_half() {
    init_tracing();
    let paths = 1 << 16;
    let mut engine = PathEngine::new(&config(paths), Executor::with_threads(4).unwrap());

    let dates = grid();
    let sampler = RegressionSampler::new("u", dates.clone());
    let store = sampler.store();
    engine.add_process(0, Box::new(SobolPathGenerator::with_embedded_table().unwrap()));
    engine.add_process(1, Box::new(sampler));

    let summary = engine.run().unwrap();
    assert_eq!(summary.number_of_paths, paths);
    assert_eq!(summary.factors, 1);
    assert_eq!(summary.steps, 10);
    assert_eq!(summary.blocks, 8);

    // factor 0, step 0 is table dimension 0
    let first = store.values_at(dates[0]).unwrap();
    assert_eq!(first.len(), paths);
    assert!((mean(&first) - 0.5).abs() <= 1.0 / paths as f64);

    // every dimension of a 2^m point set is equidistributed
    for date in &dates[1..] {
        let values = store.values_at(*date).unwrap();
        assert!((mean(&values) - 0.5).abs() <= 1.0 / paths as f64);
    }
}

fn sobol_values(executor: Executor, shift: SobolShift) -> Vec<Vec<f64>> {
    let mut engine = PathEngine::new(&config(4_096), executor);
    let dates = grid();
    let sampler = RegressionSampler::new("z", dates.clone());
    let store = sampler.store();
    engine.add_process(
        0,
        Box::new(
            SobolPathGenerator::with_embedded_table()
                .unwrap()
                .with_seed(5)
                .with_shift(shift)
                .with_normal_transform(true),
        ),
    );
    engine.add_process(1, Box::new(sampler));
    engine.run().unwrap();
    dates.iter().map(|d| store.values_at(*d).unwrap()).collect()
}

#[test]
fn test_sobol_output_independent_of_partitioning() {
    let shift = SobolShift::DigitalFlip { seed: 11 };
    let sequential = sobol_values(Executor::sequential(), shift);
    let pooled = sobol_values(Executor::with_threads(3).unwrap(), shift);
    assert_eq!(sequential, pooled);

    let z = &sequential[0];
    assert!(mean(z).abs() < 0.01);
}

#[test]
fn test_pseudo_random_output_independent_of_partitioning() {
    let run = |executor: Executor| {
        let mut engine = PathEngine::new(&config(2_048), executor);
        let dates = grid();
        let sampler = RegressionSampler::new("z", dates.clone());
        let store = sampler.store();
        engine.add_process(0, Box::new(PseudoRandomPathGenerator::new()));
        engine.add_process(1, Box::new(sampler));
        engine.run().unwrap();
        dates
            .iter()
            .map(|d| store.values_at(*d).unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(run(Executor::sequential()), run(Executor::with_threads(5).unwrap()));
}

// ============================================================================
// GBM
// ============================================================================

#[test]
fn test_gbm_forward_matches_drift() {
    let today = Date::from_ymd(2025, 1, 1).unwrap();
    let horizon = Date::from_ymd(2026, 1, 1).unwrap();
    let params = GbmParams::new(100.0, 0.03, 0.25);

    let mut engine = PathEngine::new(&config(1 << 15), Executor::with_threads(2).unwrap());
    engine.features_mut().set_time_origin(today).unwrap();
    let sampler = RegressionSampler::new("spx", [horizon]);
    let store = sampler.store();
    engine.add_process(
        0,
        Box::new(
            SobolPathGenerator::with_embedded_table()
                .unwrap()
                .with_shift(SobolShift::Rotation { seed: 1 })
                .with_normal_transform(true),
        ),
    );
    engine.add_process(1, Box::new(GbmDiffusion::new("spx", params)));
    engine.add_process(2, Box::new(sampler));
    engine.run().unwrap();

    let terminal = store.values_at(horizon).unwrap();
    assert_relative_eq!(mean(&terminal), 100.0 * 0.03_f64.exp(), max_relative = 5e-3);
}

// ============================================================================
// Finishing protocol
// ============================================================================

/// Finishes only once `waits_for` (if any) has finished.
struct Dependent {
    name: String,
    waits_for: Option<String>,
    attempts: Arc<AtomicUsize>,
}

impl PathProcess for Dependent {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires_finish(&self) -> bool {
        true
    }

    fn finish(&mut self, features: &FeatureCollection) -> Result<FinishStatus, SimulationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match &self.waits_for {
            Some(other) if !features.is_finished(other) => Ok(FinishStatus::Pending),
            _ => Ok(FinishStatus::Complete),
        }
    }

    fn process(&self, _block: &mut PathBlock) -> Result<(), SimulationError> {
        Ok(())
    }
}

fn dependent(name: &str, waits_for: Option<&str>, attempts: &Arc<AtomicUsize>) -> Box<dyn PathProcess> {
    Box::new(Dependent {
        name: name.to_string(),
        waits_for: waits_for.map(str::to_string),
        attempts: attempts.clone(),
    })
}

#[test]
fn test_dependency_chain_finishes_within_n_passes() {
    init_tracing();
    const N: usize = 6;
    let attempts = Arc::new(AtomicUsize::new(0));
    let mut engine = PathEngine::new(&config(64), Executor::sequential());

    // c0 waits for c1, ..., c4 waits for c5: worst case for registration order
    for i in 0..N {
        let next = format!("c{}", i + 1);
        let waits_for = (i + 1 < N).then_some(next.as_str());
        engine.add_process(i % 2, dependent(&format!("c{i}"), waits_for, &attempts));
    }

    let passes = engine.prepare().unwrap();
    assert_eq!(passes, N);
    assert!((0..N).all(|i| engine.features().is_finished(&format!("c{i}"))));
    assert_eq!(attempts.load(Ordering::SeqCst), N * (N + 1) / 2);
}

#[test]
fn test_dependency_in_registration_order_finishes_in_one_pass() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let mut engine = PathEngine::new(&config(64), Executor::sequential());
    engine.add_process(0, dependent("a", None, &attempts));
    engine.add_process(0, dependent("b", Some("a"), &attempts));
    engine.add_process(1, dependent("c", Some("b"), &attempts));
    assert_eq!(engine.prepare().unwrap(), 1);
}

#[test]
fn test_dependency_cycle_is_unresolvable() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let mut engine = PathEngine::new(&config(64), Executor::sequential());
    engine.add_process(0, dependent("free", None, &attempts));
    engine.add_process(0, dependent("left", Some("right"), &attempts));
    engine.add_process(0, dependent("right", Some("left"), &attempts));

    match engine.prepare() {
        Err(SimulationError::UnresolvableDependency { pending }) => {
            assert_eq!(pending, vec!["left".to_string(), "right".to_string()]);
        }
        other => panic!("expected unresolvable dependency, got {other:?}"),
    }
}

// ============================================================================
// Scheduling
// ============================================================================

/// Records the first global path index of every block it sees, in order.
struct BlockRecorder {
    seen: Arc<Mutex<Vec<usize>>>,
}

impl PathProcess for BlockRecorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn run_single_threaded(&self) -> bool {
        true
    }

    fn process(&self, _block: &mut PathBlock) -> Result<(), SimulationError> {
        unreachable!("single-threaded levels use process_sequential")
    }

    fn process_sequential(&mut self, block: &mut PathBlock) -> Result<(), SimulationError> {
        self.seen.lock().unwrap().push(block.global_path_index());
        Ok(())
    }
}

#[test]
fn test_single_threaded_level_visits_blocks_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut engine = PathEngine::new(&config(96), Executor::with_threads(3).unwrap());
    engine.add_process(0, Box::new(SobolPathGenerator::with_embedded_table().unwrap()));
    engine.add_process(0, Box::new(RegressionSampler::new("x", grid())));
    engine.add_process(
        1,
        Box::new(BlockRecorder { seen: seen.clone() }),
    );
    engine.run().unwrap();

    // 24 lane groups over 6 blocks
    assert_eq!(*seen.lock().unwrap(), vec![0, 16, 32, 48, 64, 80]);
}

/// Cancels the run from inside the first level.
struct Canceller(pricer_pricing::mc::CancellationToken);

impl PathProcess for Canceller {
    fn name(&self) -> &str {
        "canceller"
    }

    fn process(&self, _block: &mut PathBlock) -> Result<(), SimulationError> {
        self.0.cancel();
        Ok(())
    }
}

/// Fails if it is ever run.
struct MustNotRun;

impl PathProcess for MustNotRun {
    fn name(&self) -> &str {
        "must-not-run"
    }

    fn process(&self, _block: &mut PathBlock) -> Result<(), SimulationError> {
        Err(SimulationError::Process {
            name: "must-not-run".to_string(),
            message: "ran after cancellation".to_string(),
        })
    }
}

#[test]
fn test_cancellation_stops_at_level_boundary() {
    let mut engine = PathEngine::new(&config(64), Executor::sequential());
    let token = engine.cancellation_token();
    engine.add_process(0, Box::new(RegressionSampler::new("x", grid())));
    engine.add_process(0, Box::new(Canceller(token)));
    engine.add_process(1, Box::new(MustNotRun));
    assert!(matches!(engine.run(), Err(SimulationError::Cancelled)));
}

#[test]
fn test_insufficient_parallelism_is_reported() {
    // 2 lane groups cannot fill 2 * 4 blocks
    let mut engine = PathEngine::new(&config(8), Executor::with_threads(4).unwrap());
    engine.add_process(0, Box::new(RegressionSampler::new("x", grid())));
    assert!(matches!(
        engine.run(),
        Err(SimulationError::InsufficientParallelism { .. })
    ));
}

#[test]
fn test_engine_from_toml_config() {
    let config = EngineConfig::from_toml_str(
        r#"
        number_of_paths = 512
        threads = 2
        seed = 17
        "#,
    )
    .unwrap();
    let mut engine = PathEngine::from_config(&config).unwrap();
    assert_eq!(engine.features().engine().seed, 17);
    assert_eq!(engine.features().engine().parallelism, 2);

    engine.add_process(0, Box::new(PseudoRandomPathGenerator::new().uniform()));
    engine.add_process(1, Box::new(RegressionSampler::new("u", grid())));
    let summary = engine.run().unwrap();
    assert_eq!(summary.blocks, 4);
    assert_eq!(summary.levels, 2);
}
