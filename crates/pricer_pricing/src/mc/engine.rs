//! The level-barrier path engine.
//!
//! [`PathEngine`] owns the processes and the feature collection, runs the
//! setup and finishing protocol once, then pushes every block through every
//! level:
//!
//! ```text
//! setup  -> every process registers features
//! close  -> features sorted and frozen
//! finish -> fixpoint over processes that require it
//! run    -> for each level: every block through every process on it
//! ```
//!
//! Levels are strict barriers. Within a level, blocks run concurrently on the
//! injected [`Executor`] unless a process on that level asks to run single
//! threaded.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::block_set::BlockSet;
use super::config::EngineConfig;
use super::error::SimulationError;
use super::executor::{CancellationToken, Executor};
use super::features::{EngineFeature, FeatureCollection};
use super::process::{FinishStatus, PathProcess};

/// Statistics of one engine run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Paths simulated (0 when the run was a no-op).
    pub number_of_paths: usize,
    /// Factors per path.
    pub factors: usize,
    /// Steps per factor.
    pub steps: usize,
    /// Blocks the paths were split into.
    pub blocks: usize,
    /// Levels executed.
    pub levels: usize,
    /// Wall-clock time spent processing blocks.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Whether nothing was simulated.
    pub fn is_noop(&self) -> bool {
        self.blocks == 0
    }
}

/// Orchestrates setup, finishing and block-parallel execution of processes.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::mc::{EngineConfig, Executor, PathEngine};
///
/// let config = EngineConfig::builder().number_of_paths(64).build().unwrap();
/// let mut engine = PathEngine::new(&config, Executor::sequential());
///
/// // No processes registered: the run is a no-op.
/// assert!(engine.run().unwrap().is_noop());
/// ```
pub struct PathEngine {
    features: FeatureCollection,
    levels: Vec<Vec<Box<dyn PathProcess>>>,
    registration: Vec<(usize, usize)>,
    executor: Executor,
    cancellation: CancellationToken,
    number_of_paths: usize,
    set_up: bool,
    prepared: bool,
}

impl PathEngine {
    /// Creates an engine for `config.number_of_paths()` paths.
    ///
    /// The executor's parallelism, not the configuration's, decides the
    /// block count.
    pub fn new(config: &EngineConfig, executor: Executor) -> Self {
        let features = FeatureCollection::new(EngineFeature {
            number_of_paths: config.number_of_paths(),
            parallelism: executor.parallelism(),
            seed: config.seed(),
        });
        Self {
            features,
            levels: Vec::new(),
            registration: Vec::new(),
            executor,
            cancellation: CancellationToken::new(),
            number_of_paths: config.number_of_paths(),
            set_up: false,
            prepared: false,
        }
    }

    /// Builds the executor from the configuration and creates the engine.
    pub fn from_config(config: &EngineConfig) -> Result<Self, SimulationError> {
        Ok(Self::new(config, Executor::from_config(config)?))
    }

    /// Adds a process on `level`, creating empty levels below it as needed.
    pub fn add_process(&mut self, level: usize, process: Box<dyn PathProcess>) {
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, Vec::new);
        }
        self.registration.push((level, self.levels[level].len()));
        self.levels[level].push(process);
    }

    /// Number of levels, including empty ones.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Number of registered processes.
    pub fn process_count(&self) -> usize {
        self.registration.len()
    }

    /// The shared feature collection.
    pub fn features(&self) -> &FeatureCollection {
        &self.features
    }

    /// Mutable access for engine-level configuration before setup.
    pub fn features_mut(&mut self) -> &mut FeatureCollection {
        &mut self.features
    }

    /// A handle that cancels this engine's runs.
    ///
    /// A cancellation stays in force for later runs until
    /// [`CancellationToken::reset`] is called.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Runs setup, closes the collection and finishes every process.
    ///
    /// Runs at most once per engine; later calls return `Ok(0)`. Returns the
    /// number of finishing passes taken. Setup is not repeated after a
    /// failed finish, so a retry reports the same error.
    pub fn prepare(&mut self) -> Result<usize, SimulationError> {
        if self.prepared {
            return Ok(0);
        }
        if !self.set_up {
            for &(level, index) in &self.registration {
                self.levels[level][index].setup_features(&mut self.features)?;
            }
            self.set_up = true;
        }
        self.features.finish_setup()?;
        let passes = self.finish_processes()?;
        self.prepared = true;
        Ok(passes)
    }

    fn finish_processes(&mut self) -> Result<usize, SimulationError> {
        let mut pending: Vec<(usize, usize)> = self
            .registration
            .iter()
            .copied()
            .filter(|&(level, index)| self.levels[level][index].requires_finish())
            .collect();

        let mut passes = 0;
        while !pending.is_empty() {
            passes += 1;
            let before = pending.len();
            let mut deferred = Vec::new();

            for (level, index) in pending {
                let process = &mut self.levels[level][index];
                match process.finish(&self.features)? {
                    FinishStatus::Complete => self.features.mark_finished(process.name()),
                    FinishStatus::Pending => deferred.push((level, index)),
                }
            }

            if deferred.len() == before {
                let names = deferred
                    .iter()
                    .map(|&(level, index)| self.levels[level][index].name().to_string())
                    .collect();
                return Err(SimulationError::UnresolvableDependency { pending: names });
            }
            debug!(pass = passes, deferred = deferred.len(), "Finishing pass complete");
            pending = deferred;
        }
        Ok(passes)
    }

    /// Runs the simulation.
    ///
    /// Prepares the engine on first call. With no processes, no factors or
    /// no steps the run is a no-op. The block set is disposed whether or not
    /// processing succeeds.
    ///
    /// # Errors
    ///
    /// Alignment, finishing and process errors, and
    /// [`SimulationError::Cancelled`] if the token fires mid-run.
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        if self.registration.is_empty() {
            debug!("No processes registered; nothing to run");
            return Ok(RunSummary::default());
        }
        self.prepare()?;

        let factors = self.features.dimensions().num_factors();
        let steps = self.features.time_steps().num_steps();
        if factors == 0 || steps == 0 {
            debug!(factors, steps, "Empty path shape; nothing to run");
            return Ok(RunSummary::default());
        }

        let start = Instant::now();
        let mut block_set = BlockSet::new(
            self.number_of_paths,
            factors,
            steps,
            self.executor.parallelism(),
        )?;
        let blocks = block_set.len();
        let result = self.run_levels(&mut block_set);
        block_set.dispose();
        result?;

        let summary = RunSummary {
            number_of_paths: self.number_of_paths,
            factors,
            steps,
            blocks,
            levels: self.levels.len(),
            elapsed: start.elapsed(),
        };
        info!(
            paths = summary.number_of_paths,
            factors,
            steps,
            blocks,
            levels = summary.levels,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Path simulation complete"
        );
        Ok(summary)
    }

    fn run_levels(&mut self, block_set: &mut BlockSet) -> Result<(), SimulationError> {
        let cancellation = &self.cancellation;
        for (level_index, level) in self.levels.iter_mut().enumerate() {
            cancellation.check()?;
            if level.is_empty() {
                continue;
            }

            if level.iter().any(|p| p.run_single_threaded()) {
                debug!(level = level_index, "Running level single-threaded");
                for block in block_set.iter_mut() {
                    cancellation.check()?;
                    for process in level.iter_mut() {
                        process.process_sequential(block)?;
                    }
                }
            } else {
                debug!(level = level_index, processes = level.len(), "Running level");
                let processes: &[Box<dyn PathProcess>] = &level[..];
                self.executor
                    .for_each_block(block_set.blocks_mut(), |block| {
                        cancellation.check()?;
                        processes.iter().try_for_each(|p| p.process(block))
                    })?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for PathEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<Vec<&str>> = self
            .levels
            .iter()
            .map(|level| level.iter().map(|p| p.name()).collect())
            .collect();
        f.debug_struct("PathEngine")
            .field("number_of_paths", &self.number_of_paths)
            .field("levels", &names)
            .field("executor", &self.executor)
            .field("prepared", &self.prepared)
            .finish()
    }
}
