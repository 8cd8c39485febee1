//! The path process contract.
//!
//! A [`PathProcess`] is one stage of the simulation pipeline: a random
//! number generator, a diffusion, a payoff, a sampler. Processes are placed
//! on numbered levels of a [`PathEngine`](super::PathEngine); every process
//! on level `n` sees every block only after all level `n - 1` processes have
//! finished with every block.

use super::block::PathBlock;
use super::error::SimulationError;
use super::features::FeatureCollection;

/// Outcome of one [`PathProcess::finish`] attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishStatus {
    /// The process is ready to run.
    Complete,
    /// The process is waiting on another process; retry in the next pass.
    Pending,
}

/// One stage of the path pipeline.
///
/// Lifecycle: `setup_features` once, then (if `requires_finish`) `finish`
/// until it reports [`FinishStatus::Complete`], then `process` once per
/// block per run.
pub trait PathProcess: Send + Sync {
    /// Unique name; used for finish markers and error reports.
    fn name(&self) -> &str;

    /// Registers factors, dates and other requirements.
    ///
    /// Must be idempotent.
    fn setup_features(&mut self, _features: &mut FeatureCollection) -> Result<(), SimulationError> {
        Ok(())
    }

    /// Whether [`finish`](Self::finish) must run before processing.
    fn requires_finish(&self) -> bool {
        false
    }

    /// Reads the closed feature collection and prepares for processing.
    ///
    /// Return [`FinishStatus::Pending`] when a dependency named in the
    /// collection is not yet finished; the engine retries in the next pass.
    fn finish(&mut self, _features: &FeatureCollection) -> Result<FinishStatus, SimulationError> {
        Ok(FinishStatus::Complete)
    }

    /// Forces every block on this process's level to be processed
    /// sequentially on the calling thread.
    fn run_single_threaded(&self) -> bool {
        false
    }

    /// Fills or transforms the paths of one block.
    ///
    /// Called concurrently for distinct blocks.
    fn process(&self, block: &mut PathBlock) -> Result<(), SimulationError>;

    /// Sequential entry point used when the level runs single-threaded.
    ///
    /// Receives exclusive access to the process, so stateful processes can
    /// accumulate across blocks. Blocks arrive in path order.
    fn process_sequential(&mut self, block: &mut PathBlock) -> Result<(), SimulationError> {
        self.process(block)
    }
}
