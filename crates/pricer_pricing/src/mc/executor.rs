//! Block dispatch and cooperative cancellation.
//!
//! [`Executor`] is injected into the engine; it decides how many workers
//! the ensemble is split across and runs one closure over every block.
//! The pooled variant owns a dedicated rayon pool rather than using the
//! global one, so several engines can run side by side with independent
//! widths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::block::PathBlock;
use super::config::EngineConfig;
use super::error::SimulationError;

/// Runs work over blocks, either inline or on a rayon pool.
#[derive(Clone, Debug)]
pub enum Executor {
    /// Every block on the calling thread, in path order.
    Sequential,
    /// Blocks spread over a dedicated rayon pool.
    Pool(Arc<rayon::ThreadPool>),
}

impl Executor {
    /// Inline executor.
    pub fn sequential() -> Self {
        Self::Sequential
    }

    /// Pooled executor with `threads` workers (0 selects hardware threads).
    ///
    /// # Errors
    ///
    /// [`SimulationError::ThreadPool`] if the pool cannot be built.
    pub fn with_threads(threads: usize) -> Result<Self, SimulationError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("path-engine-{i}"))
            .build()
            .map_err(|e| SimulationError::ThreadPool(e.to_string()))?;
        Ok(Self::Pool(Arc::new(pool)))
    }

    /// Executor matching the configuration's threading settings.
    pub fn from_config(config: &EngineConfig) -> Result<Self, SimulationError> {
        if config.multithreaded() {
            Self::with_threads(config.parallelism())
        } else {
            Ok(Self::Sequential)
        }
    }

    /// Number of workers blocks are spread across.
    pub fn parallelism(&self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Pool(pool) => pool.current_num_threads(),
        }
    }

    /// Applies `f` to every block, stopping at the first error.
    ///
    /// Each block is visited exactly once. With a pool, blocks are processed
    /// concurrently and no ordering is guaranteed.
    pub fn for_each_block<F>(&self, blocks: &mut [PathBlock], f: F) -> Result<(), SimulationError>
    where
        F: Fn(&mut PathBlock) -> Result<(), SimulationError> + Send + Sync,
    {
        match self {
            Self::Sequential => blocks.iter_mut().try_for_each(f),
            Self::Pool(pool) => pool.install(|| blocks.par_iter_mut().try_for_each(|b| f(b))),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::Sequential
    }
}

/// Shared cancellation flag, checked at level and block boundaries.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::mc::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// assert!(token.check().is_ok());
/// handle.cancel();
/// assert!(token.is_cancelled());
/// assert!(token.check().is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Clears a cancellation request so the next run can proceed.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation has been requested.
    #[inline]
    pub fn check(&self) -> Result<(), SimulationError> {
        if self.is_cancelled() {
            Err(SimulationError::Cancelled)
        } else {
            Ok(())
        }
    }
}
