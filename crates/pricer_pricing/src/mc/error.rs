//! Error types for the path engine.
//!
//! Every condition here is fatal for the run that raised it. The simulation
//! is deterministic given its inputs, so nothing is retried.

use pricer_core::types::Date;
use thiserror::Error;

use crate::rng::SobolError;

/// Configuration error for the path engine.
///
/// Raised while building an [`EngineConfig`](super::EngineConfig), either
/// through the builder or from a TOML document.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Path count outside valid range [1, 10_000_000].
    #[error("Invalid path count {0}: must be in range [1, 10_000_000]")]
    InvalidPathCount(usize),

    /// Worker thread count above the supported maximum.
    #[error("Invalid thread count {0}: must be at most 1024 (0 selects hardware threads)")]
    InvalidThreadCount(usize),

    /// Invalid parameter value with name and description.
    #[error("Invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        value: String,
    },

    /// Configuration file could not be read.
    #[error("Configuration file error: {0}")]
    FileError(String),

    /// Configuration document could not be parsed.
    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

/// Fatal simulation errors raised by the engine and its collaborators.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Path count is not a multiple of the SIMD width.
    #[error("Invalid data alignment: {paths} paths is not a multiple of the SIMD width {simd_width}")]
    InvalidAlignment {
        /// Requested number of paths.
        paths: usize,
        /// Hardware lane width the blocks are aligned to.
        simd_width: usize,
    },

    /// Too few paths to give every block at least one lane group.
    #[error(
        "Invalid data alignment: {paths} paths cannot fill {blocks} blocks of at least {simd_width} paths"
    )]
    InsufficientParallelism {
        /// Requested number of paths.
        paths: usize,
        /// Number of blocks implied by the executor's parallelism.
        blocks: usize,
        /// Hardware lane width the blocks are aligned to.
        simd_width: usize,
    },

    /// A process asked for a feature kind that was never registered.
    #[error("Missing feature: {kind}")]
    MissingFeature {
        /// Type name of the requested feature.
        kind: &'static str,
    },

    /// The finishing phase made no progress in a full pass.
    #[error("Unresolvable dependency during finishing; still pending: {}", pending.join(", "))]
    UnresolvableDependency {
        /// Names of the processes that never completed.
        pending: Vec<String>,
    },

    /// Attempted to mutate the feature collection after setup closed it.
    #[error("Feature {kind} cannot be modified after setup has finished")]
    FeaturesFrozen {
        /// Type name of the feature.
        kind: &'static str,
    },

    /// A simulation date lies before the origin of the time axis.
    #[error("Simulation date {date} is before the time origin {origin}")]
    DateBeforeOrigin {
        /// Earliest offending date.
        date: Date,
        /// Origin of the time axis.
        origin: Date,
    },

    /// Quasi-random generator failure (table range or parse error).
    #[error(transparent)]
    Sobol(#[from] SobolError),

    /// Invalid engine configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The worker pool could not be constructed.
    #[error("Thread pool construction failed: {0}")]
    ThreadPool(String),

    /// A path process reported a failure.
    #[error("Process '{name}' failed: {message}")]
    Process {
        /// Process name.
        name: String,
        /// Description of the failure.
        message: String,
    },

    /// The run was cancelled at a level or block boundary.
    #[error("Simulation cancelled")]
    Cancelled,
}
