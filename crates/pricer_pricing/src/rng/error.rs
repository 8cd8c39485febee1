//! Errors raised while loading direction numbers or building Sobol generators.

use thiserror::Error;

/// Sobol generator failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SobolError {
    /// A dimension beyond the direction-number table was requested.
    #[error("Sobol dimension {requested} requested but the direction-number table covers {available}")]
    TableRange {
        /// Highest dimension count needed (first dimension + dimensions).
        requested: usize,
        /// Dimensions the table provides (including the implicit first one).
        available: usize,
    },

    /// A line of the direction-number table could not be parsed.
    #[error("Direction-number table line {line}: {message}")]
    TableParse {
        /// One-based line number.
        line: usize,
        /// What was wrong with it.
        message: String,
    },

    /// A generator with zero dimensions was requested.
    #[error("Sobol generator needs at least one dimension")]
    EmptyDimensions,
}
