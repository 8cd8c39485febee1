//! Quasi-Monte Carlo sequence interface.
//!
//! Low-discrepancy sequences cover the unit hypercube more evenly than
//! pseudo-random draws, so integrals over simulated paths converge faster.
//! [`SobolSequence`](super::SobolSequence) is the implementation shipped
//! with this crate.

/// A deterministic point sequence in `[0, 1)^d`.
pub trait LowDiscrepancySequence {
    /// Dimensionality of each point.
    fn dimension(&self) -> usize;

    /// Advances the sequence and returns the next point.
    ///
    /// The returned slice has `dimension()` values.
    fn next_point(&mut self) -> &[f64];

    /// Resets the sequence to its initial state.
    fn reset(&mut self);

    /// Skips ahead by `n` points.
    ///
    /// Lets parallel workers start at disjoint offsets of one sequence.
    fn skip(&mut self, n: usize);
}
