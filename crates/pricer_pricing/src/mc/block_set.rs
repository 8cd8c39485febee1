//! Partitioning of the path ensemble into blocks.
//!
//! A [`BlockSet`] splits `number_of_paths` paths into `2 * parallelism`
//! [`PathBlock`]s. Lane groups (of [`SIMD_WIDTH`] paths) are shared out as
//! evenly as possible: every block gets `groups / blocks` lane groups and the
//! first `groups % blocks` blocks get one extra. Blocks are contiguous and
//! ordered, so their ranges tile `[0, number_of_paths)` exactly.

use super::block::{PathBlock, SIMD_WIDTH};
use super::error::SimulationError;

/// Ordered, disjoint partition of the ensemble into [`PathBlock`]s.
///
/// Created fresh for each engine run and consumed by [`BlockSet::dispose`]
/// when the run ends.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::mc::BlockSet;
///
/// let set = BlockSet::new(64, 1, 10, 2).unwrap();
/// assert_eq!(set.len(), 4);
/// assert_eq!(set.blocks().iter().map(|b| b.number_of_paths()).sum::<usize>(), 64);
/// set.dispose();
/// ```
#[derive(Debug)]
pub struct BlockSet {
    blocks: Vec<PathBlock>,
    number_of_paths: usize,
    factors: usize,
    steps: usize,
    disposed: bool,
}

impl BlockSet {
    /// Builds `2 * parallelism` blocks over `number_of_paths` paths.
    ///
    /// A `parallelism` of zero is treated as one.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::InvalidAlignment`] if `number_of_paths` is not a
    ///   multiple of [`SIMD_WIDTH`]
    /// - [`SimulationError::InsufficientParallelism`] if there are fewer lane
    ///   groups than blocks
    pub fn new(
        number_of_paths: usize,
        factors: usize,
        steps: usize,
        parallelism: usize,
    ) -> Result<Self, SimulationError> {
        let number_of_blocks = 2 * parallelism.max(1);
        let sizes = Self::block_sizes(number_of_paths, number_of_blocks)?;

        let mut blocks = Vec::with_capacity(sizes.len());
        let mut start = 0;
        for size in sizes {
            blocks.push(PathBlock::new(start, size, factors, steps)?);
            start += size;
        }

        tracing::debug!(
            number_of_paths,
            factors,
            steps,
            blocks = blocks.len(),
            "Partitioned paths into blocks"
        );

        Ok(Self {
            blocks,
            number_of_paths,
            factors,
            steps,
            disposed: false,
        })
    }

    /// Path counts of each block when `number_of_paths` is split into
    /// `number_of_blocks` blocks.
    pub fn block_sizes(
        number_of_paths: usize,
        number_of_blocks: usize,
    ) -> Result<Vec<usize>, SimulationError> {
        if number_of_paths % SIMD_WIDTH != 0 {
            return Err(SimulationError::InvalidAlignment {
                paths: number_of_paths,
                simd_width: SIMD_WIDTH,
            });
        }
        let groups = number_of_paths / SIMD_WIDTH;
        let base = if number_of_blocks == 0 { 0 } else { groups / number_of_blocks };
        if base == 0 {
            return Err(SimulationError::InsufficientParallelism {
                paths: number_of_paths,
                blocks: number_of_blocks,
                simd_width: SIMD_WIDTH,
            });
        }
        let remainder = groups % number_of_blocks;

        Ok((0..number_of_blocks)
            .map(|i| (base + usize::from(i < remainder)) * SIMD_WIDTH)
            .collect())
    }

    /// Number of blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the set holds no blocks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total number of paths across all blocks.
    #[inline]
    pub fn number_of_paths(&self) -> usize {
        self.number_of_paths
    }

    /// Factors per path.
    #[inline]
    pub fn factors(&self) -> usize {
        self.factors
    }

    /// Steps per factor.
    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// The blocks in path order.
    #[inline]
    pub fn blocks(&self) -> &[PathBlock] {
        &self.blocks
    }

    /// Mutable access to the blocks in path order.
    #[inline]
    pub fn blocks_mut(&mut self) -> &mut [PathBlock] {
        &mut self.blocks
    }

    /// Iterates over the blocks in path order.
    pub fn iter(&self) -> std::slice::Iter<'_, PathBlock> {
        self.blocks.iter()
    }

    /// Mutably iterates over the blocks in path order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, PathBlock> {
        self.blocks.iter_mut()
    }

    /// Releases every block's buffer and consumes the set.
    ///
    /// Returns the number of buffers that were still allocated.
    pub fn dispose(mut self) -> usize {
        let released = self
            .blocks
            .iter_mut()
            .map(|b| b.release())
            .filter(|released| *released)
            .count();
        tracing::debug!(released, blocks = self.blocks.len(), "Disposed block set");
        self.disposed = true;
        released
    }
}

impl Drop for BlockSet {
    fn drop(&mut self) {
        if cfg!(debug_assertions) && !self.disposed {
            let live = self.blocks.iter().filter(|b| b.is_allocated()).count();
            if live > 0 {
                tracing::warn!(
                    live,
                    blocks = self.blocks.len(),
                    "Block set dropped without dispose; buffers were still allocated"
                );
            }
        }
    }
}

impl<'a> IntoIterator for &'a mut BlockSet {
    type Item = &'a mut PathBlock;
    type IntoIter = std::slice::IterMut<'a, PathBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_blocks_tile_the_ensemble() {
        let set = BlockSet::new(40, 2, 3, 2).unwrap();
        assert_eq!(set.len(), 4);
        // 10 lane groups over 4 blocks: 3, 3, 2, 2
        let sizes: Vec<usize> = set.iter().map(|b| b.number_of_paths()).collect();
        assert_eq!(sizes, vec![12, 12, 8, 8]);
        let starts: Vec<usize> = set.iter().map(|b| b.global_path_index()).collect();
        assert_eq!(starts, vec![0, 12, 24, 32]);
        set.dispose();
    }

    #[test]
    fn test_rejects_misaligned_path_count() {
        assert!(matches!(
            BlockSet::new(1_001, 1, 1, 1),
            Err(SimulationError::InvalidAlignment { paths: 1_001, .. })
        ));
    }

    #[test]
    fn test_rejects_too_few_lane_groups() {
        // 3 lane groups cannot fill 4 blocks
        assert!(matches!(
            BlockSet::new(12, 1, 1, 2),
            Err(SimulationError::InsufficientParallelism { blocks: 4, .. })
        ));
    }

    #[test]
    fn test_zero_parallelism_treated_as_one() {
        let set = BlockSet::new(8, 1, 1, 0).unwrap();
        assert_eq!(set.len(), 2);
        set.dispose();
    }

    #[test]
    fn test_dispose_releases_buffers() {
        let mut set = BlockSet::new(16, 1, 2, 1).unwrap();
        for block in &mut set {
            block.set(0, 0, 0, 1.0);
        }
        assert!(set.iter().all(|b| b.is_allocated()));
        assert_eq!(set.dispose(), 2);
    }

    proptest! {
        #[test]
        fn prop_block_sizes_partition(groups in 1usize..2_000, blocks in 1usize..64) {
            let paths = groups * SIMD_WIDTH;
            match BlockSet::block_sizes(paths, blocks) {
                Ok(sizes) => {
                    prop_assert_eq!(sizes.len(), blocks);
                    prop_assert_eq!(sizes.iter().sum::<usize>(), paths);
                    let min = *sizes.iter().min().unwrap();
                    let max = *sizes.iter().max().unwrap();
                    prop_assert!(min >= SIMD_WIDTH);
                    prop_assert!(max - min <= SIMD_WIDTH);
                    prop_assert!(sizes.iter().all(|s| s % SIMD_WIDTH == 0));
                }
                Err(_) => prop_assert!(groups < blocks),
            }
        }
    }
}
