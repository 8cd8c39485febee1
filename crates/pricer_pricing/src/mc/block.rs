//! Lane-interleaved storage for a contiguous range of simulated paths.
//!
//! This module provides [`PathBlock`], the unit of work handed to every
//! [`PathProcess`](super::PathProcess). A block owns the values of
//! `number_of_paths` paths for every factor at every time step.
//!
//! # Memory Layout
//!
//! Paths are grouped into lane groups of [`SIMD_WIDTH`] consecutive paths.
//! Within a lane group, values are ordered factor-major then step-major, and
//! the innermost dimension is the lane (path within group):
//!
//! ```text
//! index(path, factor, step) =
//!     ((path / W) * factors * steps + factor * steps + step) * W + path % W
//! ```
//!
//! So one [`Lane`] holds the same (factor, step) value for `W` neighbouring
//! paths, and a factor's whole time series for a lane group is a contiguous
//! run of `steps` lanes.
//!
//! # Allocation
//!
//! The backing buffer is allocated lazily on first access and released
//! explicitly through [`PathBlock::release`], which the owning
//! [`BlockSet`](super::BlockSet) calls on disposal.

use std::fmt;
use std::sync::OnceLock;

use super::error::SimulationError;

/// Number of paths processed together in one vector register.
pub const SIMD_WIDTH: usize = 4;

/// One vector's worth of values: the same (factor, step) for
/// [`SIMD_WIDTH`] consecutive paths.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C, align(32))]
pub struct Lane(pub [f64; SIMD_WIDTH]);

const _: () = assert!(std::mem::size_of::<Lane>() == SIMD_WIDTH * std::mem::size_of::<f64>());

impl Lane {
    /// A lane with every element set to `value`.
    #[inline]
    pub const fn splat(value: f64) -> Self {
        Self([value; SIMD_WIDTH])
    }

    /// Applies `f` element-wise.
    #[inline]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        let mut out = self.0;
        for v in &mut out {
            *v = f(*v);
        }
        Self(out)
    }
}

/// Storage for the paths in `[global_path_index, global_path_index + number_of_paths)`.
///
/// `number_of_paths` is always a multiple of [`SIMD_WIDTH`]. A block is
/// mutated by exactly one worker at a time; the engine hands out `&mut`
/// references only.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::mc::{PathBlock, SIMD_WIDTH};
///
/// let mut block = PathBlock::new(0, 8, 2, 3).unwrap();
/// block.set(5, 1, 2, 42.0);
///
/// assert_eq!(block.get(5, 1, 2), 42.0);
/// // path 5 is lane 1 of the second lane group
/// assert_eq!(block.steps_for_factor(4, 1)[2].0[1], 42.0);
/// assert_eq!(block.number_of_paths() % SIMD_WIDTH, 0);
/// ```
pub struct PathBlock {
    global_path_index: usize,
    number_of_paths: usize,
    factors: usize,
    steps: usize,
    buffer: OnceLock<Vec<Lane>>,
}

impl PathBlock {
    /// Creates a block for `number_of_paths` paths starting at
    /// `global_path_index`. No memory is allocated until first access.
    ///
    /// # Errors
    ///
    /// [`SimulationError::InvalidAlignment`] if `number_of_paths` is not a
    /// multiple of [`SIMD_WIDTH`].
    pub fn new(
        global_path_index: usize,
        number_of_paths: usize,
        factors: usize,
        steps: usize,
    ) -> Result<Self, SimulationError> {
        if number_of_paths % SIMD_WIDTH != 0 {
            return Err(SimulationError::InvalidAlignment {
                paths: number_of_paths,
                simd_width: SIMD_WIDTH,
            });
        }
        Ok(Self {
            global_path_index,
            number_of_paths,
            factors,
            steps,
            buffer: OnceLock::new(),
        })
    }

    /// Index of the first path of this block within the whole ensemble.
    #[inline]
    pub fn global_path_index(&self) -> usize {
        self.global_path_index
    }

    /// Number of paths stored in this block.
    #[inline]
    pub fn number_of_paths(&self) -> usize {
        self.number_of_paths
    }

    /// Number of factors per path.
    #[inline]
    pub fn factors(&self) -> usize {
        self.factors
    }

    /// Number of time steps per factor.
    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Number of lane groups (`number_of_paths / SIMD_WIDTH`).
    #[inline]
    pub fn lane_groups(&self) -> usize {
        self.number_of_paths / SIMD_WIDTH
    }

    /// Total number of values held: `paths * factors * steps`.
    #[inline]
    pub fn total_block_size(&self) -> usize {
        self.number_of_paths * self.factors * self.steps
    }

    /// Whether the backing buffer currently exists.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.buffer.get().is_some()
    }

    /// Frees the backing buffer. Returns `true` if memory was released.
    ///
    /// A later access allocates a fresh zeroed buffer.
    pub fn release(&mut self) -> bool {
        self.buffer.take().is_some()
    }

    #[inline]
    fn lane_count(&self) -> usize {
        self.lane_groups() * self.factors * self.steps
    }

    /// All lanes of the block in storage order.
    pub fn lanes(&self) -> &[Lane] {
        let len = self.lane_count();
        self.buffer.get_or_init(|| vec![Lane::default(); len])
    }

    /// Mutable view of all lanes in storage order.
    pub fn lanes_mut(&mut self) -> &mut [Lane] {
        let len = self.lane_count();
        self.buffer.get_or_init(|| vec![Lane::default(); len]);
        self.buffer
            .get_mut()
            .map(Vec::as_mut_slice)
            .unwrap_or_default()
    }

    /// The block as a flat `f64` slice in storage order.
    pub fn as_flat(&self) -> &[f64] {
        let lanes = self.lanes();
        // SAFETY: `Lane` is `repr(C)` over `[f64; SIMD_WIDTH]` with no padding
        // (checked at compile time above), so `lanes.len()` lanes are exactly
        // `lanes.len() * SIMD_WIDTH` contiguous, initialised `f64`s.
        unsafe { std::slice::from_raw_parts(lanes.as_ptr().cast::<f64>(), lanes.len() * SIMD_WIDTH) }
    }

    /// Mutable flat `f64` view in storage order.
    pub fn as_flat_mut(&mut self) -> &mut [f64] {
        let lanes = self.lanes_mut();
        let len = lanes.len() * SIMD_WIDTH;
        // SAFETY: see `as_flat`; the exclusive borrow of `self` covers the
        // whole buffer.
        unsafe { std::slice::from_raw_parts_mut(lanes.as_mut_ptr().cast::<f64>(), len) }
    }

    /// Flat offset of the value for (`path`, `factor`, `step`).
    ///
    /// `path` is local to the block.
    #[inline]
    pub fn index(&self, path: usize, factor: usize, step: usize) -> usize {
        (self.group_start(path) + factor * self.steps + step) * SIMD_WIDTH + path % SIMD_WIDTH
    }

    #[inline]
    fn group_start(&self, path: usize) -> usize {
        (path / SIMD_WIDTH) * self.factors * self.steps
    }

    /// Reads one value. Panics if any index is out of range.
    #[inline]
    pub fn get(&self, path: usize, factor: usize, step: usize) -> f64 {
        self.check(path, factor, step);
        self.as_flat()[self.index(path, factor, step)]
    }

    /// Writes one value. Panics if any index is out of range.
    #[inline]
    pub fn set(&mut self, path: usize, factor: usize, step: usize, value: f64) {
        self.check(path, factor, step);
        let idx = self.index(path, factor, step);
        self.as_flat_mut()[idx] = value;
    }

    /// Reads one value without bounds checking.
    ///
    /// # Safety
    ///
    /// `path < number_of_paths`, `factor < factors` and `step < steps` must hold.
    #[inline]
    pub unsafe fn get_unchecked(&self, path: usize, factor: usize, step: usize) -> f64 {
        let idx = self.index(path, factor, step);
        // SAFETY: upheld by the caller.
        unsafe { *self.as_flat().get_unchecked(idx) }
    }

    /// Writes one value without bounds checking.
    ///
    /// # Safety
    ///
    /// `path < number_of_paths`, `factor < factors` and `step < steps` must hold.
    #[inline]
    pub unsafe fn set_unchecked(&mut self, path: usize, factor: usize, step: usize, value: f64) {
        let idx = self.index(path, factor, step);
        // SAFETY: upheld by the caller.
        unsafe { *self.as_flat_mut().get_unchecked_mut(idx) = value }
    }

    /// The `steps` lanes holding one factor's time series for the lane group
    /// starting at `path_group`.
    ///
    /// `path_group` must be a multiple of [`SIMD_WIDTH`].
    pub fn steps_for_factor(&self, path_group: usize, factor: usize) -> &[Lane] {
        let start = self.factor_start(path_group, factor);
        &self.lanes()[start..start + self.steps]
    }

    /// Mutable variant of [`steps_for_factor`](Self::steps_for_factor).
    pub fn steps_for_factor_mut(&mut self, path_group: usize, factor: usize) -> &mut [Lane] {
        let start = self.factor_start(path_group, factor);
        let steps = self.steps;
        &mut self.lanes_mut()[start..start + steps]
    }

    /// Every factor and step (`factors * steps` lanes) of the lane group
    /// starting at `path_group`.
    pub fn entire_path(&self, path_group: usize) -> &[Lane] {
        debug_assert_eq!(path_group % SIMD_WIDTH, 0, "path group must be lane aligned");
        let start = self.group_start(path_group);
        &self.lanes()[start..start + self.factors * self.steps]
    }

    /// Mutable variant of [`entire_path`](Self::entire_path).
    pub fn entire_path_mut(&mut self, path_group: usize) -> &mut [Lane] {
        debug_assert_eq!(path_group % SIMD_WIDTH, 0, "path group must be lane aligned");
        let start = self.group_start(path_group);
        let len = self.factors * self.steps;
        &mut self.lanes_mut()[start..start + len]
    }

    /// Iterates over every value of one path, factor-major then step.
    pub fn path_values(&self, path: usize) -> impl Iterator<Item = f64> + '_ {
        assert!(path < self.number_of_paths, "path {path} out of range");
        let flat = self.as_flat();
        let lane = path % SIMD_WIDTH;
        let start = self.group_start(path);
        (0..self.factors * self.steps).map(move |i| flat[(start + i) * SIMD_WIDTH + lane])
    }

    #[inline]
    fn factor_start(&self, path_group: usize, factor: usize) -> usize {
        debug_assert_eq!(path_group % SIMD_WIDTH, 0, "path group must be lane aligned");
        assert!(factor < self.factors, "factor {factor} out of range");
        self.group_start(path_group) + factor * self.steps
    }

    #[inline]
    fn check(&self, path: usize, factor: usize, step: usize) {
        assert!(
            path < self.number_of_paths && factor < self.factors && step < self.steps,
            "({path}, {factor}, {step}) outside block of {}x{}x{}",
            self.number_of_paths,
            self.factors,
            self.steps
        );
    }
}

impl fmt::Debug for PathBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathBlock")
            .field("global_path_index", &self.global_path_index)
            .field("number_of_paths", &self.number_of_paths)
            .field("factors", &self.factors)
            .field("steps", &self.steps)
            .field("allocated", &self.is_allocated())
            .finish()
    }
}
