//! Sobol low-discrepancy points.
//!
//! [`SobolGenerator`] gives random access to point `n` of any of its
//! dimensions by folding direction vectors over the set bits of the Gray
//! code `n ^ (n >> 1)`, and fills runs of consecutive indices incrementally
//! using `x(n) = x(n - 1) ^ v[trailing_zeros(n)]`. Index 0 (the origin) is
//! never emitted by the path generator, which maps path `p` to index `p + 1`.
//!
//! [`SobolSequence`] is a sequential view implementing
//! [`LowDiscrepancySequence`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::direction_numbers::{DirectionNumberTable, MAX_BITS};
use super::error::SobolError;
use super::normal::inverse_normal_cdf;
use super::qmc::LowDiscrepancySequence;

const TWO_POW_MINUS_32: f64 = 1.0 / 4_294_967_296.0;

/// Smallest distance from 0 and 1 a shifted point may take.
const BOUNDARY_EPSILON: f64 = 0.5 * TWO_POW_MINUS_32;

/// Randomisation applied to raw Sobol points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SobolShift {
    /// Raw points.
    #[default]
    None,
    /// Cranley–Patterson rotation: `u + s_d` wrapped at 1.
    Rotation {
        /// Seed for the per-dimension offsets.
        seed: u64,
    },
    /// Digital shift: the 32-bit accumulator is XORed with a random word per
    /// dimension, flipping the same bits of every point.
    DigitalFlip {
        /// Seed for the per-dimension flip masks.
        seed: u64,
    },
}

#[derive(Clone, Debug)]
enum Shifts {
    None,
    Rotation(Vec<f64>),
    DigitalFlip(Vec<u32>),
}

/// Number of bits needed to index `number_of_points` points from 1.
#[inline]
pub fn bits_for_points(number_of_points: usize) -> usize {
    let n = number_of_points as u64 + 1;
    ((u64::BITS - n.leading_zeros()) as usize).min(MAX_BITS)
}

/// Random-access Sobol generator over a contiguous range of table
/// dimensions.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::rng::{DirectionNumberTable, SobolGenerator};
///
/// let table = DirectionNumberTable::embedded().unwrap();
/// let sobol = SobolGenerator::new(&table, 0, 2, 1_024).unwrap();
///
/// assert_eq!(sobol.point(1, 0), 0.5);
/// assert_eq!(sobol.point(1, 1), 0.5);
/// ```
#[derive(Clone, Debug)]
pub struct SobolGenerator {
    first_dimension: usize,
    bits: usize,
    directions: Vec<Vec<u32>>,
    shifts: Shifts,
    normal: bool,
}

impl SobolGenerator {
    /// Builds `dimensions` dimensions starting at table dimension
    /// `first_dimension`, with enough bits to index `number_of_points`
    /// points from 1.
    ///
    /// # Errors
    ///
    /// - [`SobolError::EmptyDimensions`] if `dimensions == 0`
    /// - [`SobolError::TableRange`] if the table is too short
    pub fn new(
        table: &DirectionNumberTable,
        first_dimension: usize,
        dimensions: usize,
        number_of_points: usize,
    ) -> Result<Self, SobolError> {
        Self::with_bits(table, first_dimension, dimensions, bits_for_points(number_of_points))
    }

    fn with_bits(
        table: &DirectionNumberTable,
        first_dimension: usize,
        dimensions: usize,
        bits: usize,
    ) -> Result<Self, SobolError> {
        if dimensions == 0 {
            return Err(SobolError::EmptyDimensions);
        }
        let requested = first_dimension + dimensions;
        if requested > table.available_dimensions() {
            return Err(SobolError::TableRange {
                requested,
                available: table.available_dimensions(),
            });
        }
        let directions = (first_dimension..requested)
            .map(|d| table.direction_vectors(d, bits))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            first_dimension,
            bits,
            directions,
            shifts: Shifts::None,
            normal: false,
        })
    }

    /// Applies a shift drawn from a seeded generator.
    pub fn with_shift(mut self, shift: SobolShift) -> Self {
        let dims = self.directions.len();
        self.shifts = match shift {
            SobolShift::None => Shifts::None,
            SobolShift::Rotation { seed } => {
                let mut rng = StdRng::seed_from_u64(seed);
                Shifts::Rotation((0..dims).map(|_| rng.gen::<f64>()).collect())
            }
            SobolShift::DigitalFlip { seed } => {
                let mut rng = StdRng::seed_from_u64(seed);
                Shifts::DigitalFlip((0..dims).map(|_| rng.gen::<u32>()).collect())
            }
        };
        self
    }

    /// Maps points through the inverse normal CDF when `enabled`.
    pub fn with_normal_transform(mut self, enabled: bool) -> Self {
        self.normal = enabled;
        self
    }

    /// Number of dimensions.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.directions.len()
    }

    /// Table dimension of local dimension 0.
    #[inline]
    pub fn first_dimension(&self) -> usize {
        self.first_dimension
    }

    /// Direction bits per dimension; indices must stay below `2^bits`.
    #[inline]
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Raw 32-bit accumulator for point `index` of local `dimension`.
    ///
    /// # Panics
    ///
    /// If `index >= 2^bits` or `dimension` is out of range.
    pub fn raw(&self, index: u64, dimension: usize) -> u32 {
        let v = &self.directions[dimension];
        let mut gray = index ^ (index >> 1);
        let mut x = 0;
        let mut bit = 0;
        while gray != 0 {
            if gray & 1 == 1 {
                x ^= v[bit];
            }
            gray >>= 1;
            bit += 1;
        }
        x
    }

    /// Point `index` of local `dimension`, shifted and transformed.
    #[inline]
    pub fn point(&self, index: u64, dimension: usize) -> f64 {
        self.finalise(dimension, self.raw(index, dimension))
    }

    /// Fills `out` with points `first_index, first_index + 1, …` of one
    /// dimension.
    pub fn fill_dimension(&self, dimension: usize, first_index: u64, out: &mut [f64]) {
        let Some((head, rest)) = out.split_first_mut() else {
            return;
        };
        let v = &self.directions[dimension];
        let mut x = self.raw(first_index, dimension);
        *head = self.finalise(dimension, x);
        for (i, slot) in rest.iter_mut().enumerate() {
            let n = first_index + i as u64 + 1;
            x ^= v[n.trailing_zeros() as usize];
            *slot = self.finalise(dimension, x);
        }
    }

    #[inline]
    fn finalise(&self, dimension: usize, x: u32) -> f64 {
        let u = match &self.shifts {
            Shifts::None => f64::from(x) * TWO_POW_MINUS_32,
            Shifts::Rotation(offsets) => {
                let mut u = f64::from(x) * TWO_POW_MINUS_32 + offsets[dimension];
                if u >= 1.0 {
                    u -= 1.0;
                }
                u.clamp(BOUNDARY_EPSILON, 1.0 - BOUNDARY_EPSILON)
            }
            Shifts::DigitalFlip(masks) => (f64::from(x ^ masks[dimension]) * TWO_POW_MINUS_32)
                .clamp(BOUNDARY_EPSILON, 1.0 - BOUNDARY_EPSILON),
        };
        if self.normal {
            inverse_normal_cdf(u)
        } else {
            u
        }
    }
}

/// Sequential Sobol points starting from index 1.
///
/// Supports up to `2^32 - 1` points, after which it starts again.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::rng::{DirectionNumberTable, LowDiscrepancySequence, SobolSequence};
///
/// let table = DirectionNumberTable::embedded().unwrap();
/// let mut sobol = SobolSequence::new(&table, 3).unwrap();
///
/// assert_eq!(sobol.next_point(), &[0.5, 0.5, 0.5]);
/// sobol.reset();
/// assert_eq!(sobol.next_point()[0], 0.5);
/// ```
#[derive(Clone, Debug)]
pub struct SobolSequence {
    generator: SobolGenerator,
    index: u64,
    state: Vec<u32>,
    point: Vec<f64>,
}

impl SobolSequence {
    /// A sequence over the first `dimensions` table dimensions.
    pub fn new(table: &DirectionNumberTable, dimensions: usize) -> Result<Self, SobolError> {
        Ok(Self::from_generator(SobolGenerator::with_bits(
            table, 0, dimensions, MAX_BITS,
        )?))
    }

    /// A sequence driven by a configured generator.
    pub fn from_generator(generator: SobolGenerator) -> Self {
        let dims = generator.dimensions();
        Self {
            generator,
            index: 0,
            state: vec![0; dims],
            point: vec![0.0; dims],
        }
    }

    /// Index of the most recently returned point (0 before the first).
    #[inline]
    pub fn index(&self) -> u64 {
        self.index
    }

    fn limit(&self) -> u64 {
        1_u64 << self.generator.bits
    }
}

impl LowDiscrepancySequence for SobolSequence {
    fn dimension(&self) -> usize {
        self.generator.dimensions()
    }

    fn next_point(&mut self) -> &[f64] {
        if self.index + 1 >= self.limit() {
            self.reset();
        }
        self.index += 1;
        let c = self.index.trailing_zeros() as usize;
        for d in 0..self.state.len() {
            self.state[d] ^= self.generator.directions[d][c];
            self.point[d] = self.generator.finalise(d, self.state[d]);
        }
        &self.point
    }

    fn reset(&mut self) {
        self.index = 0;
        self.state.fill(0);
    }

    fn skip(&mut self, n: usize) {
        self.index = (self.index + n as u64) % self.limit();
        for d in 0..self.state.len() {
            self.state[d] = self.generator.raw(self.index, d);
        }
    }
}
