//! Random-number path processes.
//!
//! Both generators fill every factor of every step of a block. Later levels
//! transform the values in place (a diffusion turns normals into spot
//! levels, for instance).

use std::sync::Arc;

use crate::mc::{FeatureCollection, FinishStatus, Lane, PathBlock, PathProcess, SimulationError, SIMD_WIDTH};

use super::direction_numbers::DirectionNumberTable;
use super::prng::PricerRng;
use super::sobol::{SobolGenerator, SobolShift};

/// Fills blocks with Sobol points.
///
/// The table dimension for (factor, step) is
/// `seed + step * factors + factor`, and path `p` uses sequence index
/// `p + 1`, so the output for a path never depends on block boundaries.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::rng::{SobolPathGenerator, SobolShift};
///
/// let generator = SobolPathGenerator::with_embedded_table()
///     .unwrap()
///     .with_seed(10)
///     .with_shift(SobolShift::Rotation { seed: 3 })
///     .with_normal_transform(true);
/// # let _ = generator;
/// ```
#[derive(Debug)]
pub struct SobolPathGenerator {
    name: String,
    table: Arc<DirectionNumberTable>,
    seed: usize,
    shift: SobolShift,
    normal: bool,
    generator: Option<SobolGenerator>,
    factors: usize,
    steps: usize,
}

impl SobolPathGenerator {
    /// A generator over `table`, starting at dimension 0 with no shift and
    /// no normal transform.
    pub fn new(table: Arc<DirectionNumberTable>) -> Self {
        Self {
            name: "sobol".to_string(),
            table,
            seed: 0,
            shift: SobolShift::None,
            normal: false,
            generator: None,
            factors: 0,
            steps: 0,
        }
    }

    /// A generator over the embedded direction-number table.
    pub fn with_embedded_table() -> Result<Self, SimulationError> {
        Ok(Self::new(DirectionNumberTable::embedded()?))
    }

    /// Overrides the process name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// First table dimension used.
    pub fn with_seed(mut self, seed: usize) -> Self {
        self.seed = seed;
        self
    }

    /// Shift applied to every point.
    pub fn with_shift(mut self, shift: SobolShift) -> Self {
        self.shift = shift;
        self
    }

    /// Emits standard normal deviates instead of uniforms.
    pub fn with_normal_transform(mut self, enabled: bool) -> Self {
        self.normal = enabled;
        self
    }
}

impl PathProcess for SobolPathGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires_finish(&self) -> bool {
        true
    }

    fn finish(&mut self, features: &FeatureCollection) -> Result<FinishStatus, SimulationError> {
        self.factors = features.dimensions().num_factors();
        self.steps = features.time_steps().num_steps();
        let dimensions = self.factors * self.steps;
        if dimensions == 0 {
            return Ok(FinishStatus::Complete);
        }

        let generator = SobolGenerator::new(
            &self.table,
            self.seed,
            dimensions,
            features.engine().number_of_paths,
        )?
        .with_shift(self.shift)
        .with_normal_transform(self.normal);

        tracing::debug!(
            name = %self.name,
            first_dimension = self.seed,
            dimensions,
            bits = generator.bits(),
            "Sobol generator ready"
        );
        self.generator = Some(generator);
        Ok(FinishStatus::Complete)
    }

    fn process(&self, block: &mut PathBlock) -> Result<(), SimulationError> {
        let generator = self.generator.as_ref().ok_or_else(|| SimulationError::Process {
            name: self.name.clone(),
            message: "generator used before finishing".to_string(),
        })?;

        let first_index = block.global_path_index() as u64 + 1;
        let mut column = vec![0.0; block.number_of_paths()];
        for step in 0..self.steps {
            for factor in 0..self.factors {
                generator.fill_dimension(step * self.factors + factor, first_index, &mut column);
                for (group, chunk) in column.chunks_exact(SIMD_WIDTH).enumerate() {
                    let mut lane = Lane::default();
                    lane.0.copy_from_slice(chunk);
                    block.steps_for_factor_mut(group * SIMD_WIDTH, factor)[step] = lane;
                }
            }
        }
        tracing::trace!(block = block.global_path_index(), "Sobol block filled");
        Ok(())
    }
}

/// Fills blocks with pseudo-random draws, one independent stream per path.
///
/// The base seed defaults to the engine seed.
#[derive(Debug)]
pub struct PseudoRandomPathGenerator {
    name: String,
    seed: Option<u64>,
    normal: bool,
    base_seed: u64,
}

impl PseudoRandomPathGenerator {
    /// A standard normal generator seeded from the engine.
    pub fn new() -> Self {
        Self {
            name: "pseudo-random".to_string(),
            seed: None,
            normal: true,
            base_seed: 0,
        }
    }

    /// Overrides the process name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Uses `seed` instead of the engine seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Emits uniforms in `[0, 1)` instead of normals.
    pub fn uniform(mut self) -> Self {
        self.normal = false;
        self
    }
}

impl Default for PseudoRandomPathGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PathProcess for PseudoRandomPathGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires_finish(&self) -> bool {
        true
    }

    fn finish(&mut self, features: &FeatureCollection) -> Result<FinishStatus, SimulationError> {
        self.base_seed = self.seed.unwrap_or(features.engine().seed);
        Ok(FinishStatus::Complete)
    }

    fn process(&self, block: &mut PathBlock) -> Result<(), SimulationError> {
        let (factors, steps) = (block.factors(), block.steps());
        for path in 0..block.number_of_paths() {
            let mut rng = PricerRng::for_path(self.base_seed, block.global_path_index() + path);
            for factor in 0..factors {
                for step in 0..steps {
                    let value = if self.normal {
                        rng.gen_normal()
                    } else {
                        rng.gen_uniform()
                    };
                    // SAFETY: all three indices are bounded by the block's own shape.
                    unsafe { block.set_unchecked(path, factor, step, value) };
                }
            }
        }
        Ok(())
    }
}
