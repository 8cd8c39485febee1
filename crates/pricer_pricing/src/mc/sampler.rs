//! Capture of simulated factor values for post-simulation analysis.
//!
//! A [`RegressionSampler`] copies one factor's value at a set of dates, for
//! every path, into a [`SampleStore`] that outlives the engine run. Blocks
//! write disjoint path ranges, so the store's lock is taken once per block
//! and only guards the shared allocation.

use std::sync::{Arc, Mutex, PoisonError};

use pricer_core::types::Date;

use super::block::PathBlock;
use super::error::SimulationError;
use super::features::FeatureCollection;
use super::process::{FinishStatus, PathProcess};

#[derive(Debug, Default)]
struct SampleData {
    factor_name: String,
    dates: Vec<Date>,
    /// `values[date][path]`.
    values: Vec<Vec<f64>>,
}

/// Shared handle to sampled values, indexed by date then path.
///
/// Cloning yields another handle to the same store.
#[derive(Clone, Debug, Default)]
pub struct SampleStore {
    inner: Arc<Mutex<SampleData>>,
}

impl SampleStore {
    /// Name of the sampled factor.
    pub fn factor_name(&self) -> String {
        self.read(|d| d.factor_name.clone())
    }

    /// Sampled dates in ascending order.
    pub fn dates(&self) -> Vec<Date> {
        self.read(|d| d.dates.clone())
    }

    /// Number of paths per date; 0 before the sampler has finished.
    pub fn number_of_paths(&self) -> usize {
        self.read(|d| d.values.first().map_or(0, Vec::len))
    }

    /// Per-path values at `date`, if it was sampled.
    pub fn values_at(&self, date: Date) -> Option<Vec<f64>> {
        self.read(|d| {
            d.dates
                .binary_search(&date)
                .ok()
                .map(|i| d.values[i].clone())
        })
    }

    fn read<T>(&self, f: impl FnOnce(&SampleData) -> T) -> T {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}

/// Records one factor at a set of dates for every path.
///
/// Registers its factor and dates during setup, so it can also be the
/// process that puts those dates on the time grid.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::mc::RegressionSampler;
/// use pricer_core::types::Date;
///
/// let d = Date::from_ymd(2026, 1, 1).unwrap();
/// let sampler = RegressionSampler::new("spx", [d]);
/// let store = sampler.store();
/// assert_eq!(store.number_of_paths(), 0);
/// ```
#[derive(Debug)]
pub struct RegressionSampler {
    name: String,
    factor_name: String,
    dates: Vec<Date>,
    store: SampleStore,
    factor: usize,
    steps: Vec<usize>,
}

impl RegressionSampler {
    /// A sampler of `factor_name` at `dates`.
    pub fn new(factor_name: impl Into<String>, dates: impl IntoIterator<Item = Date>) -> Self {
        let factor_name = factor_name.into();
        let mut dates: Vec<Date> = dates.into_iter().collect();
        dates.sort_unstable();
        dates.dedup();
        Self {
            name: format!("sampler:{factor_name}"),
            factor_name,
            dates,
            store: SampleStore::default(),
            factor: 0,
            steps: Vec::new(),
        }
    }

    /// Overrides the process name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Handle to the values this sampler fills.
    pub fn store(&self) -> SampleStore {
        self.store.clone()
    }
}

impl PathProcess for RegressionSampler {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup_features(&mut self, features: &mut FeatureCollection) -> Result<(), SimulationError> {
        features.add_dimension(&self.factor_name)?;
        features.add_dates(self.dates.iter().copied())
    }

    fn requires_finish(&self) -> bool {
        true
    }

    fn finish(&mut self, features: &FeatureCollection) -> Result<FinishStatus, SimulationError> {
        let missing = |what: String| SimulationError::Process {
            name: self.name.clone(),
            message: what,
        };
        self.factor = features
            .dimensions()
            .index_of(&self.factor_name)
            .ok_or_else(|| missing(format!("factor '{}' not registered", self.factor_name)))?;
        self.steps = self
            .dates
            .iter()
            .map(|&d| {
                features
                    .time_steps()
                    .index_of(d)
                    .ok_or_else(|| missing(format!("date {d} not on the time grid")))
            })
            .collect::<Result<_, _>>()?;

        let paths = features.engine().number_of_paths;
        let mut data = self
            .store
            .inner
            .lock()
            .map_err(|_| missing("sample store poisoned".to_string()))?;
        *data = SampleData {
            factor_name: self.factor_name.clone(),
            dates: self.dates.clone(),
            values: vec![vec![0.0; paths]; self.dates.len()],
        };
        Ok(FinishStatus::Complete)
    }

    fn process(&self, block: &mut PathBlock) -> Result<(), SimulationError> {
        let start = block.global_path_index();
        let paths = block.number_of_paths();
        let mut data = self.store.inner.lock().map_err(|_| SimulationError::Process {
            name: self.name.clone(),
            message: "sample store poisoned".to_string(),
        })?;
        for (column, &step) in data.values.iter_mut().zip(&self.steps) {
            for (path, slot) in column[start..start + paths].iter_mut().enumerate() {
                *slot = block.get(path, self.factor, step);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mc::EngineFeature;

    #[test]
    fn test_sampler_captures_block_values() {
        let d0 = Date::from_ymd(2025, 1, 1).unwrap();
        let d1 = Date::from_ymd(2025, 6, 1).unwrap();
        let mut sampler = RegressionSampler::new("x", [d1, d0, d1]);
        let store = sampler.store();

        let mut features = FeatureCollection::new(EngineFeature {
            number_of_paths: 8,
            parallelism: 1,
            seed: 0,
        });
        features.add_dimension("y").unwrap();
        sampler.setup_features(&mut features).unwrap();
        features.finish_setup().unwrap();
        sampler.finish(&features).unwrap();
        assert_eq!(store.dates(), vec![d0, d1]);
        assert_eq!(store.factor_name(), "x");

        let mut block = PathBlock::new(4, 4, 2, 2).unwrap();
        for path in 0..4 {
            block.set(path, 1, 0, path as f64);
            block.set(path, 1, 1, 10.0 + path as f64);
        }
        sampler.process(&mut block).unwrap();

        assert_eq!(store.number_of_paths(), 8);
        assert_eq!(
            store.values_at(d1).unwrap(),
            vec![0.0, 0.0, 0.0, 0.0, 10.0, 11.0, 12.0, 13.0]
        );
        assert_eq!(store.values_at(d0).unwrap()[5], 1.0);
        assert!(store.values_at(Date::from_ymd(2030, 1, 1).unwrap()).is_none());
    }
}
