//! Shared engine configuration contributed by processes during setup.
//!
//! The [`FeatureCollection`] is the only channel through which processes
//! coordinate before a run:
//!
//! 1. **Setup**: every process registers what it needs. Factors go into
//!    [`DimensionsFeature`], observation dates into [`TimeStepsFeature`],
//!    anything else into a typed feature slot or a named category.
//! 2. **Close**: the engine calls [`FeatureCollection::finish_setup`], which
//!    sorts the time grid and freezes the collection.
//! 3. **Finish**: processes read the frozen collection and mark themselves
//!    finished by name so that dependants can proceed.
//!
//! Built-in features always exist. Extra feature kinds are keyed by type;
//! there is exactly one instance per kind.

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeSet, HashMap, HashSet};

use pricer_core::types::{Date, DayCountConvention};

use super::error::SimulationError;

/// Named simulation factors. A factor's index is its position of first
/// registration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DimensionsFeature {
    names: Vec<String>,
}

impl DimensionsFeature {
    fn add(&mut self, name: &str) -> usize {
        match self.index_of(name) {
            Some(i) => i,
            None => {
                self.names.push(name.to_string());
                self.names.len() - 1
            }
        }
    }

    /// Index of a registered factor.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Registered factor names in index order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of factors.
    #[inline]
    pub fn num_factors(&self) -> usize {
        self.names.len()
    }
}

/// The simulation's time grid.
///
/// Dates are collected as a set during setup. On close they are sorted and
/// converted to year fractions from the origin date, which defaults to the
/// earliest registered date when none is set.
#[derive(Clone, Debug, Default)]
pub struct TimeStepsFeature {
    origin: Option<Date>,
    day_count: DayCountConvention,
    pending: BTreeSet<Date>,
    dates: Vec<Date>,
    times: Vec<f64>,
    complete: bool,
}

impl TimeStepsFeature {
    fn close(&mut self) -> Result<(), SimulationError> {
        if self.complete {
            return Ok(());
        }
        let dates: Vec<Date> = self.pending.iter().copied().collect();
        let origin = self.origin.or_else(|| dates.first().copied());
        if let (Some(origin), Some(&first)) = (origin, dates.first()) {
            if first < origin {
                return Err(SimulationError::DateBeforeOrigin { date: first, origin });
            }
        }
        self.times = match origin {
            Some(o) => dates.iter().map(|&d| self.day_count.year_fraction(o, d)).collect(),
            None => Vec::new(),
        };
        self.dates = dates;
        self.complete = true;
        Ok(())
    }

    /// Sorted, de-duplicated step dates. Empty until the collection is closed.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Year fraction of each step from the origin.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Year fraction covered by each step; the first step starts at the origin.
    pub fn time_deltas(&self) -> Vec<f64> {
        let mut prev = 0.0;
        self.times
            .iter()
            .map(|&t| {
                let dt = t - prev;
                prev = t;
                dt
            })
            .collect()
    }

    /// Number of steps.
    #[inline]
    pub fn num_steps(&self) -> usize {
        if self.complete {
            self.dates.len()
        } else {
            self.pending.len()
        }
    }

    /// Step index of `date`, once closed.
    pub fn index_of(&self, date: Date) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// The origin of the time axis.
    pub fn origin(&self) -> Option<Date> {
        self.origin.or_else(|| self.dates.first().copied())
    }

    /// Whether the grid has been sorted and frozen.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Run-wide engine settings visible to every process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineFeature {
    /// Number of paths in the ensemble.
    pub number_of_paths: usize,
    /// Number of workers blocks are spread across.
    pub parallelism: usize,
    /// Base seed for random processes.
    pub seed: u64,
}

/// Typed registry of configuration shared between processes.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::mc::{EngineFeature, FeatureCollection};
/// use pricer_core::types::Date;
///
/// let mut features = FeatureCollection::new(EngineFeature {
///     number_of_paths: 64,
///     parallelism: 1,
///     seed: 0,
/// });
/// let spot = features.add_dimension("spot").unwrap();
/// assert_eq!(features.add_dimension("spot").unwrap(), spot);
///
/// let d = Date::from_ymd(2025, 6, 30).unwrap();
/// features.add_dates([d, d]).unwrap();
/// features.finish_setup().unwrap();
///
/// assert_eq!(features.time_steps().num_steps(), 1);
/// assert!(features.add_dimension("rate").is_err());
/// ```
#[derive(Debug)]
pub struct FeatureCollection {
    engine: EngineFeature,
    dimensions: DimensionsFeature,
    time_steps: TimeStepsFeature,
    features: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    categories: HashMap<String, Box<dyn Any + Send + Sync>>,
    finished: HashSet<String>,
    frozen: bool,
}

impl FeatureCollection {
    /// Creates a collection holding the built-in features.
    pub fn new(engine: EngineFeature) -> Self {
        Self {
            engine,
            dimensions: DimensionsFeature::default(),
            time_steps: TimeStepsFeature::default(),
            features: HashMap::new(),
            categories: HashMap::new(),
            finished: HashSet::new(),
            frozen: false,
        }
    }

    /// Engine settings.
    #[inline]
    pub fn engine(&self) -> &EngineFeature {
        &self.engine
    }

    /// Registered factors.
    #[inline]
    pub fn dimensions(&self) -> &DimensionsFeature {
        &self.dimensions
    }

    /// The time grid.
    #[inline]
    pub fn time_steps(&self) -> &TimeStepsFeature {
        &self.time_steps
    }

    /// Registers a factor, returning its index. Idempotent.
    pub fn add_dimension(&mut self, name: &str) -> Result<usize, SimulationError> {
        self.ensure_open::<DimensionsFeature>()?;
        Ok(self.dimensions.add(name))
    }

    /// Adds step dates. Duplicates are ignored.
    pub fn add_dates(
        &mut self,
        dates: impl IntoIterator<Item = Date>,
    ) -> Result<(), SimulationError> {
        self.ensure_open::<TimeStepsFeature>()?;
        self.time_steps.pending.extend(dates);
        Ok(())
    }

    /// Sets the origin of the time axis (the valuation date).
    pub fn set_time_origin(&mut self, origin: Date) -> Result<(), SimulationError> {
        self.ensure_open::<TimeStepsFeature>()?;
        self.time_steps.origin = Some(origin);
        Ok(())
    }

    /// Sets the day count used to turn step dates into year fractions.
    pub fn set_day_count(&mut self, day_count: DayCountConvention) -> Result<(), SimulationError> {
        self.ensure_open::<TimeStepsFeature>()?;
        self.time_steps.day_count = day_count;
        Ok(())
    }

    /// Stores a feature of kind `T`, replacing any earlier instance.
    pub fn add_feature<T: Any + Send + Sync>(&mut self, feature: T) -> Result<(), SimulationError> {
        self.ensure_open::<T>()?;
        self.features.insert(TypeId::of::<T>(), Box::new(feature));
        Ok(())
    }

    /// The feature of kind `T`.
    ///
    /// # Errors
    ///
    /// [`SimulationError::MissingFeature`] if no instance was registered.
    pub fn feature<T: Any + Send + Sync>(&self) -> Result<&T, SimulationError> {
        self.features
            .get(&TypeId::of::<T>())
            .and_then(|f| f.downcast_ref::<T>())
            .ok_or(SimulationError::MissingFeature {
                kind: type_name::<T>(),
            })
    }

    /// Mutable access to the feature of kind `T` while setup is open.
    pub fn feature_mut<T: Any + Send + Sync>(&mut self) -> Result<&mut T, SimulationError> {
        self.ensure_open::<T>()?;
        self.features
            .get_mut(&TypeId::of::<T>())
            .and_then(|f| f.downcast_mut::<T>())
            .ok_or(SimulationError::MissingFeature {
                kind: type_name::<T>(),
            })
    }

    /// Adds `value` to the named category unless an equal value is already
    /// present. Returns the value's index within the category.
    ///
    /// # Errors
    ///
    /// [`SimulationError::MissingFeature`] if the category already holds
    /// values of a different type.
    pub fn add_to_category<T>(&mut self, category: &str, value: T) -> Result<usize, SimulationError>
    where
        T: PartialEq + Any + Send + Sync,
    {
        self.ensure_open::<Vec<T>>()?;
        let entry = self
            .categories
            .entry(category.to_string())
            .or_insert_with(|| Box::new(Vec::<T>::new()));
        let values = entry
            .downcast_mut::<Vec<T>>()
            .ok_or(SimulationError::MissingFeature {
                kind: type_name::<Vec<T>>(),
            })?;
        match values.iter().position(|v| *v == value) {
            Some(i) => Ok(i),
            None => {
                values.push(value);
                Ok(values.len() - 1)
            }
        }
    }

    /// Values of a named category; empty if the category does not exist.
    pub fn category<T: Any + Send + Sync>(&self, category: &str) -> Result<&[T], SimulationError> {
        match self.categories.get(category) {
            None => Ok(&[]),
            Some(values) => values
                .downcast_ref::<Vec<T>>()
                .map(Vec::as_slice)
                .ok_or(SimulationError::MissingFeature {
                    kind: type_name::<Vec<T>>(),
                }),
        }
    }

    /// Closes setup: sorts the time grid and freezes the collection.
    /// Calling it again has no effect.
    ///
    /// # Errors
    ///
    /// [`SimulationError::DateBeforeOrigin`] if a step date precedes the
    /// origin; the collection then stays open.
    pub fn finish_setup(&mut self) -> Result<(), SimulationError> {
        if self.frozen {
            return Ok(());
        }
        self.time_steps.close()?;
        self.frozen = true;
        tracing::debug!(
            factors = self.dimensions.num_factors(),
            steps = self.time_steps.num_steps(),
            "Feature collection closed"
        );
        Ok(())
    }

    /// Whether setup has been closed.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether the process named `name` has completed finishing.
    pub fn is_finished(&self, name: &str) -> bool {
        self.finished.contains(name)
    }

    pub(crate) fn mark_finished(&mut self, name: &str) {
        self.finished.insert(name.to_string());
    }

    fn ensure_open<T>(&self) -> Result<(), SimulationError> {
        if self.frozen {
            Err(SimulationError::FeaturesFrozen {
                kind: type_name::<T>(),
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn collection() -> FeatureCollection {
        FeatureCollection::new(EngineFeature {
            number_of_paths: 16,
            parallelism: 1,
            seed: 3,
        })
    }

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn test_dimensions_are_idempotent() {
        let mut f = collection();
        assert_eq!(f.add_dimension("eur").unwrap(), 0);
        assert_eq!(f.add_dimension("usd").unwrap(), 1);
        assert_eq!(f.add_dimension("eur").unwrap(), 0);
        assert_eq!(f.dimensions().num_factors(), 2);
        assert_eq!(f.dimensions().index_of("usd"), Some(1));
    }

    #[test]
    fn test_time_steps_sorted_and_deduplicated() {
        let mut f = collection();
        f.set_time_origin(date(2025, 1, 1)).unwrap();
        f.add_dates([date(2026, 1, 1), date(2025, 7, 2), date(2026, 1, 1)])
            .unwrap();
        assert_eq!(f.time_steps().num_steps(), 2);
        f.finish_setup().unwrap();

        let steps = f.time_steps();
        assert_eq!(steps.dates(), &[date(2025, 7, 2), date(2026, 1, 1)]);
        assert_relative_eq!(steps.times()[0], 182.0 / 365.0, epsilon = 1e-12);
        assert_relative_eq!(steps.times()[1], 1.0, epsilon = 1e-12);
        let dts = steps.time_deltas();
        assert_relative_eq!(dts[0] + dts[1], 1.0, epsilon = 1e-12);
        assert_eq!(steps.index_of(date(2026, 1, 1)), Some(1));
        assert_eq!(steps.index_of(date(2025, 1, 1)), None);
    }

    #[test]
    fn test_origin_defaults_to_first_date() {
        let mut f = collection();
        f.add_dates([date(2025, 3, 1)]).unwrap();
        f.finish_setup().unwrap();
        assert_eq!(f.time_steps().times(), &[0.0]);
        assert_eq!(f.time_steps().origin(), Some(date(2025, 3, 1)));
    }

    #[derive(Debug, PartialEq)]
    struct Notional(f64);

    #[test]
    fn test_typed_features() {
        let mut f = collection();
        assert!(matches!(
            f.feature::<Notional>(),
            Err(SimulationError::MissingFeature { .. })
        ));
        f.add_feature(Notional(1.0)).unwrap();
        f.feature_mut::<Notional>().unwrap().0 = 2.0;
        assert_eq!(f.feature::<Notional>().unwrap(), &Notional(2.0));
    }

    #[test]
    fn test_categories_deduplicate() {
        let mut f = collection();
        assert_eq!(f.add_to_category("curves", "EUR.OIS".to_string()).unwrap(), 0);
        assert_eq!(f.add_to_category("curves", "USD.SOFR".to_string()).unwrap(), 1);
        assert_eq!(f.add_to_category("curves", "EUR.OIS".to_string()).unwrap(), 0);
        assert_eq!(f.category::<String>("curves").unwrap().len(), 2);
        assert!(f.category::<String>("fixings").unwrap().is_empty());
        assert!(f.add_to_category("curves", 1_u32).is_err());
    }

    #[test]
    fn test_frozen_after_setup() {
        let mut f = collection();
        f.finish_setup().unwrap();
        f.finish_setup().unwrap();
        assert!(f.is_frozen());
        assert!(matches!(
            f.add_dates([date(2025, 1, 1)]),
            Err(SimulationError::FeaturesFrozen { .. })
        ));
        assert!(f.add_feature(Notional(1.0)).is_err());
        assert_eq!(f.engine().seed, 3);
    }

    #[test]
    fn test_finished_markers() {
        let mut f = collection();
        assert!(!f.is_finished("payoff"));
        f.mark_finished("payoff");
        assert!(f.is_finished("payoff"));
    }

    #[test]
    fn test_dates_before_origin_rejected() {
        let mut f = collection();
        f.set_time_origin(date(2025, 6, 1)).unwrap();
        f.add_dates([date(2025, 9, 1), date(2025, 3, 1)]).unwrap();
        match f.finish_setup() {
            Err(SimulationError::DateBeforeOrigin { date: d, origin }) => {
                assert_eq!(d, date(2025, 3, 1));
                assert_eq!(origin, date(2025, 6, 1));
            }
            other => panic!("expected DateBeforeOrigin, got {other:?}"),
        }
        assert!(!f.is_frozen());
        assert!(f.time_steps().dates().is_empty());

        // the origin date itself is a valid step
        let mut f = collection();
        f.set_time_origin(date(2025, 6, 1)).unwrap();
        f.add_dates([date(2025, 6, 1)]).unwrap();
        f.finish_setup().unwrap();
        assert_eq!(f.time_steps().time_deltas(), vec![0.0]);
    }
}
