//! Geometric Brownian Motion diffusion over the engine's time grid.
//!
//! [`GbmDiffusion`] turns the standard normal deviates a generator wrote
//! into its factor's slots into spot levels, using the exact log-space
//! scheme
//!
//! ```text
//! ln S(t_i) = ln S(t_{i-1}) + (r - σ²/2) Δt_i + σ √Δt_i Z_i
//! ```
//!
//! with `t_{-1}` the origin of the time grid. Each step's drift and
//! diffusion terms are precomputed at finish time so the per-block loop is
//! a fused multiply-add and an `exp` per lane.

use pricer_core::types::Date;

use super::block::{Lane, PathBlock, SIMD_WIDTH};
use super::error::SimulationError;
use super::features::FeatureCollection;
use super::process::{FinishStatus, PathProcess};

/// GBM model parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GbmParams {
    /// Initial spot price (S₀).
    pub spot: f64,
    /// Continuously compounded drift rate (r).
    pub rate: f64,
    /// Volatility (σ).
    pub volatility: f64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            spot: 100.0,
            rate: 0.05,
            volatility: 0.2,
        }
    }
}

impl GbmParams {
    /// Creates new GBM parameters.
    pub fn new(spot: f64, rate: f64, volatility: f64) -> Self {
        Self {
            spot,
            rate,
            volatility,
        }
    }

    /// Positive finite spot, non-negative finite volatility, finite rate.
    pub fn is_valid(&self) -> bool {
        self.spot > 0.0
            && self.spot.is_finite()
            && self.volatility >= 0.0
            && self.volatility.is_finite()
            && self.rate.is_finite()
    }
}

/// Diffuses one named factor as a GBM.
///
/// Registers its factor and any extra observation dates during setup. Must
/// sit on a later level than the normal generator it reads.
#[derive(Debug)]
pub struct GbmDiffusion {
    name: String,
    factor_name: String,
    params: GbmParams,
    dates: Vec<Date>,
    factor: usize,
    drift_dt: Vec<f64>,
    vol_sqrt_dt: Vec<f64>,
}

impl GbmDiffusion {
    /// A diffusion for `factor_name`.
    pub fn new(factor_name: impl Into<String>, params: GbmParams) -> Self {
        let factor_name = factor_name.into();
        Self {
            name: format!("gbm:{factor_name}"),
            factor_name,
            params,
            dates: Vec::new(),
            factor: 0,
            drift_dt: Vec::new(),
            vol_sqrt_dt: Vec::new(),
        }
    }

    /// Adds dates the diffusion must be observed at.
    pub fn with_dates(mut self, dates: impl IntoIterator<Item = Date>) -> Self {
        self.dates.extend(dates);
        self
    }

    /// Model parameters.
    pub fn params(&self) -> GbmParams {
        self.params
    }
}

impl PathProcess for GbmDiffusion {
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
        if !self.params.is_valid() {
            return Err(SimulationError::Process {
                name: self.name.clone(),
                message: format!("invalid parameters {:?}", self.params),
            });
        }
        self.factor = features
            .dimensions()
            .index_of(&self.factor_name)
            .ok_or_else(|| SimulationError::Process {
                name: self.name.clone(),
                message: format!("factor '{}' not registered", self.factor_name),
            })?;

        let GbmParams { rate, volatility, .. } = self.params;
        let deltas = features.time_steps().time_deltas();
        self.drift_dt = deltas
            .iter()
            .map(|dt| (rate - 0.5 * volatility * volatility) * dt)
            .collect();
        self.vol_sqrt_dt = deltas.iter().map(|dt| volatility * dt.max(0.0).sqrt()).collect();
        Ok(FinishStatus::Complete)
    }

    fn process(&self, block: &mut PathBlock) -> Result<(), SimulationError> {
        let log_spot = self.params.spot.ln();
        for group in (0..block.number_of_paths()).step_by(SIMD_WIDTH) {
            let lanes = block.steps_for_factor_mut(group, self.factor);
            let mut x = Lane::splat(log_spot);
            for ((lane, &drift), &diffusion) in lanes.iter_mut().zip(&self.drift_dt).zip(&self.vol_sqrt_dt) {
                for l in 0..SIMD_WIDTH {
                    x.0[l] = diffusion.mul_add(lane.0[l], x.0[l] + drift);
                    lane.0[l] = x.0[l].exp();
                }
            }
        }
        Ok(())
    }
}
