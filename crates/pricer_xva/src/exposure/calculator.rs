//! Exposure statistics over simulated values.
//!
//! - Expected positive / negative part at one date
//! - Quantiles for Potential Future Exposure
//! - Time-weighted and effective EPE over a profile

/// Exposure calculation utilities.
///
/// Per-date functions take the simulated values at that date, one per path.
pub struct ExposureCalculator;

impl ExposureCalculator {
    /// E[max(V, 0)].
    ///
    /// # Examples
    ///
    /// ```
    /// use pricer_xva::exposure::ExposureCalculator;
    ///
    /// let ee = ExposureCalculator::expected_positive(&[10.0, 5.0, -5.0]);
    /// assert!((ee - 5.0).abs() < 1e-12);
    /// ```
    pub fn expected_positive(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().map(|v| v.max(0.0)).sum::<f64>() / values.len() as f64
    }

    /// E[max(-V, 0)], reported as a non-negative amount.
    pub fn expected_negative(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().map(|v| (-v).max(0.0)).sum::<f64>() / values.len() as f64
    }

    /// The value at index `round((n - 1) · confidence)` of ascending `sorted`.
    ///
    /// `confidence` is clamped to `[0, 1]`; an empty slice gives 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use pricer_xva::exposure::ExposureCalculator;
    ///
    /// // round(4 · 0.8) = 3
    /// let q = ExposureCalculator::quantile(&[5.0, 10.0, 15.0, 20.0, 25.0], 0.8);
    /// assert_eq!(q, 20.0);
    /// ```
    pub fn quantile(sorted: &[f64], confidence: f64) -> f64 {
        let Some(last) = sorted.len().checked_sub(1) else {
            return 0.0;
        };
        let confidence = confidence.clamp(0.0, 1.0);
        let index = ((last as f64) * confidence).round() as usize;
        sorted[index.min(last)]
    }

    /// Peak of a profile, floored at zero.
    #[inline]
    pub fn peak(profile: &[f64]) -> f64 {
        profile.iter().copied().fold(0.0_f64, f64::max)
    }

    /// Time-weighted average of a profile.
    ///
    /// EPE = (1/T) ∫₀ᵀ EE(t) dt, by the trapezoidal rule over `times`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pricer_xva::exposure::ExposureCalculator;
    ///
    /// let ee = [0.0, 10.0, 20.0, 15.0, 5.0];
    /// let times = [0.0, 0.25, 0.5, 0.75, 1.0];
    /// let epe = ExposureCalculator::time_weighted_average(&ee, &times);
    /// assert!((epe - 11.875).abs() < 1e-12);
    /// ```
    pub fn time_weighted_average(profile: &[f64], times: &[f64]) -> f64 {
        let first = profile.first().copied().unwrap_or(0.0);
        if times.len() < 2 || profile.len() != times.len() {
            return first;
        }

        let integral: f64 = times
            .windows(2)
            .zip(profile.windows(2))
            .map(|(t, v)| 0.5 * (v[0] + v[1]) * (t[1] - t[0]))
            .sum();
        let total = times[times.len() - 1] - times[0];
        if total > 0.0 {
            integral / total
        } else {
            first
        }
    }

    /// Effective EPE: the time-weighted average, up to `horizon`, of the
    /// running maximum of the profile.
    pub fn effective_epe(profile: &[f64], times: &[f64], horizon: f64) -> f64 {
        if times.is_empty() || profile.len() != times.len() {
            return 0.0;
        }

        let mut running_max = 0.0_f64;
        let effective: Vec<f64> = profile
            .iter()
            .map(|&v| {
                running_max = running_max.max(v);
                running_max
            })
            .collect();

        let mut integral = 0.0;
        let mut end = times[0];
        for (t, v) in times.windows(2).zip(effective.windows(2)) {
            if t[0] >= horizon {
                break;
            }
            let t1 = t[1].min(horizon);
            if t1 > t[0] {
                integral += 0.5 * (v[0] + v[1]) * (t1 - t[0]);
                end = t1;
            }
        }

        let span = end - times[0];
        if span > 0.0 {
            integral / span
        } else {
            effective[0]
        }
    }
}
