//! Inverse of the standard normal cumulative distribution function.
//!
//! Acklam's rational approximation: a central rational function on
//! `[0.02425, 0.97575]` and tail approximations in `sqrt(-2 ln p)` outside
//! it. Relative error is below 1.2e-9 over the open unit interval.

const A: [f64; 6] = [
    -3.969_683_028_665_376e1,
    2.209_460_984_245_205e2,
    -2.759_285_104_469_687e2,
    1.383_577_518_672_69e2,
    -3.066_479_806_614_716e1,
    2.506_628_277_459_239,
];
const B: [f64; 5] = [
    -5.447_609_879_822_406e1,
    1.615_858_368_580_409e2,
    -1.556_989_798_598_866e2,
    6.680_131_188_771_972e1,
    -1.328_068_155_288_572e1,
];
const C: [f64; 6] = [
    -7.784_894_002_430_293e-3,
    -3.223_964_580_411_365e-1,
    -2.400_758_277_161_838,
    -2.549_732_539_343_734,
    4.374_664_141_464_968,
    2.938_163_982_698_783,
];
const D: [f64; 4] = [
    7.784_695_709_041_462e-3,
    3.224_671_290_700_398e-1,
    2.445_134_137_142_996,
    3.754_408_661_907_416,
];
const P_LOW: f64 = 0.024_25;
const P_HIGH: f64 = 1.0 - P_LOW;

/// Standard normal quantile of `p`.
///
/// Returns `-inf` at 0, `+inf` at 1 and NaN outside `[0, 1]`.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::rng::inverse_normal_cdf;
///
/// assert_eq!(inverse_normal_cdf(0.5), 0.0);
/// assert!((inverse_normal_cdf(0.975) - 1.959_963_985).abs() < 1e-8);
/// ```
#[inline]
pub fn inverse_normal_cdf(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= P_HIGH {
        let q = p - 0.5;
        let r = q * q;
        let num = A[0].mul_add(r, A[1]).mul_add(r, A[2]).mul_add(r, A[3]).mul_add(r, A[4]).mul_add(r, A[5]);
        let den = B[0].mul_add(r, B[1]).mul_add(r, B[2]).mul_add(r, B[3]).mul_add(r, B[4]).mul_add(r, 1.0);
        num * q / den
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

#[inline]
fn tail(q: f64) -> f64 {
    let num = C[0].mul_add(q, C[1]).mul_add(q, C[2]).mul_add(q, C[3]).mul_add(q, C[4]).mul_add(q, C[5]);
    let den = D[0].mul_add(q, D[1]).mul_add(q, D[2]).mul_add(q, D[3]).mul_add(q, 1.0);
    num / den
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_quantiles() {
        assert_eq!(inverse_normal_cdf(0.5), 0.0);
        assert_relative_eq!(inverse_normal_cdf(0.975), 1.959_963_984_540_054, max_relative = 2e-9);
        assert_relative_eq!(inverse_normal_cdf(0.841_344_746_068_542_9), 1.0, max_relative = 2e-9);
        assert_relative_eq!(inverse_normal_cdf(0.001), -3.090_232_306_167_813_5, max_relative = 2e-9);
    }

    #[test]
    fn test_symmetry() {
        for &p in &[1e-10, 0.01, 0.2, 0.4] {
            assert_relative_eq!(inverse_normal_cdf(p), -inverse_normal_cdf(1.0 - p), max_relative = 1e-6);
        }
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(inverse_normal_cdf(0.0), f64::NEG_INFINITY);
        assert_eq!(inverse_normal_cdf(1.0), f64::INFINITY);
        assert!(inverse_normal_cdf(1.5).is_nan());
        assert!(inverse_normal_cdf(f64::NAN).is_nan());
    }

    #[test]
    fn test_monotone() {
        let mut prev = f64::NEG_INFINITY;
        for i in 1..1000 {
            let x = inverse_normal_cdf(i as f64 / 1000.0);
            assert!(x > prev);
            prev = x;
        }
    }
}
