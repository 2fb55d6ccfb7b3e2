//! Standard normal helpers: critical values and the CDF.

/// Critical z-values for the confidence levels a test can be planned at.
const Z_TABLE: [(f64, f64); 3] = [(0.90, 1.645), (0.95, 1.96), (0.99, 2.576)];

/// Value returned by [`z_score_for`] for levels outside the table.
pub const FALLBACK_Z: f64 = 1.96;

const LEVEL_EPS: f64 = 1e-9;

/// Exact table lookup. `None` for any level not in {0.90, 0.95, 0.99}.
pub fn lookup_z(level: f64) -> Option<f64> {
    Z_TABLE
        .iter()
        .find(|(l, _)| (l - level).abs() < LEVEL_EPS)
        .map(|&(_, z)| z)
}

/// z-value for a confidence (or power) level, falling back to 1.96 for
/// levels the table does not carry.
pub fn z_score_for(level: f64) -> f64 {
    lookup_z(level).unwrap_or(FALLBACK_Z)
}

/// Zelen & Severo (Abramowitz-Stegun 26.2.17) approximation of the
/// standard normal CDF. Absolute error below 7.5e-8.
pub fn normal_cdf(z: f64) -> f64 {
    const P: f64 = 0.2316419;
    const B: [f64; 5] = [0.3193815, -0.3565638, 1.781478, -1.821256, 1.330274];

    let t = 1.0 / (1.0 + P * z.abs());
    let d = 0.3989423 * (-z * z / 2.0).exp();
    // Horner form of b1*t + b2*t^2 + ... + b5*t^5, the leading t folded in below
    let poly = B[0] + t * (B[1] + t * (B[2] + t * (B[3] + t * B[4])));
    let tail = d * t * poly;

    if z > 0.0 { 1.0 - tail } else { tail }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn table_levels_are_exact() {
        assert_eq!(z_score_for(0.90), 1.645);
        assert_eq!(z_score_for(0.95), 1.96);
        assert_eq!(z_score_for(0.99), 2.576);
    }

    #[test]
    fn unknown_level_falls_back() {
        assert_eq!(lookup_z(0.80), None);
        assert_eq!(z_score_for(0.80), FALLBACK_Z);
        assert_eq!(z_score_for(0.5), 1.96);
    }

    #[test]
    fn cdf_at_zero_is_half() {
        assert_abs_diff_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn cdf_matches_known_quantiles() {
        assert_abs_diff_eq!(normal_cdf(1.96), 0.975, epsilon = 1e-5);
        assert_abs_diff_eq!(normal_cdf(-1.96), 0.025, epsilon = 1e-5);
        assert_abs_diff_eq!(normal_cdf(1.645), 0.95, epsilon = 1e-4);
        assert_abs_diff_eq!(normal_cdf(2.576), 0.995, epsilon = 1e-4);
    }

    #[test]
    fn cdf_saturates_in_the_tails() {
        assert!(normal_cdf(10.0) > 0.999_999);
        assert!(normal_cdf(-10.0) < 1e-6);
    }

    proptest! {
        #[test]
        fn cdf_is_symmetric(z in -8.0f64..8.0) {
            let lhs = normal_cdf(-z);
            let rhs = 1.0 - normal_cdf(z);
            prop_assert!((lhs - rhs).abs() < 1e-6, "cdf(-{z})={lhs}, 1-cdf({z})={rhs}");
        }

        #[test]
        fn cdf_stays_in_unit_interval(z in -50.0f64..50.0) {
            let p = normal_cdf(z);
            prop_assert!((0.0..=1.0).contains(&p));
        }

        #[test]
        fn cdf_is_monotone(a in -6.0f64..6.0, delta in 0.01f64..2.0) {
            prop_assert!(normal_cdf(a) <= normal_cdf(a + delta));
        }
    }
}
