//! Beta-Binomial model with Monte Carlo comparison of the posteriors.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::arm::Arm;
use crate::error::{Error, Result};

pub const DEFAULT_SAMPLES: usize = 100_000;

/// Prior and simulation size for one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BayesianParams {
    pub prior_alpha: f64,
    pub prior_beta: f64,
    pub samples: usize,
}

impl Default for BayesianParams {
    /// Uniform Beta(1, 1) prior.
    fn default() -> Self {
        Self {
            prior_alpha: 1.0,
            prior_beta: 1.0,
            samples: DEFAULT_SAMPLES,
        }
    }
}

/// Thresholds, in percent, on the probability that the variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictPolicy {
    pub strong: f64,
    pub moderate: f64,
    pub control_likely: f64,
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            strong: 95.0,
            moderate: 90.0,
            control_likely: 50.0,
        }
    }
}

impl VerdictPolicy {
    /// Thresholds must be percentages ordered
    /// `control_likely <= moderate <= strong`, or some tier becomes unreachable.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("strong", self.strong),
            ("moderate", self.moderate),
            ("control_likely", self.control_likely),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(Error::invalid(format!(
                    "verdict threshold {name} must be a percentage in [0, 100], got {value}"
                )));
            }
        }
        if !(self.control_likely <= self.moderate && self.moderate <= self.strong) {
            return Err(Error::invalid(format!(
                "verdict thresholds must satisfy control_likely <= moderate <= strong, \
                 got {} / {} / {}",
                self.control_likely, self.moderate, self.strong
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BayesianVerdict {
    StrongEvidence,
    ModerateEvidence,
    ControlLikelyBetter,
    Inconclusive,
}

/// Beta posterior parameters for one arm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Posterior {
    pub alpha: f64,
    pub beta: f64,
}

impl Posterior {
    /// Conjugate update of a Beta(prior_alpha, prior_beta) prior.
    pub fn update(prior_alpha: f64, prior_beta: f64, arm: &Arm) -> Self {
        Self {
            alpha: prior_alpha + arm.conversions as f64,
            beta: prior_beta + arm.failures() as f64,
        }
    }

    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        stats::beta(rng, self.alpha, self.beta)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BayesianResult {
    pub control_posterior: Posterior,
    pub variant_posterior: Posterior,
    /// Percent of draws where the variant rate exceeded the control rate.
    pub probability_variant_beats_control: f64,
    /// Mean conversion rate given up by keeping the control (a fraction).
    pub expected_loss_choose_control: f64,
    /// Mean conversion rate given up by shipping the variant (a fraction).
    pub expected_loss_choose_variant: f64,
    /// Median relative uplift across draws, in percent. `None` when some
    /// control draw was exactly zero and the relative uplift is undefined.
    pub median_uplift: Option<f64>,
    /// 2.5th and 97.5th percentile of the relative uplift, in percent.
    /// `None` alongside `median_uplift`.
    pub credible_interval: Option<(f64, f64)>,
    pub samples: usize,
}

impl BayesianResult {
    pub fn verdict(&self, policy: &VerdictPolicy) -> BayesianVerdict {
        let p = self.probability_variant_beats_control;
        if p > policy.strong {
            BayesianVerdict::StrongEvidence
        } else if p > policy.moderate {
            BayesianVerdict::ModerateEvidence
        } else if p < policy.control_likely {
            BayesianVerdict::ControlLikelyBetter
        } else {
            BayesianVerdict::Inconclusive
        }
    }
}

/// Simulate `params.samples` paired draws from both posteriors.
///
/// Draws are taken in a single sequential loop (control first, then variant)
/// so a given random sequence always produces the same result.
pub fn analyze<R: Rng + ?Sized>(
    control: &Arm,
    variant: &Arm,
    params: &BayesianParams,
    rng: &mut R,
) -> Result<BayesianResult> {
    control.validate("control")?;
    variant.validate("variant")?;
    validate_params(params)?;

    let control_post = Posterior::update(params.prior_alpha, params.prior_beta, control);
    let variant_post = Posterior::update(params.prior_alpha, params.prior_beta, variant);
    debug!(?control_post, ?variant_post, samples = params.samples, "posteriors");

    let n = params.samples;
    let mut wins = 0usize;
    let mut zero_control_draws = 0usize;
    let mut uplifts = Vec::with_capacity(n);
    let mut loss_control = Vec::with_capacity(n);
    let mut loss_variant = Vec::with_capacity(n);

    for _ in 0..n {
        let c = control_post.sample(rng);
        let v = variant_post.sample(rng);
        if v > c {
            wins += 1;
        }
        // Priors far below 1 can underflow a draw to exactly zero.
        if c == 0.0 {
            zero_control_draws += 1;
        } else {
            uplifts.push((v - c) / c * 100.0);
        }
        loss_control.push((v - c).max(0.0));
        loss_variant.push((c - v).max(0.0));
    }

    let uplift_summary = if zero_control_draws == 0 {
        uplifts.par_sort_unstable_by(f64::total_cmp);
        Some((
            stats::percentile_at(&uplifts, 0.5),
            (
                stats::percentile_at(&uplifts, 0.025),
                stats::percentile_at(&uplifts, 0.975),
            ),
        ))
    } else {
        warn!(
            zero_control_draws,
            samples = n,
            "control posterior produced zero draws, relative uplift is undefined"
        );
        None
    };

    let result = BayesianResult {
        control_posterior: control_post,
        variant_posterior: variant_post,
        probability_variant_beats_control: wins as f64 / n as f64 * 100.0,
        expected_loss_choose_control: stats::mean(&loss_control),
        expected_loss_choose_variant: stats::mean(&loss_variant),
        median_uplift: uplift_summary.map(|(median, _)| median),
        credible_interval: uplift_summary.map(|(_, interval)| interval),
        samples: n,
    };
    debug!(
        p_win = result.probability_variant_beats_control,
        median = ?result.median_uplift,
        "simulation done"
    );
    Ok(result)
}

/// [`analyze`] with a `StdRng` seeded from `seed`, or from the OS when no
/// seed is given.
pub fn analyze_seeded(
    control: &Arm,
    variant: &Arm,
    params: &BayesianParams,
    seed: Option<u64>,
) -> Result<BayesianResult> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };
    analyze(control, variant, params, &mut rng)
}

fn validate_params(params: &BayesianParams) -> Result<()> {
    for (name, value) in [
        ("prior alpha", params.prior_alpha),
        ("prior beta", params.prior_beta),
    ] {
        if !(value > 0.0 && value.is_finite()) {
            return Err(Error::invalid(format!(
                "{name} must be positive and finite, got {value}"
            )));
        }
    }
    if params.samples == 0 {
        return Err(Error::invalid("sample count must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn arm(visitors: u64, conversions: u64) -> Arm {
        Arm::new(visitors, conversions).unwrap()
    }

    fn params(samples: usize) -> BayesianParams {
        BayesianParams {
            samples,
            ..BayesianParams::default()
        }
    }

    #[test]
    fn posterior_is_conjugate_update() {
        let post = Posterior::update(1.0, 1.0, &arm(10_000, 500));
        assert_eq!(post.alpha, 501.0);
        assert_eq!(post.beta, 9_501.0);
        assert_abs_diff_eq!(post.mean(), 501.0 / 10_002.0, epsilon = 1e-15);
    }

    #[test]
    fn clear_improvement_has_strong_evidence() {
        let r = analyze_seeded(&arm(10_000, 500), &arm(10_000, 600), &params(100_000), Some(7))
            .unwrap();
        assert!(
            r.probability_variant_beats_control > 95.0,
            "P(B > A) = {}",
            r.probability_variant_beats_control
        );
        assert_eq!(r.verdict(&VerdictPolicy::default()), BayesianVerdict::StrongEvidence);
        assert!(r.expected_loss_choose_control > r.expected_loss_choose_variant);
    }

    #[test]
    fn uplift_summary_is_centred_on_the_observed_lift() {
        let r = analyze_seeded(&arm(10_000, 500), &arm(10_000, 600), &params(20_000), Some(3))
            .unwrap();
        let (lo, hi) = r.credible_interval.unwrap();
        let median = r.median_uplift.unwrap();
        assert!(lo < median && median < hi);
        // Observed lift is 20%; the posterior median lands close by.
        assert!((median - 20.0).abs() < 3.0, "median {median}");
        assert!(lo > 0.0 && hi < 45.0, "interval ({lo}, {hi})");
    }

    #[test]
    fn worse_variant_points_to_control() {
        let r = analyze_seeded(&arm(10_000, 600), &arm(10_000, 500), &params(20_000), Some(11))
            .unwrap();
        assert!(r.probability_variant_beats_control < 5.0);
        assert_eq!(
            r.verdict(&VerdictPolicy::default()),
            BayesianVerdict::ControlLikelyBetter
        );
        assert!(r.median_uplift.unwrap() < 0.0);
    }

    #[test]
    fn identical_arms_are_a_coin_flip() {
        let r = analyze_seeded(&arm(5_000, 250), &arm(5_000, 250), &params(20_000), Some(5))
            .unwrap();
        let p = r.probability_variant_beats_control;
        assert!((p - 50.0).abs() < 3.0, "P(B > A) = {p}");
        assert_abs_diff_eq!(
            r.expected_loss_choose_control,
            r.expected_loss_choose_variant,
            epsilon = 2e-4
        );
    }

    #[test]
    fn same_seed_is_reproducible() {
        let run = || {
            analyze_seeded(&arm(2_000, 90), &arm(2_000, 110), &params(5_000), Some(42)).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn pluggable_rng_matches_seeded_entry_point() {
        let mut rng = StdRng::seed_from_u64(99);
        let a = analyze(&arm(1_000, 40), &arm(1_000, 55), &params(2_000), &mut rng).unwrap();
        let b = analyze_seeded(&arm(1_000, 40), &arm(1_000, 55), &params(2_000), Some(99))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_draw_uses_that_draw_everywhere() {
        let r = analyze_seeded(&arm(100, 5), &arm(100, 8), &params(1), Some(1)).unwrap();
        let median = r.median_uplift.unwrap();
        assert_eq!(r.credible_interval, Some((median, median)));
        let p = r.probability_variant_beats_control;
        assert!(p == 0.0 || p == 100.0);
    }

    fn assert_summary_is_finite(r: &BayesianResult) {
        for (name, value) in [
            ("probability", r.probability_variant_beats_control),
            ("loss keeping control", r.expected_loss_choose_control),
            ("loss shipping variant", r.expected_loss_choose_variant),
        ] {
            assert!(value.is_finite(), "{name} is {value}");
        }
        if let Some(median) = r.median_uplift {
            assert!(median.is_finite(), "median uplift is {median}");
        }
        if let Some((lo, hi)) = r.credible_interval {
            assert!(lo.is_finite() && hi.is_finite(), "interval ({lo}, {hi})");
        }
        assert_eq!(r.median_uplift.is_some(), r.credible_interval.is_some());
    }

    #[test]
    fn tiny_prior_with_no_conversions_has_no_relative_uplift() {
        // Beta(0.001, 1001) draws underflow to zero for about half the draws.
        let tiny = BayesianParams {
            prior_alpha: 0.001,
            ..params(10_000)
        };
        let r = analyze_seeded(&arm(1_000, 0), &arm(1_000, 0), &tiny, Some(1)).unwrap();
        assert_summary_is_finite(&r);
        assert_eq!(r.median_uplift, None);
        assert_eq!(r.credible_interval, None);
        assert!((0.0..=100.0).contains(&r.probability_variant_beats_control));
    }

    #[test]
    fn sub_unit_prior_with_zero_conversions_stays_finite() {
        let jeffreys = BayesianParams {
            prior_alpha: 0.5,
            prior_beta: 0.5,
            ..params(10_000)
        };
        let r = analyze_seeded(&arm(1_000, 0), &arm(1_000, 3), &jeffreys, Some(4)).unwrap();
        assert_summary_is_finite(&r);
        assert!(r.median_uplift.unwrap() > 0.0);
        assert!(r.probability_variant_beats_control > 90.0);
    }

    #[test]
    fn zero_conversions_in_both_arms_under_uniform_prior() {
        let r = analyze_seeded(&arm(500, 0), &arm(500, 0), &params(5_000), Some(2)).unwrap();
        assert_summary_is_finite(&r);
        assert!(r.median_uplift.is_some());
        let p = r.probability_variant_beats_control;
        assert!((p - 50.0).abs() < 5.0, "P(B > A) = {p}");
    }

    #[test]
    fn losses_are_non_negative() {
        let r = analyze_seeded(&arm(300, 12), &arm(280, 15), &params(3_000), Some(8)).unwrap();
        assert!(r.expected_loss_choose_control >= 0.0);
        assert!(r.expected_loss_choose_variant >= 0.0);
        assert!((0.0..=100.0).contains(&r.probability_variant_beats_control));
    }

    #[test]
    fn rejects_bad_parameters() {
        let a = arm(100, 5);
        let bad = [
            BayesianParams { prior_alpha: 0.0, ..params(10) },
            BayesianParams { prior_beta: -1.0, ..params(10) },
            BayesianParams { prior_alpha: f64::INFINITY, ..params(10) },
            params(0),
        ];
        for p in bad {
            assert!(
                matches!(analyze_seeded(&a, &a, &p, Some(1)), Err(Error::InvalidInput(_))),
                "expected rejection of {p:?}"
            );
        }
        assert!(analyze_seeded(&arm(0, 0), &a, &params(10), Some(1)).is_err());
    }

    #[test]
    fn default_policy_is_valid() {
        VerdictPolicy::default().validate().unwrap();
    }

    #[test]
    fn misordered_policy_is_rejected() {
        let cases = [
            VerdictPolicy { moderate: 97.0, ..VerdictPolicy::default() },
            VerdictPolicy { control_likely: 92.0, ..VerdictPolicy::default() },
            VerdictPolicy { strong: 120.0, ..VerdictPolicy::default() },
            VerdictPolicy { control_likely: f64::NAN, ..VerdictPolicy::default() },
        ];
        for policy in cases {
            assert!(
                matches!(policy.validate(), Err(Error::InvalidInput(_))),
                "expected rejection of {policy:?}"
            );
        }
    }

    #[test]
    fn verdict_tiers_follow_policy() {
        let policy = VerdictPolicy::default();
        let with_p = |p: f64| BayesianResult {
            control_posterior: Posterior { alpha: 1.0, beta: 1.0 },
            variant_posterior: Posterior { alpha: 1.0, beta: 1.0 },
            probability_variant_beats_control: p,
            expected_loss_choose_control: 0.0,
            expected_loss_choose_variant: 0.0,
            median_uplift: Some(0.0),
            credible_interval: Some((0.0, 0.0)),
            samples: 1,
        };
        assert_eq!(with_p(99.0).verdict(&policy), BayesianVerdict::StrongEvidence);
        assert_eq!(with_p(95.0).verdict(&policy), BayesianVerdict::ModerateEvidence);
        assert_eq!(with_p(92.0).verdict(&policy), BayesianVerdict::ModerateEvidence);
        assert_eq!(with_p(90.0).verdict(&policy), BayesianVerdict::Inconclusive);
        assert_eq!(with_p(50.0).verdict(&policy), BayesianVerdict::Inconclusive);
        assert_eq!(with_p(49.9).verdict(&policy), BayesianVerdict::ControlLikelyBetter);

        let strict = VerdictPolicy {
            strong: 99.0,
            ..policy
        };
        assert_eq!(with_p(97.0).verdict(&strict), BayesianVerdict::ModerateEvidence);
    }
}
