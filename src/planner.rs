//! Pre-test sample size planning.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Below this many visitors per variant a result is considered fragile.
pub const MIN_VISITORS_PER_VARIANT: u64 = 5_000;
/// Run for at least two full weekly cycles.
pub const MIN_DURATION_DAYS: u64 = 14;
/// Past six weeks, cookie churn and seasonality start to dominate.
pub const MAX_DURATION_DAYS: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanningInput {
    /// Current conversion rate, a fraction in (0, 1).
    pub baseline_rate: f64,
    /// Smallest relative lift worth detecting (0.10 = +10%).
    pub minimum_detectable_effect: f64,
    pub confidence_level: f64,
    pub power: f64,
    /// Number of arms, control included.
    pub variant_count: u32,
    pub daily_traffic: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Recommendations {
    pub min_visitors_met: bool,
    pub min_duration_met: bool,
    pub max_duration_met: bool,
}

impl Recommendations {
    pub fn all_met(&self) -> bool {
        self.min_visitors_met && self.min_duration_met && self.max_duration_met
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanningResult {
    pub sample_per_variant: u64,
    pub total_sample: u64,
    pub duration_days: u64,
    pub expected_variant_rate: f64,
    pub recommendations: Recommendations,
}

/// Required sample size for a two-proportion test, from the pooled-variance
/// approximation `n = (z_a + z_b)^2 * p(1-p) / delta^2`.
pub fn plan(input: &PlanningInput) -> Result<PlanningResult> {
    validate(input)?;

    let baseline = input.baseline_rate;
    let variant_rate = baseline * (1.0 + input.minimum_detectable_effect);
    if !(variant_rate > 0.0 && variant_rate <= 1.0) {
        return Err(Error::invalid(format!(
            "expected variant rate {variant_rate} is outside (0, 1]"
        )));
    }
    if variant_rate == baseline {
        return Err(Error::invalid(
            "minimum detectable effect is too small to change the baseline rate",
        ));
    }

    let z_alpha = critical_value("confidence level", input.confidence_level);
    let z_beta = critical_value("power", input.power);

    let pooled = (baseline + variant_rate) / 2.0;
    let numerator = (z_alpha + z_beta).powi(2) * pooled * (1.0 - pooled);
    let denominator = (variant_rate - baseline).powi(2);
    let raw = (numerator / denominator).ceil();
    // u64::MAX as f64 rounds up to 2^64, which itself does not fit.
    if !raw.is_finite() || raw >= u64::MAX as f64 {
        return Err(Error::invalid(format!(
            "minimum detectable effect {} needs more visitors per variant than can be counted",
            input.minimum_detectable_effect
        )));
    }
    let sample_per_variant = raw as u64;

    let total_sample = sample_per_variant
        .checked_mul(u64::from(input.variant_count))
        .ok_or_else(|| {
            Error::invalid(format!(
                "total sample for {} variants overflows",
                input.variant_count
            ))
        })?;
    let duration_days = total_sample.div_ceil(input.daily_traffic);

    debug!(
        variant_rate,
        pooled, z_alpha, z_beta, sample_per_variant, duration_days, "planned test"
    );

    Ok(PlanningResult {
        sample_per_variant,
        total_sample,
        duration_days,
        expected_variant_rate: variant_rate,
        recommendations: Recommendations {
            min_visitors_met: sample_per_variant >= MIN_VISITORS_PER_VARIANT,
            min_duration_met: duration_days >= MIN_DURATION_DAYS,
            max_duration_met: duration_days <= MAX_DURATION_DAYS,
        },
    })
}

fn validate(input: &PlanningInput) -> Result<()> {
    if !(input.baseline_rate > 0.0 && input.baseline_rate < 1.0) {
        return Err(Error::invalid(format!(
            "baseline rate must be in (0, 1), got {}",
            input.baseline_rate
        )));
    }
    if input.minimum_detectable_effect == 0.0 || !input.minimum_detectable_effect.is_finite() {
        return Err(Error::invalid(
            "minimum detectable effect must be a non-zero finite fraction",
        ));
    }
    for (name, level) in [
        ("confidence level", input.confidence_level),
        ("power", input.power),
    ] {
        if !(level > 0.0 && level < 1.0) {
            return Err(Error::invalid(format!("{name} must be in (0, 1), got {level}")));
        }
    }
    if input.variant_count == 0 {
        return Err(Error::invalid("variant count must be at least 1"));
    }
    if input.daily_traffic == 0 {
        return Err(Error::invalid("daily traffic must be positive"));
    }
    Ok(())
}

fn critical_value(name: &str, level: f64) -> f64 {
    match stats::lookup_z(level) {
        Some(z) => z,
        None => {
            warn!(
                level,
                fallback = stats::FALLBACK_Z,
                "no tabulated z-value for {name}, using fallback"
            );
            stats::z_score_for(level)
        }
    }
}
