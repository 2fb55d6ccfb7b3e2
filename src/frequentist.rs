//! Two-proportion z-test.

use serde::Serialize;
use tracing::debug;

use crate::arm::Arm;
use crate::error::{Error, Result};

/// Two-tailed significance level.
pub const ALPHA: f64 = 0.05;
/// z-value behind the 95% confidence interval on the uplift.
const CI_Z: f64 = 1.96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequentistVerdict {
    /// Significant, variant converts better.
    Improvement,
    /// Significant, variant converts worse.
    Regression,
    Inconclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequentistResult {
    pub control_rate: f64,
    pub variant_rate: f64,
    /// Relative uplift in percent. `None` when the control converted nobody.
    pub relative_uplift: Option<f64>,
    /// Difference in percentage points.
    pub absolute_difference: f64,
    pub p_value: f64,
    pub z_score: f64,
    /// 95% interval on the relative uplift, in percent. `None` alongside
    /// `relative_uplift`.
    pub confidence_interval: Option<(f64, f64)>,
    pub is_significant: bool,
}

impl FrequentistResult {
    pub fn verdict(&self) -> FrequentistVerdict {
        if !self.is_significant {
            FrequentistVerdict::Inconclusive
        } else if self.variant_rate > self.control_rate {
            FrequentistVerdict::Improvement
        } else {
            FrequentistVerdict::Regression
        }
    }
}

/// Pooled two-proportion z-test of `variant` against `control`.
pub fn analyze(control: &Arm, variant: &Arm) -> Result<FrequentistResult> {
    control.validate("control")?;
    variant.validate("variant")?;

    let n_c = control.visitors as f64;
    let n_v = variant.visitors as f64;
    let p_c = control.rate();
    let p_v = variant.rate();

    let pooled = (control.conversions + variant.conversions) as f64 / (n_c + n_v);
    let se = (pooled * (1.0 - pooled) * (1.0 / n_c + 1.0 / n_v)).sqrt();
    if se == 0.0 {
        return Err(Error::invalid(
            "standard error is zero: both arms converted none or all of their visitors",
        ));
    }

    let z = (p_v - p_c) / se;
    // The CDF approximation sits a hair under 0.5 at z = 0.
    let p_value = (2.0 * (1.0 - stats::normal_cdf(z.abs()))).clamp(0.0, 1.0);

    let (relative_uplift, confidence_interval) = if p_c > 0.0 {
        let se_diff = (p_c * (1.0 - p_c) / n_c + p_v * (1.0 - p_v) / n_v).sqrt();
        let margin = CI_Z * se_diff;
        let relative = |rate: f64| (rate - p_c) / p_c * 100.0;
        (
            Some(relative(p_v)),
            Some((relative(p_v - margin), relative(p_v + margin))),
        )
    } else {
        (None, None)
    };

    debug!(p_c, p_v, pooled, se, z, p_value, "z-test");

    Ok(FrequentistResult {
        control_rate: p_c,
        variant_rate: p_v,
        relative_uplift,
        absolute_difference: (p_v - p_c) * 100.0,
        p_value,
        z_score: z,
        confidence_interval,
        is_significant: p_value < ALPHA,
    })
}
