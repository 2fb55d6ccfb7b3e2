use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One group of a test: how many visitors it saw and how many converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arm {
    pub visitors: u64,
    pub conversions: u64,
}

impl Arm {
    pub fn new(visitors: u64, conversions: u64) -> Result<Self> {
        if conversions > visitors {
            return Err(Error::invalid(format!(
                "conversions ({conversions}) exceed visitors ({visitors})"
            )));
        }
        Ok(Self {
            visitors,
            conversions,
        })
    }

    /// Observed conversion rate. Only meaningful once [`Arm::validate`] passed.
    pub fn rate(&self) -> f64 {
        self.conversions as f64 / self.visitors as f64
    }

    pub fn failures(&self) -> u64 {
        self.visitors - self.conversions
    }

    /// Check the arm can take part in a rate computation. `label` names the
    /// arm in the error message.
    pub fn validate(&self, label: &str) -> Result<()> {
        if self.visitors == 0 {
            return Err(Error::invalid(format!("{label} has no visitors")));
        }
        if self.conversions > self.visitors {
            return Err(Error::invalid(format!(
                "{label} conversions ({}) exceed visitors ({})",
                self.conversions, self.visitors
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.visitors, self.conversions)
    }
}

/// Parses `VISITORS:CONVERSIONS`, e.g. `10000:500`.
impl FromStr for Arm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (visitors, conversions) = s
            .split_once(':')
            .ok_or_else(|| Error::invalid(format!("expected VISITORS:CONVERSIONS, got '{s}'")))?;
        let parse = |field: &str, what: &str| {
            field
                .trim()
                .parse::<u64>()
                .map_err(|e| Error::invalid(format!("bad {what} count '{field}': {e}")))
        };
        Arm::new(parse(visitors, "visitor")?, parse(conversions, "conversion")?)
    }
}

/// Pick the candidate with the highest conversion rate. Ties go to the
/// earliest candidate. Returns the winner's index together with the arm.
pub fn select_best_variant(candidates: &[Arm]) -> Result<(usize, Arm)> {
    let (first, rest) = candidates.split_first().ok_or(Error::NoVariantsProvided)?;
    first.validate("variant 1")?;

    let mut best = (0, *first);
    let mut best_rate = first.rate();
    for (i, arm) in rest.iter().enumerate() {
        let idx = i + 1;
        arm.validate(&format!("variant {}", idx + 1))?;
        let rate = arm.rate();
        if rate > best_rate {
            best = (idx, *arm);
            best_rate = rate;
        }
    }
    Ok(best)
}
