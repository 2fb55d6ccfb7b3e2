use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::bayesian::{BayesianParams, DEFAULT_SAMPLES, VerdictPolicy};
use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = "liftcheck.toml";

/// Defaults read from `liftcheck.toml`. Every field is optional; command-line
/// flags take precedence over anything set here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub planning: PlanningDefaults,
    pub bayesian: BayesianDefaults,
    pub verdict: VerdictPolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanningDefaults {
    pub confidence: f64,
    pub power: f64,
    pub variants: u32,
}

impl Default for PlanningDefaults {
    fn default() -> Self {
        Self {
            confidence: 0.95,
            power: 0.90,
            variants: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BayesianDefaults {
    pub prior_alpha: f64,
    pub prior_beta: f64,
    pub samples: usize,
    pub seed: Option<u64>,
}

impl Default for BayesianDefaults {
    fn default() -> Self {
        Self {
            prior_alpha: 1.0,
            prior_beta: 1.0,
            samples: DEFAULT_SAMPLES,
            seed: None,
        }
    }
}

impl BayesianDefaults {
    pub fn params(&self) -> BayesianParams {
        BayesianParams {
            prior_alpha: self.prior_alpha,
            prior_beta: self.prior_beta,
            samples: self.samples,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        if let Err(Error::InvalidInput(msg)) = config.verdict.validate() {
            return Err(Error::invalid(format!("{}: {msg}", path.display())));
        }
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `liftcheck.toml` from `start` or the nearest ancestor that has
    /// one. Built-in defaults when none is found.
    pub fn discover(start: &Path) -> Result<Self> {
        match find_config(start) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}

/// Walk up from `start` looking for the config file.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}
