//! Sample size planning and significance analysis for conversion A/B tests.
//!
//! The numerical kernels (normal CDF, gamma/beta variates) live in the
//! `stats` workspace crate; this crate validates inputs and assembles them
//! into planning and analysis results.

pub mod arm;
pub mod bayesian;
pub mod config;
pub mod error;
pub mod frequentist;
pub mod planner;

pub use arm::{Arm, select_best_variant};
pub use bayesian::{
    BayesianParams, BayesianResult, BayesianVerdict, Posterior, VerdictPolicy,
    analyze as analyze_bayesian, analyze_seeded as analyze_bayesian_seeded,
};
pub use config::Config;
pub use error::{Error, Result};
pub use frequentist::{FrequentistResult, FrequentistVerdict, analyze as analyze_frequentist};
pub use planner::{PlanningInput, PlanningResult, Recommendations, plan};
