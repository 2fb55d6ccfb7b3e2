use std::path::PathBuf;

/// Failures reported by the planning and analysis operations.
///
/// Validation runs before any arithmetic, so an `Err` never carries partial
/// results.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Inputs the statistics cannot be computed from: conversions above
    /// visitors, zero visitors, a zero effect size, a degenerate standard
    /// error and the like.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `select_best_variant` was handed an empty candidate list.
    #[error("no variants provided")]
    NoVariantsProvided,

    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
