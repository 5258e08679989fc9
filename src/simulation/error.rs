use thiserror::Error;

use crate::floating_type_mod::FT;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by geometry construction, filling and configuration loading.
///
/// Nothing in this crate retries on error. Every variant is reported
/// synchronously to the caller that triggered it.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter, detected at construction time.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// The particle store cannot hold the requested virtual particles.
    #[error("insufficient particle capacity: requested {requested} slots, {available} available")]
    Capacity { requested: usize, available: usize },

    /// The simulation box does not enclose the walls plus the fill region.
    #[error("simulation box too small: y extent [{lo}, {hi}] must enclose +/-{required}")]
    BoxTooSmall { lo: FT, hi: FT, required: FT },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed parsing configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Returns `Error::InvalidParam` unless `v` is finite and strictly positive.
pub(crate) fn require_positive(name: &str, v: FT) -> Result<FT> {
    if !v.is_finite() || v <= 0. {
        return Err(Error::InvalidParam(format!("{} must be finite and > 0 (got {})", name, v)));
    }
    Ok(v)
}

pub(crate) fn require_finite(name: &str, v: FT) -> Result<FT> {
    if !v.is_finite() {
        return Err(Error::InvalidParam(format!("{} must be finite (got {})", name, v)));
    }
    Ok(v)
}
