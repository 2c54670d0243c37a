use thiserror::Error;

/// Malformed inputs to the engine. "No solution" outcomes are never errors;
/// they surface as empty mixtures or `None`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlendError {
    #[error("share bounds are invalid: min {min}, max {max}")]
    InvalidBounds { min: f64, max: f64 },

    #[error("step size must be positive and finite, got {0}")]
    InvalidStep(f64),

    #[error("{count} shares cannot sum to 100 within [{min}, {max}]")]
    InfeasibleBounds { count: usize, min: f64, max: f64 },

    #[error("target for '{key}' must be finite and non-negative, got {value}")]
    InvalidTarget { key: String, value: f64 },

    #[error("ingredient count range is invalid: min {min}, max {max}")]
    InvalidCounts { min: usize, max: usize },

    #[error("base portion must lie in (0, 100), got {0}")]
    InvalidPortion(f64),

    #[error("locked share of '{ingredient}' must be a whole percentage, got {amount}")]
    InvalidLock { ingredient: String, amount: f64 },

    #[error("locked shares total {0}%, leaving no room for free ingredients")]
    LockedOverflow(f64),

    #[error("property targets are inconsistent: {0}")]
    InconsistentProperties(String),

    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("unknown property '{0}'")]
    UnknownProperty(String),
}
