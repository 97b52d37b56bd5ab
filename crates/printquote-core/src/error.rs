//! Error types shared by every stage of the quote pipeline.

use thiserror::Error;

/// Quote errors
#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("Missing geometry: volume and dimensions are required")]
    MissingGeometry,

    #[error("Degenerate mesh: {0}")]
    DegenerateMesh(String),

    #[error("Invalid mesh buffer: {0}")]
    InvalidMesh(String),

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid pricing tier table: {0}")]
    InvalidTierTable(String),

    #[error("Invalid advisory report: {0}")]
    InvalidAdvisory(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QuoteError {
    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type for quote operations
pub type QuoteResult<T> = Result<T, QuoteError>;

/// Reject values that are NaN, infinite or not strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> QuoteResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(QuoteError::parameter(name, format!("must be positive, got {value}")))
    }
}

/// Reject values outside `0..=100`.
pub(crate) fn ensure_percent(name: &'static str, value: f64) -> QuoteResult<()> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(QuoteError::parameter(name, format!("must be within 0..=100, got {value}")))
    }
}
