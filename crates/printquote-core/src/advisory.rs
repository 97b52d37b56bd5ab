//! Advisory classifier results
//!
//! Printability flags, support overhead and an orientation hint come from an
//! external, non-deterministic classifier. Its JSON is parsed into a typed
//! record here and checked once, so downstream formulas only ever see
//! complete, in-range numbers.

use serde::{Deserialize, Serialize};

use crate::error::{QuoteError, QuoteResult};

/// Suggested rotation before printing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationSuggestion {
    /// XYZ Euler angles in degrees
    pub rotation_deg: [f64; 3],
    pub reason: String,
}

/// Classifier verdict for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryReport {
    pub printable: bool,
    pub issues: Vec<String>,
    /// Extra material and time for supports, as a percentage
    pub support_percent: f64,
    pub orientation: OrientationSuggestion,
}

impl AdvisoryReport {
    /// Parse and validate classifier output. Missing fields are an error.
    pub fn from_json_str(json: &str) -> QuoteResult<Self> {
        let report: Self =
            serde_json::from_str(json).map_err(|e| QuoteError::InvalidAdvisory(e.to_string()))?;
        report.validate()?;
        Ok(report)
    }

    pub fn validate(&self) -> QuoteResult<()> {
        if !(self.support_percent.is_finite() && (0.0..=100.0).contains(&self.support_percent)) {
            return Err(QuoteError::InvalidAdvisory(format!(
                "support_percent must be within 0..=100, got {}",
                self.support_percent
            )));
        }
        if self.orientation.rotation_deg.iter().any(|a| !a.is_finite()) {
            return Err(QuoteError::InvalidAdvisory(format!(
                "rotation {:?} is not finite",
                self.orientation.rotation_deg
            )));
        }
        Ok(())
    }
}
