//! Analysis configuration: confidence level and significance threshold.
//!
//! Loadable from TOML:
//! ```toml
//! confidence_level = 0.95
//! significance_threshold = 0.05
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AbTestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Two-sided confidence level of the Wilson interval, in (0, 1).
    pub confidence_level: f64,
    /// p-value below which a chi-squared result is significant, in (0, 1).
    pub significance_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            significance_threshold: 0.05,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(AbTestError::Config(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if !(self.significance_threshold > 0.0 && self.significance_threshold < 1.0) {
            return Err(AbTestError::Config(format!(
                "significance_threshold must be in (0, 1), got {}",
                self.significance_threshold
            )));
        }
        Ok(())
    }

    /// `self` when it passes [`validate`](Self::validate), otherwise the default.
    pub fn checked_or_default(&self) -> Self {
        match self.validate() {
            Ok(()) => *self,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring invalid analysis config, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Two-sided normal critical value for `confidence_level`.
    ///
    /// Common levels use fixed table values (0.95 gives 1.96); anything else
    /// goes through the inverse-normal approximation.
    pub fn z_score(&self) -> f64 {
        const TABLE: [(f64, f64); 3] = [(0.90, 1.645), (0.95, 1.96), (0.99, 2.576)];
        for (level, z) in TABLE {
            if (self.confidence_level - level).abs() < 1e-9 {
                return z;
            }
        }
        inverse_normal_cdf(1.0 - (1.0 - self.confidence_level) / 2.0)
    }
}

/// z such that P(Z < z) = p (Abramowitz & Stegun 26.2.23, |error| < 4.5e-4).
fn inverse_normal_cdf(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let (tail, sign) = if p < 0.5 { (p, -1.0) } else { (1.0 - p, 1.0) };
    let t = (-2.0 * tail.ln()).sqrt();

    let (c0, c1, c2) = (2.515517, 0.802853, 0.010328);
    let (d1, d2, d3) = (1.432788, 0.189269, 0.001308);
    let z = t - (c0 + c1 * t + c2 * t * t) / (1.0 + d1 * t + d2 * t * t + d3 * t * t * t);
    sign * z
}
