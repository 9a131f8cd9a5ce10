use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tunable thresholds for aggregation, scoring, and recommendation
///
/// Factor weights and band boundaries are deliberately *not* configurable:
/// they are a portability contract shared with downstream dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskmapConfig {
    /// Coverage level every component is measured against (0.0-1.0)
    #[serde(default = "default_coverage_target")]
    pub coverage_target: f64,

    /// Minimum factor contribution (in score points) that produces a
    /// recommendation
    #[serde(default = "default_recommendation_threshold")]
    pub recommendation_threshold: f64,

    /// Journeys below this confidence count as low-confidence exposure
    /// (0.0-1.0)
    #[serde(default = "default_low_confidence_cutoff")]
    pub low_confidence_cutoff: f64,
}

fn default_coverage_target() -> f64 {
    0.8
}

fn default_recommendation_threshold() -> f64 {
    5.0
}

fn default_low_confidence_cutoff() -> f64 {
    0.7
}

impl Default for RiskmapConfig {
    fn default() -> Self {
        Self {
            coverage_target: default_coverage_target(),
            recommendation_threshold: default_recommendation_threshold(),
            low_confidence_cutoff: default_low_confidence_cutoff(),
        }
    }
}

impl RiskmapConfig {
    // Pure function: check a ratio is in the unit interval
    fn is_unit_ratio(value: f64) -> bool {
        (0.0..=1.0).contains(&value)
    }

    fn validate_unit_ratio(value: f64, name: &str) -> Result<()> {
        if Self::is_unit_ratio(value) {
            Ok(())
        } else {
            Err(Error::config(format!(
                "{name} must be between 0.0 and 1.0, got {value}"
            )))
        }
    }

    /// Validate all fields, returning the first violation found.
    pub fn validate(&self) -> Result<()> {
        Self::validate_unit_ratio(self.coverage_target, "coverage_target")?;
        Self::validate_unit_ratio(self.low_confidence_cutoff, "low_confidence_cutoff")?;
        if !(0.0..=100.0).contains(&self.recommendation_threshold) {
            return Err(Error::config(format!(
                "recommendation_threshold must be between 0 and 100, got {}",
                self.recommendation_threshold
            )));
        }
        Ok(())
    }

    /// Parse configuration from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RiskmapConfig = toml::from_str(content)
            .map_err(|e| Error::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RiskmapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.coverage_target, 0.8);
        assert_eq!(config.recommendation_threshold, 5.0);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = RiskmapConfig::from_toml_str("coverage_target = 0.9").unwrap();
        assert_eq!(config.coverage_target, 0.9);
        assert_eq!(config.recommendation_threshold, 5.0);
        assert_eq!(config.low_confidence_cutoff, 0.7);
    }

    #[test]
    fn out_of_range_target_is_rejected() {
        let err = RiskmapConfig::from_toml_str("coverage_target = 1.5").unwrap_err();
        assert!(err.to_string().contains("coverage_target"));
    }
}
