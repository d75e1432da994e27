use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::detection_decoder::ScoreLayout;
use crate::shared::constants::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_OVERLAP_THRESHOLD};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{name} threshold must be between 0.0 and 1.0, got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },
    #[error("target class must not be empty")]
    EmptyTargetClass,
    #[error("target class '{0}' is not in the label vocabulary")]
    UnknownTargetClass(String),
}

/// Per-run counting parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountingConfig {
    pub target_class: String,
    pub confidence_threshold: f64,
    pub overlap_threshold: f64,
    pub score_layout: ScoreLayout,
    /// Fail instead of counting zero when the target class is unknown.
    pub strict_class: bool,
}

impl CountingConfig {
    pub fn new(target_class: impl Into<String>) -> Self {
        Self {
            target_class: target_class.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_class.is_empty() {
            return Err(ConfigError::EmptyTargetClass);
        }
        check_threshold("confidence", self.confidence_threshold)?;
        check_threshold("overlap", self.overlap_threshold)?;
        Ok(())
    }
}

impl Default for CountingConfig {
    fn default() -> Self {
        Self {
            target_class: "person".to_string(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            score_layout: ScoreLayout::ClassScores,
            strict_class: false,
        }
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = CountingConfig::default();
        assert_relative_eq!(config.confidence_threshold, 0.5);
        assert_relative_eq!(config.overlap_threshold, 0.3);
        assert_eq!(config.score_layout, ScoreLayout::ClassScores);
        assert!(!config.strict_class);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_new_sets_target_and_keeps_defaults() {
        let config = CountingConfig::new("car");
        assert_eq!(config.target_class, "car");
        assert_relative_eq!(config.confidence_threshold, 0.5);
    }

    #[rstest]
    #[case::zero(0.0, true)]
    #[case::one(1.0, true)]
    #[case::negative(-0.1, false)]
    #[case::above_one(1.5, false)]
    #[case::nan(f64::NAN, false)]
    fn test_confidence_range(#[case] value: f64, #[case] ok: bool) {
        let config = CountingConfig {
            confidence_threshold: value,
            ..CountingConfig::default()
        };
        assert_eq!(config.validate().is_ok(), ok);
    }

    #[test]
    fn test_overlap_out_of_range_names_threshold() {
        let config = CountingConfig {
            overlap_threshold: 2.0,
            ..CountingConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ThresholdOutOfRange {
                name: "overlap",
                value: 2.0
            })
        );
    }

    #[test]
    fn test_empty_target_rejected() {
        assert_eq!(
            CountingConfig::new("").validate(),
            Err(ConfigError::EmptyTargetClass)
        );
    }
}
