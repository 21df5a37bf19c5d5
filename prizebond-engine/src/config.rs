use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use prizebond_db::models::{PrizeColumn, DIGIT_WIDTH};
use crate::error::{EngineError, Result};

/// Settings of the random forest that backs each digit position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features tried per split; `None` means ceil(sqrt(n_features)).
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 300,
            max_depth: 12,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: usize,
    pub z_threshold: f64,
    pub top_k: usize,
    pub digit_width: usize,
    /// Prize column mirrored by the un-prefixed alias features.
    pub default_prize: PrizeColumn,
    pub forest: ForestConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: 10,
            z_threshold: 2.0,
            top_k: 5,
            digit_width: DIGIT_WIDTH,
            default_prize: PrizeColumn::First,
            forest: ForestConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(invalid("window", "must be at least 1"));
        }
        if !self.z_threshold.is_finite() || self.z_threshold <= 0.0 {
            return Err(invalid(
                "z_threshold",
                format!("must be a positive number, got {}", self.z_threshold),
            ));
        }
        if self.top_k == 0 {
            return Err(invalid("top_k", "must be at least 1"));
        }
        if self.digit_width == 0 || self.digit_width > 18 {
            return Err(invalid(
                "digit_width",
                format!("must be in 1..=18, got {}", self.digit_width),
            ));
        }
        if self.forest.n_trees == 0 {
            return Err(invalid("forest.n_trees", "must be at least 1"));
        }
        if self.forest.min_samples_split < 2 {
            return Err(invalid("forest.min_samples_split", "must be at least 2"));
        }
        if self.forest.max_features == Some(0) {
            return Err(invalid("forest.max_features", "must be at least 1"));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&json)
            .with_context(|| format!("invalid JSON in {}", path.display()))?;
        Ok(config)
    }
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> EngineError {
    EngineError::InvalidConfig {
        parameter,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.window, 10);
        assert!((config.z_threshold - 2.0).abs() < 1e-12);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.digit_width, 6);
        assert_eq!(config.forest.n_trees, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = EngineConfig { window: 0, ..EngineConfig::default() };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig { parameter: "window", .. })
        ));
    }

    #[test]
    fn test_bad_threshold_rejected() {
        let config = EngineConfig { z_threshold: f64::NAN, ..EngineConfig::default() };
        assert!(config.validate().is_err());
        let config = EngineConfig { z_threshold: -1.0, ..EngineConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"window": 5, "default_prize": "second_prize_2", "forest": {"n_trees": 50}}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.window, 5);
        assert_eq!(config.default_prize, PrizeColumn::Second2);
        assert_eq!(config.forest.n_trees, 50);
        assert_eq!(config.forest.seed, 42);
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }
}
