//! Detection configuration loaded from TOML.
//!
//! ```toml
//! [[seed.blocks]]
//! entry_surge_rate = 10.0
//! min_trading_value = 5_000_000_000.0
//! exit_ma_period = 20
//!
//! [[seed.blocks]]
//! volume_ratio = 150.0
//! min_candles_after = 2
//! max_candles_after = 60
//! exit_ma_period = 20
//!
//! [tolerance]
//! price_range = 0.15
//! min_similarity_score = 0.7
//! ```
//!
//! TOML has no null: leaving a key out is how a threshold is switched off.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    condition::{ConditionSet, ToleranceConfig},
    BlockError, DetectionMode, Result,
};

/// Conditions for both modes plus redetection tolerance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectionConfig {
    pub seed: ConditionSet,
    #[serde(default)]
    pub redetection: Option<ConditionSet>,
    #[serde(default)]
    pub tolerance: Option<ToleranceConfig>,
}

impl DetectionConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BlockError::InvalidConfig(format!("read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| BlockError::InvalidConfig(format!("parse config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| BlockError::InvalidConfig(format!("serialize config TOML: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.seed.blocks.is_empty() {
            return Err(BlockError::MissingConditions(DetectionMode::Seed));
        }
        self.seed.validate()?;
        if let Some(redetection) = &self.redetection {
            redetection.validate()?;
        }
        if let Some(tolerance) = &self.tolerance {
            tolerance.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockLevel;

    const SAMPLE: &str = r#"
[[seed.blocks]]
entry_surge_rate = 10.0
exit_ma_period = 20

[[seed.blocks]]
volume_ratio = 150.0
min_candles_after = 2
max_candles_after = 60
lookback_min = 2
lookback_max = 150
exit_on_reversal = true

[[redetection.blocks]]
entry_surge_rate = 6.0

[tolerance]
price_range = 0.2
min_similarity_score = 0.65
min_detection_interval_days = 30
"#;

    #[test]
    fn test_parse_sample() {
        let config = DetectionConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.seed.depth(), 2);
        let block2 = config.seed.get(BlockLevel::Block2).unwrap();
        assert_eq!(block2.lookback_max, Some(150));
        assert!(block2.exit_on_reversal);
        assert!(block2.entry_surge_rate.is_none());

        let tolerance = config.tolerance.unwrap();
        assert_eq!(tolerance.price_range, 0.2);
        assert_eq!(tolerance.min_similarity_score.get(), 0.65);
        assert_eq!(tolerance.min_detection_interval_days, 30);
        // untouched keys keep their defaults
        assert_eq!(tolerance.time_range, ToleranceConfig::default().time_range);
        assert_eq!(config.redetection.unwrap().depth(), 1);
    }

    #[test]
    fn test_contradictory_pair_is_reported() {
        let toml = r#"
[[seed.blocks]]
entry_surge_rate = 10.0

[[seed.blocks]]
min_candles_after = 40
max_candles_after = 20
"#;
        let err = DetectionConfig::from_toml(toml).unwrap_err();
        assert!(err.is_config());
        let message = err.to_string();
        assert!(message.contains("block2"));
        assert!(message.contains("min_candles_after"));
        assert!(message.contains("max_candles_after"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let toml = r#"
[[seed.blocks]]
entry_surge = 10.0
"#;
        assert!(matches!(
            DetectionConfig::from_toml(toml),
            Err(BlockError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_period_rejected() {
        let toml = r#"
[[seed.blocks]]
exit_ma_period = 0
"#;
        assert!(DetectionConfig::from_toml(toml).is_err());
    }

    #[test]
    fn test_missing_seed_blocks() {
        let toml = "[seed]\nblocks = []\n";
        assert_eq!(
            DetectionConfig::from_toml(toml).unwrap_err(),
            BlockError::MissingConditions(DetectionMode::Seed)
        );
    }

    #[test]
    fn test_toml_round_trip_keeps_absent_thresholds_absent() {
        let config = DetectionConfig::from_toml(SAMPLE).unwrap();
        let text = config.to_toml().unwrap();
        let back = DetectionConfig::from_toml(&text).unwrap();
        assert_eq!(back, config);
    }
}
