//! Block conditions and redetection tolerance.
//!
//! Conditions are plain immutable values handed to every scan. A threshold
//! set to `None` is not checked; it never means zero.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    params::{
        check_known_keys, get_candles, get_flag, get_period, get_value, threshold_meta,
        Parameterized, ThresholdMeta, BLOCK_CONDITION_PARAMS,
    },
    BlockError, BlockLevel, Period, Ratio, Result,
};

/// Entry and exit thresholds for one block level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockCondition {
    // Entry
    pub entry_surge_rate: Option<f64>,
    pub entry_ma_period: Option<Period>,
    pub entry_max_deviation: Option<f64>,
    pub min_trading_value: Option<f64>,
    pub volume_high_days: Option<Period>,
    pub price_high_days: Option<Period>,
    pub min_start_interval_days: Option<usize>,

    // Relative to the predecessor (Block2 and up)
    pub volume_ratio: Option<f64>,
    pub low_price_margin: Option<f64>,
    pub min_candles_after: Option<usize>,
    pub max_candles_after: Option<usize>,
    pub lookback_min: Option<usize>,
    pub lookback_max: Option<usize>,

    // Exit
    pub exit_ma_period: Option<Period>,
    pub exit_on_reversal: bool,
    pub exit_on_body_mid: bool,
}

impl BlockCondition {
    fn numeric_fields(&self) -> [(&'static str, Option<f64>); 13] {
        [
            ("entry_surge_rate", self.entry_surge_rate),
            ("entry_ma_period", self.entry_ma_period.map(|p| p.get() as f64)),
            ("entry_max_deviation", self.entry_max_deviation),
            ("min_trading_value", self.min_trading_value),
            ("volume_high_days", self.volume_high_days.map(|p| p.get() as f64)),
            ("price_high_days", self.price_high_days.map(|p| p.get() as f64)),
            ("min_start_interval_days", self.min_start_interval_days.map(|v| v as f64)),
            ("volume_ratio", self.volume_ratio),
            ("low_price_margin", self.low_price_margin),
            ("min_candles_after", self.min_candles_after.map(|v| v as f64)),
            ("max_candles_after", self.max_candles_after.map(|v| v as f64)),
            ("lookback_min", self.lookback_min.map(|v| v as f64)),
            ("lookback_max", self.lookback_max.map(|v| v as f64)),
        ]
    }

    /// Windows (in bars) this condition reads from history.
    pub fn windows(&self) -> impl Iterator<Item = (&'static str, usize)> {
        [
            ("entry_ma_period", self.entry_ma_period),
            ("volume_high_days", self.volume_high_days),
            ("price_high_days", self.price_high_days),
            ("exit_ma_period", self.exit_ma_period),
        ]
        .into_iter()
        .filter_map(|(name, period)| period.map(|p| (name, p.get())))
    }

    /// Check ranges and contradictory pairs.
    pub fn validate(&self, level: BlockLevel) -> Result<()> {
        for (name, value) in self.numeric_fields() {
            if let (Some(value), Some(meta)) = (value, threshold_meta(name)) {
                meta.validate(value)?;
            }
        }

        check_pair(
            level,
            ("min_candles_after", self.min_candles_after),
            ("max_candles_after", self.max_candles_after),
        )?;
        check_pair(
            level,
            ("lookback_min", self.lookback_min),
            ("lookback_max", self.lookback_max),
        )?;

        if self.entry_max_deviation.is_some() && self.entry_ma_period.is_none() {
            return Err(BlockError::InvalidConfig(format!(
                "{level}: entry_max_deviation requires entry_ma_period"
            )));
        }

        if level == BlockLevel::Block1 && self.has_predecessor_thresholds() {
            tracing::warn!("{level}: predecessor thresholds are ignored on the root level");
        }
        Ok(())
    }

    fn has_predecessor_thresholds(&self) -> bool {
        self.volume_ratio.is_some()
            || self.low_price_margin.is_some()
            || self.min_candles_after.is_some()
            || self.max_candles_after.is_some()
            || self.lookback_min.is_some()
            || self.lookback_max.is_some()
    }
}

fn check_pair(
    level: BlockLevel,
    (lower, lower_value): (&'static str, Option<usize>),
    (upper, upper_value): (&'static str, Option<usize>),
) -> Result<()> {
    match (lower_value, upper_value) {
        (Some(lo), Some(hi)) if lo > hi => Err(BlockError::Contradictory {
            level,
            lower,
            lower_value: lo as f64,
            upper,
            upper_value: hi as f64,
        }),
        _ => Ok(()),
    }
}

impl Parameterized for BlockCondition {
    fn param_meta() -> &'static [ThresholdMeta] {
        BLOCK_CONDITION_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        check_known_keys(params, Self::param_meta())?;
        Ok(Self {
            entry_surge_rate: get_value(params, "entry_surge_rate")?,
            entry_ma_period: get_period(params, "entry_ma_period")?,
            entry_max_deviation: get_value(params, "entry_max_deviation")?,
            min_trading_value: get_value(params, "min_trading_value")?,
            volume_high_days: get_period(params, "volume_high_days")?,
            price_high_days: get_period(params, "price_high_days")?,
            min_start_interval_days: get_candles(params, "min_start_interval_days")?,
            volume_ratio: get_value(params, "volume_ratio")?,
            low_price_margin: get_value(params, "low_price_margin")?,
            min_candles_after: get_candles(params, "min_candles_after")?,
            max_candles_after: get_candles(params, "max_candles_after")?,
            lookback_min: get_candles(params, "lookback_min")?,
            lookback_max: get_candles(params, "lookback_max")?,
            exit_ma_period: get_period(params, "exit_ma_period")?,
            exit_on_reversal: get_flag(params, "exit_on_reversal")?,
            exit_on_body_mid: get_flag(params, "exit_on_body_mid")?,
        })
    }
}

// ============================================================
// CONDITION SET
// ============================================================

/// Conditions for levels Block1..=BlockN of one mode. The number of entries
/// is the maximum chain depth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionSet {
    pub blocks: Vec<BlockCondition>,
}

impl ConditionSet {
    pub fn new(blocks: Vec<BlockCondition>) -> Self {
        Self { blocks }
    }

    /// Block1 only.
    pub fn single(condition: BlockCondition) -> Self {
        Self::new(vec![condition])
    }

    /// Build from one preset row per level, Block1 first.
    pub fn from_rows(rows: &[HashMap<&str, f64>]) -> Result<Self> {
        rows.iter()
            .map(BlockCondition::with_params)
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.blocks.len()
    }

    pub fn get(&self, level: BlockLevel) -> Option<&BlockCondition> {
        self.blocks.get(level.index())
    }

    /// Configured levels with their conditions, Block1 first.
    pub fn levels(&self) -> impl Iterator<Item = (BlockLevel, &BlockCondition)> {
        BlockLevel::ALL.into_iter().zip(self.blocks.iter())
    }

    pub fn validate(&self) -> Result<()> {
        if self.blocks.is_empty() {
            return Err(BlockError::InvalidConfig("no block levels configured".into()));
        }
        if self.blocks.len() > BlockLevel::ALL.len() {
            return Err(BlockError::InvalidConfig(format!(
                "{} block levels configured, at most 4 supported",
                self.blocks.len()
            )));
        }
        for (level, condition) in self.levels() {
            condition.validate(level)?;
        }
        Ok(())
    }

    /// Fail when a configured window can never be satisfied on a series of
    /// `available` bars.
    pub fn validate_against(&self, available: usize) -> Result<()> {
        for (level, condition) in self.levels() {
            for (field, window) in condition.windows() {
                if window > available {
                    return Err(BlockError::WindowExceedsData {
                        level,
                        field,
                        window,
                        available,
                    });
                }
            }
        }
        Ok(())
    }
}

// ============================================================
// TOLERANCE
// ============================================================

/// How far a redetection candidate may deviate from the seed's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToleranceConfig {
    /// Maximum DTW distance of normalized closes.
    pub price_range: f64,
    /// Maximum DTW distance of normalized volumes.
    pub volume_range: f64,
    /// Allowed length deviation as a fraction of the seed duration.
    pub time_range: f64,
    pub weight_price: Ratio,
    pub weight_volume: Ratio,
    pub weight_timing: Ratio,
    pub min_similarity_score: Ratio,
    /// Minimum bars between the starts of two accepted matches.
    pub min_detection_interval_days: usize,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            price_range: 0.15,
            volume_range: 1.0,
            time_range: 0.2,
            weight_price: Ratio::new_const(0.5),
            weight_volume: Ratio::new_const(0.3),
            weight_timing: Ratio::new_const(0.2),
            min_similarity_score: Ratio::new_const(0.7),
            min_detection_interval_days: 20,
        }
    }
}

impl ToleranceConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("price_range", self.price_range),
            ("volume_range", self.volume_range),
            ("time_range", self.time_range),
        ] {
            if !value.is_finite() {
                return Err(BlockError::InvalidValue("tolerance ranges must be finite"));
            }
            if value < 0.0 {
                return Err(BlockError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: f64::INFINITY,
                });
            }
        }
        Ok(())
    }

    /// Candle deviation allowed around a seed of `duration` bars.
    pub fn allowed_delta(&self, duration: usize) -> usize {
        (duration as f64 * self.time_range).floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_condition_checks_nothing() {
        let c = BlockCondition::default();
        assert!(c.validate(BlockLevel::Block1).is_ok());
        assert_eq!(c.windows().count(), 0);
    }

    #[test]
    fn test_contradictory_forward_window() {
        let c = BlockCondition {
            min_candles_after: Some(30),
            max_candles_after: Some(10),
            ..Default::default()
        };
        let err = c.validate(BlockLevel::Block2).unwrap_err();
        assert_eq!(
            err,
            BlockError::Contradictory {
                level: BlockLevel::Block2,
                lower: "min_candles_after",
                lower_value: 30.0,
                upper: "max_candles_after",
                upper_value: 10.0,
            }
        );
    }

    #[test]
    fn test_contradictory_lookback() {
        let c = BlockCondition {
            lookback_min: Some(200),
            lookback_max: Some(150),
            ..Default::default()
        };
        assert!(matches!(
            c.validate(BlockLevel::Block3),
            Err(BlockError::Contradictory { lower: "lookback_min", .. })
        ));
    }

    #[test]
    fn test_equal_bounds_are_fine() {
        let c = BlockCondition {
            lookback_min: Some(5),
            lookback_max: Some(5),
            ..Default::default()
        };
        assert!(c.validate(BlockLevel::Block2).is_ok());
    }

    #[test]
    fn test_out_of_range_threshold() {
        let c = BlockCondition {
            low_price_margin: Some(150.0),
            ..Default::default()
        };
        assert!(matches!(
            c.validate(BlockLevel::Block2),
            Err(BlockError::OutOfRange { field: "low_price_margin", .. })
        ));
        let nan = BlockCondition {
            entry_surge_rate: Some(f64::NAN),
            ..Default::default()
        };
        assert!(nan.validate(BlockLevel::Block1).is_err());
    }

    #[test]
    fn test_deviation_requires_ma() {
        let c = BlockCondition {
            entry_max_deviation: Some(120.0),
            ..Default::default()
        };
        assert!(matches!(
            c.validate(BlockLevel::Block1),
            Err(BlockError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_condition_set_depth_limits() {
        assert!(ConditionSet::default().validate().is_err());
        let five = ConditionSet::new(vec![BlockCondition::default(); 5]);
        assert!(five.validate().is_err());
        let four = ConditionSet::new(vec![BlockCondition::default(); 4]);
        assert!(four.validate().is_ok());
        assert_eq!(four.levels().last().map(|(l, _)| l), Some(BlockLevel::Block4));
    }

    #[test]
    fn test_window_exceeds_data() {
        let set = ConditionSet::single(BlockCondition {
            exit_ma_period: Some(Period::new(60).unwrap()),
            ..Default::default()
        });
        assert!(set.validate_against(60).is_ok());
        let err = set.validate_against(59).unwrap_err();
        assert!(err.is_config());
        assert!(matches!(err, BlockError::WindowExceedsData { field: "exit_ma_period", .. }));
    }

    #[test]
    fn test_from_rows() {
        let mut b1 = HashMap::new();
        b1.insert("entry_surge_rate", 10.0);
        b1.insert("exit_ma_period", 5.0);
        let mut b2 = HashMap::new();
        b2.insert("volume_ratio", 150.0);
        b2.insert("max_candles_after", 40.0);
        b2.insert("exit_on_reversal", 1.0);

        let set = ConditionSet::from_rows(&[b1, b2]).unwrap();
        assert_eq!(set.depth(), 2);
        let block2 = set.get(BlockLevel::Block2).unwrap();
        assert_eq!(block2.volume_ratio, Some(150.0));
        assert_eq!(block2.max_candles_after, Some(40));
        assert!(block2.exit_on_reversal);
        assert!(block2.entry_surge_rate.is_none());
    }

    #[test]
    fn test_with_params_rejects_bad_period() {
        let mut row = HashMap::new();
        row.insert("entry_ma_period", 0.0);
        assert!(BlockCondition::with_params(&row).is_err());
    }

    #[test]
    fn test_tolerance_defaults_and_delta() {
        let t = ToleranceConfig::default();
        assert!(t.validate().is_ok());
        assert_eq!(t.allowed_delta(50), 10);
        assert_eq!(t.allowed_delta(4), 0);
        let bad = ToleranceConfig {
            price_range: -0.1,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
