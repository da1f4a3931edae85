//! Threshold metadata for block conditions
//!
//! This module describes every configurable [`BlockCondition`] threshold,
//! enabling:
//! - Range validation of loaded configurations
//! - Building conditions from flat preset rows (one `name -> value` map per
//!   block level, absent key = threshold not checked)
//! - Parameter documentation
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use blockscan::prelude::*;
//!
//! let mut row = HashMap::new();
//! row.insert("entry_surge_rate", 8.0);
//! row.insert("exit_ma_period", 5.0);
//!
//! let condition = BlockCondition::with_params(&row).unwrap();
//! assert_eq!(condition.entry_surge_rate, Some(8.0));
//! assert!(condition.volume_ratio.is_none());
//! ```
//!
//! [`BlockCondition`]: crate::condition::BlockCondition

use std::collections::HashMap;

use crate::{BlockError, Period, Result};

// ============================================================
// THRESHOLD TYPES
// ============================================================

/// Kind of threshold value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdKind {
  /// Percentage value (e.g. 8.0 = 8%)
  Percent,
  /// Currency amount
  Amount,
  /// Window length in bars, must be > 0
  Period,
  /// Candle count, may be 0
  Candles,
  /// On/off switch, 0.0 or 1.0 in preset rows
  Flag,
}

/// Metadata for a single condition threshold
#[derive(Debug, Clone)]
pub struct ThresholdMeta {
  /// Field name (e.g., "entry_surge_rate")
  pub name: &'static str,
  /// Value kind
  pub kind: ThresholdKind,
  /// Accepted range: (min, max)
  pub range: (f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ThresholdMeta {
  pub const fn new(
    name: &'static str,
    kind: ThresholdKind,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, kind, range, description }
  }

  /// Validate a value for this threshold
  pub fn validate(&self, value: f64) -> Result<()> {
    if !value.is_finite() {
      return Err(BlockError::InvalidValue("threshold must be finite"));
    }
    let (min, max) = self.range;
    if value < min || value > max {
      return Err(BlockError::OutOfRange { field: self.name, value, min, max });
    }
    match self.kind {
      ThresholdKind::Percent | ThresholdKind::Amount => Ok(()),
      ThresholdKind::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(BlockError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ThresholdKind::Candles => {
        if value.fract() != 0.0 {
          return Err(BlockError::InvalidValue("Candle count must be an integer"));
        }
        Ok(())
      },
      ThresholdKind::Flag => {
        if value != 0.0 && value != 1.0 {
          return Err(BlockError::InvalidValue("Flag must be 0 or 1"));
        }
        Ok(())
      },
    }
  }
}

const MAX_CANDLES: f64 = 10_000.0;

/// Every threshold a `BlockCondition` carries.
pub const BLOCK_CONDITION_PARAMS: &[ThresholdMeta] = &[
  ThresholdMeta::new(
    "entry_surge_rate",
    ThresholdKind::Percent,
    (0.0, 1_000.0),
    "Minimum close-over-previous-close rise in percent",
  ),
  ThresholdMeta::new(
    "entry_ma_period",
    ThresholdKind::Period,
    (1.0, MAX_CANDLES),
    "Close must be at or above this moving average",
  ),
  ThresholdMeta::new(
    "entry_max_deviation",
    ThresholdKind::Percent,
    (100.0, 10_000.0),
    "Maximum close / entry MA ratio in percent",
  ),
  ThresholdMeta::new(
    "min_trading_value",
    ThresholdKind::Amount,
    (0.0, 1e18),
    "Minimum close x volume on the entry bar",
  ),
  ThresholdMeta::new(
    "volume_high_days",
    ThresholdKind::Period,
    (1.0, MAX_CANDLES),
    "Entry volume must exceed every volume of this many prior bars",
  ),
  ThresholdMeta::new(
    "price_high_days",
    ThresholdKind::Period,
    (1.0, MAX_CANDLES),
    "Entry high must exceed every high of this many prior bars",
  ),
  ThresholdMeta::new(
    "min_start_interval_days",
    ThresholdKind::Candles,
    (0.0, MAX_CANDLES),
    "Minimum bars since the previous start of the same level",
  ),
  ThresholdMeta::new(
    "volume_ratio",
    ThresholdKind::Percent,
    (0.0, 1_000_000.0),
    "Entry volume relative to the predecessor's entry volume, in percent",
  ),
  ThresholdMeta::new(
    "low_price_margin",
    ThresholdKind::Percent,
    (0.0, 100.0),
    "Entry low may sit at most this percent below the predecessor's peak high",
  ),
  ThresholdMeta::new(
    "min_candles_after",
    ThresholdKind::Candles,
    (0.0, MAX_CANDLES),
    "Minimum bars from predecessor start",
  ),
  ThresholdMeta::new(
    "max_candles_after",
    ThresholdKind::Candles,
    (0.0, MAX_CANDLES),
    "Maximum bars from predecessor start",
  ),
  ThresholdMeta::new(
    "lookback_min",
    ThresholdKind::Candles,
    (0.0, MAX_CANDLES),
    "Minimum bars looking back from the candidate to its predecessor",
  ),
  ThresholdMeta::new(
    "lookback_max",
    ThresholdKind::Candles,
    (0.0, MAX_CANDLES),
    "Maximum bars looking back from the candidate to its predecessor",
  ),
  ThresholdMeta::new(
    "exit_ma_period",
    ThresholdKind::Period,
    (1.0, MAX_CANDLES),
    "Exit when close falls below this moving average",
  ),
  ThresholdMeta::new(
    "exit_on_reversal",
    ThresholdKind::Flag,
    (0.0, 1.0),
    "Exit on a bearish engulfing bar",
  ),
  ThresholdMeta::new(
    "exit_on_body_mid",
    ThresholdKind::Flag,
    (0.0, 1.0),
    "Exit when close falls below the entry bar's body midpoint",
  ),
];

/// Look up metadata by field name.
pub fn threshold_meta(name: &str) -> Option<&'static ThresholdMeta> {
  BLOCK_CONDITION_PARAMS.iter().find(|m| m.name == name)
}

// ============================================================
// PARAMETERIZED TRAIT
// ============================================================

/// Types that can be built from a flat `name -> value` row.
pub trait Parameterized: Sized {
  /// Returns metadata for all configurable thresholds
  fn param_meta() -> &'static [ThresholdMeta];

  /// Creates a value from a preset row.
  ///
  /// Missing keys leave the threshold absent. Unknown keys are rejected.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

// ============================================================
// PRESET ROW HELPERS
// ============================================================

/// Reject keys that no threshold answers to.
pub fn check_known_keys(params: &HashMap<&str, f64>, meta: &[ThresholdMeta]) -> Result<()> {
  let mut unknown: Vec<&str> =
    params.keys().copied().filter(|k| !meta.iter().any(|m| m.name == *k)).collect();
  if unknown.is_empty() {
    return Ok(());
  }
  unknown.sort_unstable();
  Err(BlockError::InvalidConfig(format!("unknown thresholds: {}", unknown.join(", "))))
}

fn checked(params: &HashMap<&str, f64>, key: &'static str) -> Result<Option<f64>> {
  let Some(value) = params.get(key).copied() else {
    return Ok(None);
  };
  if let Some(meta) = threshold_meta(key) {
    meta.validate(value)?;
  }
  Ok(Some(value))
}

/// Optional percentage or amount threshold
pub fn get_value(params: &HashMap<&str, f64>, key: &'static str) -> Result<Option<f64>> {
  checked(params, key)
}

/// Optional window length
pub fn get_period(params: &HashMap<&str, f64>, key: &'static str) -> Result<Option<Period>> {
  checked(params, key)?.map(|v| Period::new(v as usize)).transpose()
}

/// Optional candle count
pub fn get_candles(params: &HashMap<&str, f64>, key: &'static str) -> Result<Option<usize>> {
  Ok(checked(params, key)?.map(|v| v as usize))
}

/// Flag, absent = off
pub fn get_flag(params: &HashMap<&str, f64>, key: &'static str) -> Result<bool> {
  Ok(checked(params, key)? == Some(1.0))
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_every_name_is_unique() {
    for (i, a) in BLOCK_CONDITION_PARAMS.iter().enumerate() {
      for b in &BLOCK_CONDITION_PARAMS[i + 1..] {
        assert_ne!(a.name, b.name);
      }
    }
  }

  #[test]
  fn test_validate_percent() {
    let meta = threshold_meta("low_price_margin").unwrap();
    assert!(meta.validate(0.0).is_ok());
    assert!(meta.validate(100.0).is_ok());
    assert!(meta.validate(-1.0).is_err());
    assert!(meta.validate(101.0).is_err());
    assert!(meta.validate(f64::NAN).is_err());
  }

  #[test]
  fn test_validate_period() {
    let meta = threshold_meta("exit_ma_period").unwrap();
    assert!(meta.validate(20.0).is_ok());
    assert!(meta.validate(0.0).is_err());
    assert!(meta.validate(2.5).is_err());
  }

  #[test]
  fn test_validate_flag() {
    let meta = threshold_meta("exit_on_reversal").unwrap();
    assert!(meta.validate(1.0).is_ok());
    assert!(meta.validate(0.5).is_err());
  }

  #[test]
  fn test_row_helpers() {
    let mut params = HashMap::new();
    params.insert("exit_ma_period", 20.0);
    params.insert("lookback_max", 150.0);
    params.insert("exit_on_body_mid", 1.0);

    assert_eq!(get_period(&params, "exit_ma_period").unwrap().map(Period::get), Some(20));
    assert_eq!(get_period(&params, "entry_ma_period").unwrap(), None);
    assert_eq!(get_candles(&params, "lookback_max").unwrap(), Some(150));
    assert!(get_flag(&params, "exit_on_body_mid").unwrap());
    assert!(!get_flag(&params, "exit_on_reversal").unwrap());
    assert_eq!(get_value(&params, "volume_ratio").unwrap(), None);
  }

  #[test]
  fn test_unknown_keys_rejected() {
    let mut params = HashMap::new();
    params.insert("entry_surge_rate", 5.0);
    params.insert("surge", 5.0);
    let err = check_known_keys(&params, BLOCK_CONDITION_PARAMS).unwrap_err();
    assert_eq!(err, BlockError::InvalidConfig("unknown thresholds: surge".into()));
  }
}
