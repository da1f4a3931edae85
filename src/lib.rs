//! # blockscan - momentum block chain detection
//!
//! Detects multi-stage "block" chains in daily OHLCV series: an initial
//! momentum event (Block1) optionally followed by successor events
//! (Block2 -> Block3 -> Block4), each gated by its own entry/exit thresholds.
//! A detected seed chain can then be used as a shape template to find similar
//! chains elsewhere in history (redetection, DTW based).
//!
//! ## Quick Start
//!
//! ```rust
//! use blockscan::prelude::*;
//! use chrono::{Days, NaiveDate};
//!
//! let first = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! let bars: Vec<Bar> = (0..40u64)
//!     .map(|i| {
//!         let date = first.checked_add_days(Days::new(i)).unwrap();
//!         let c = 100.0 + (i % 7) as f64;
//!         Bar::new(date, c - 1.0, c + 1.0, c - 2.0, c, 1_000.0)
//!     })
//!     .collect();
//! let series = Series::new("005930", bars).unwrap();
//!
//! let block1 = BlockCondition {
//!     entry_surge_rate: Some(5.0),
//!     exit_ma_period: Some(Period::new(5).unwrap()),
//!     ..Default::default()
//! };
//!
//! let engine = EngineBuilder::new()
//!     .seed_conditions(ConditionSet::new(vec![block1]))
//!     .build()
//!     .unwrap();
//!
//! let chains = engine.detect_seeds(&series).unwrap();
//! for chain in &chains {
//!     assert!(chain.root().ended_at >= chain.root().started_at);
//! }
//! ```

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod condition;
pub mod config;
pub mod detection;
pub mod params;
pub mod redetection;
pub mod series;

pub mod prelude {
    pub use crate::{
        // Configuration
        condition::{BlockCondition, ConditionSet, ToleranceConfig},
        config::DetectionConfig,
        // Components
        detection::{ChainDetector, EntryLink, OpenBlock, PeakState},
        params::{Parameterized, ThresholdKind, ThresholdMeta},
        redetection::{BlockShape, SeedShape, SimilarityMatcher},
        // Parallel
        redetect_parallel,
        scan_parallel,
        series::{RollingContext, Series},
        // Types
        Bar,
        BlockDetection,
        // Errors
        BlockError,
        BlockId,
        BlockLevel,
        // Engine
        BlockEngine,
        Chain,
        DetectionMode,
        EngineBuilder,
        ExitReason,
        // Core traits
        OHLCVExt,
        Period,
        Provenance,
        Ratio,
        RedetectJob,
        Result,
        ScanError,
        ScanResult,
        SeedId,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, BlockError>;

/// Errors raised while configuring or running a scan.
///
/// Configuration errors abort the scan for the affected ticker and mode.
/// `InsufficientData` and `Validation` are local: the scanner skips the
/// affected bar or candidate and keeps going.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlockError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Contradictory thresholds for {level}: {lower} = {lower_value} > {upper} = {upper_value}")]
    Contradictory {
        level: BlockLevel,
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },

    #[error("{field} for {level} needs {window} bars, series has {available}")]
    WindowExceedsData {
        level: BlockLevel,
        field: &'static str,
        window: usize,
        available: usize,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("No conditions configured for {0} mode")]
    MissingConditions(DetectionMode),

    #[error("Insufficient data at index {index}: need {need} bars, got {got}")]
    InsufficientData { index: usize, need: usize, got: usize },

    #[error("Cannot compare shapes: {0}")]
    Validation(String),

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },

    #[error("{0} is not a trading day of the series")]
    UnknownDate(NaiveDate),
}

impl BlockError {
    /// True for errors caused by threshold configuration. These are fatal to
    /// a scan and are never retried.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            BlockError::InvalidValue(_)
                | BlockError::OutOfRange { .. }
                | BlockError::Contradictory { .. }
                | BlockError::WindowExceedsData { .. }
                | BlockError::InvalidConfig(_)
                | BlockError::MissingConditions(_)
        )
    }

    /// True for errors the scanners absorb locally.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            BlockError::InsufficientData { .. } | BlockError::Validation(_)
        )
    }
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(BlockError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(BlockError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Window length in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(BlockError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// Midpoint of the real body.
    #[inline]
    fn body_mid(&self) -> f64 {
        (self.open() + self.close()) / 2.0
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Close times volume.
    #[inline]
    fn trading_value(&self) -> f64 {
        self.close() * self.volume()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let values = [self.open(), self.high(), self.low(), self.close(), self.volume()];
        if values.iter().any(|v| v.is_nan()) {
            return Err(BlockError::InvalidBar {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if values.iter().any(|v| v.is_infinite()) {
            return Err(BlockError::InvalidBar {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(BlockError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        if self.open() < self.low() || self.open() > self.high() {
            return Err(BlockError::InvalidBar {
                index: 0,
                reason: "open outside [low, high]",
            });
        }
        if self.close() < self.low() || self.close() > self.high() {
            return Err(BlockError::InvalidBar {
                index: 0,
                reason: "close outside [low, high]",
            });
        }
        if self.volume() < 0.0 {
            return Err(BlockError::InvalidBar {
                index: 0,
                reason: "negative volume",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// One daily trading-day bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

// ============================================================
// DETECTION RECORDS
// ============================================================

/// Stage of a block chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum BlockLevel {
    Block1 = 1,
    Block2 = 2,
    Block3 = 3,
    Block4 = 4,
}

impl BlockLevel {
    pub const ALL: [BlockLevel; 4] = [
        BlockLevel::Block1,
        BlockLevel::Block2,
        BlockLevel::Block3,
        BlockLevel::Block4,
    ];

    /// Level for a zero-based position (0 -> Block1).
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Zero-based position (Block1 -> 0).
    #[inline]
    pub fn index(self) -> usize {
        self as usize - 1
    }

    #[inline]
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn prev(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }
}

impl fmt::Display for BlockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block{}", self.number())
    }
}

impl From<BlockLevel> for u8 {
    fn from(level: BlockLevel) -> Self {
        level.number()
    }
}

impl TryFrom<u8> for BlockLevel {
    type Error = BlockError;

    fn try_from(value: u8) -> Result<Self> {
        (value as usize)
            .checked_sub(1)
            .and_then(Self::from_index)
            .ok_or(BlockError::InvalidValue("block level must be 1..=4"))
    }
}

/// Why a block was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Close fell below the exit moving average.
    MaBreak,
    /// Bearish engulfing bar.
    Reversal,
    /// Close fell below the midpoint of the entry bar's body.
    BodyMidBreach,
    /// The next level opened while this block was open.
    SuccessorStarted,
    /// Series exhausted with the block still open.
    DataEnd,
    /// Last block of a redetected chain.
    MatchEnd,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::MaBreak => "ma_break",
            ExitReason::Reversal => "reversal",
            ExitReason::BodyMidBreach => "body_mid_breach",
            ExitReason::SuccessorStarted => "successor_started",
            ExitReason::DataEnd => "data_end",
            ExitReason::MatchEnd => "match_end",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a block, unique among the chains returned by one
/// detection or redetection call and numbered from 0 in each call.
///
/// Ids from different calls may repeat; a stored block is identified by its
/// chain's ticker and provenance together with the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub usize);

/// A finalized block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDetection {
    pub id: BlockId,
    pub ticker: String,
    pub level: BlockLevel,
    pub started_at: NaiveDate,
    pub ended_at: NaiveDate,
    pub peak_price: f64,
    pub peak_volume: f64,
    pub peak_date: NaiveDate,
    /// Close of the entry bar.
    pub entry_close: f64,
    /// Volume of the entry bar.
    pub entry_volume: f64,
    pub exit_reason: ExitReason,
    pub predecessor_id: Option<BlockId>,
}

/// Scan mode that produced a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    Seed,
    Redetection,
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionMode::Seed => f.write_str("seed"),
            DetectionMode::Redetection => f.write_str("redetection"),
        }
    }
}

/// Stable reference to a seed chain: `"{ticker}@{root start date}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedId(pub String);

impl fmt::Display for SeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a chain came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub mode: DetectionMode,
    /// Similarity score, redetection only.
    pub score: Option<f64>,
    /// Seed the chain was matched against, redetection only.
    pub seed_reference: Option<SeedId>,
}

impl Provenance {
    pub fn seed() -> Self {
        Self {
            mode: DetectionMode::Seed,
            score: None,
            seed_reference: None,
        }
    }

    pub fn redetection(score: f64, seed_reference: SeedId) -> Self {
        Self {
            mode: DetectionMode::Redetection,
            score: Some(score),
            seed_reference: Some(seed_reference),
        }
    }
}

/// Blocks linked by predecessor references, Block1 first.
///
/// Levels are 1, 2, ... without gaps and each level appears once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub ticker: String,
    pub blocks: Vec<BlockDetection>,
    pub provenance: Provenance,
}

impl Chain {
    /// The Block1 record. Chains are never empty.
    pub fn root(&self) -> &BlockDetection {
        &self.blocks[0]
    }

    /// Deepest block of the chain.
    pub fn last(&self) -> &BlockDetection {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, level: BlockLevel) -> Option<&BlockDetection> {
        self.blocks.get(level.index())
    }

    /// First and last date covered by the chain.
    pub fn span(&self) -> (NaiveDate, NaiveDate) {
        let end = self
            .blocks
            .iter()
            .map(|b| b.ended_at)
            .max()
            .unwrap_or(self.root().ended_at);
        (self.root().started_at, end)
    }

    pub fn seed_id(&self) -> SeedId {
        SeedId(format!("{}@{}", self.ticker, self.root().started_at))
    }

    pub fn mode(&self) -> DetectionMode {
        self.provenance.mode
    }

    /// Check the structural invariants: non-empty, levels 1..=n in order,
    /// each block linked to the one before it, `ended_at >= started_at`.
    pub fn check_structure(&self) -> Result<()> {
        if self.blocks.is_empty() {
            return Err(BlockError::Validation("empty chain".into()));
        }
        for (i, block) in self.blocks.iter().enumerate() {
            if block.level.index() != i {
                return Err(BlockError::Validation(format!(
                    "{} at position {i}",
                    block.level
                )));
            }
            if block.ended_at < block.started_at {
                return Err(BlockError::Validation(format!(
                    "{} ends {} before it starts {}",
                    block.level, block.ended_at, block.started_at
                )));
            }
            let expected = i.checked_sub(1).map(|p| self.blocks[p].id);
            if block.predecessor_id != expected {
                return Err(BlockError::Validation(format!(
                    "{} is not linked to its predecessor",
                    block.level
                )));
            }
        }
        Ok(())
    }
}

// ============================================================
// BLOCK ENGINE
// ============================================================

use condition::{ConditionSet, ToleranceConfig};
use config::DetectionConfig;
use detection::ChainDetector;
use redetection::{SeedShape, SimilarityMatcher};
use series::Series;

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub validate_data: bool,
}

/// Entry point tying the seed detector and the similarity matcher to one
/// validated configuration.
#[derive(Debug, Clone)]
pub struct BlockEngine {
    seed: ConditionSet,
    redetection: Option<ConditionSet>,
    tolerance: Option<ToleranceConfig>,
    config: EngineConfig,
}

impl BlockEngine {
    pub fn seed_conditions(&self) -> &ConditionSet {
        &self.seed
    }

    pub fn redetection_conditions(&self) -> Option<&ConditionSet> {
        self.redetection.as_ref()
    }

    pub fn tolerance(&self) -> Option<&ToleranceConfig> {
        self.tolerance.as_ref()
    }

    /// Run seed detection over one ticker.
    pub fn detect_seeds(&self, series: &Series) -> Result<Vec<Chain>> {
        if self.config.validate_data {
            series.validate()?;
        }
        ChainDetector::new(&self.seed).detect(series)
    }

    /// Normalized shape of a seed chain found in `seed_series`.
    pub fn seed_shape(&self, seed: &Chain, seed_series: &Series) -> Result<SeedShape> {
        redetection::normalize(seed, seed_series)
    }

    /// Search `target` for chains shaped like `seed`.
    pub fn redetect(&self, seed: &Chain, seed_series: &Series, target: &Series) -> Result<Vec<Chain>> {
        let tolerance = self
            .tolerance
            .as_ref()
            .ok_or(BlockError::MissingConditions(DetectionMode::Redetection))?;
        if self.config.validate_data {
            target.validate()?;
        }
        let shape = self.seed_shape(seed, seed_series)?;
        let mut matcher = SimilarityMatcher::new(seed, &shape, tolerance);
        if let Some(entry) = &self.redetection {
            matcher = matcher.with_entry_conditions(entry);
        }
        matcher.find_matches(target)
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating BlockEngine instances
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    seed: Option<ConditionSet>,
    redetection: Option<ConditionSet>,
    tolerance: Option<ToleranceConfig>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded configuration file.
    pub fn from_config(config: DetectionConfig) -> Self {
        Self {
            seed: Some(config.seed),
            redetection: config.redetection,
            tolerance: config.tolerance,
            config: EngineConfig::default(),
        }
    }

    /// Strict conditions used for seed detection
    pub fn seed_conditions(mut self, conditions: ConditionSet) -> Self {
        self.seed = Some(conditions);
        self
    }

    /// Relaxed conditions gating redetection candidate starts
    pub fn redetection_conditions(mut self, conditions: ConditionSet) -> Self {
        self.redetection = Some(conditions);
        self
    }

    /// Shape tolerance for redetection
    pub fn tolerance(mut self, tolerance: ToleranceConfig) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Enable/disable bar validation before every scan
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Build the engine, checking every configured threshold eagerly.
    pub fn build(self) -> Result<BlockEngine> {
        let seed = self
            .seed
            .ok_or(BlockError::MissingConditions(DetectionMode::Seed))?;
        seed.validate()?;
        if let Some(redetection) = &self.redetection {
            redetection.validate()?;
        }
        if let Some(tolerance) = &self.tolerance {
            tolerance.validate()?;
        }
        Ok(BlockEngine {
            seed,
            redetection: self.redetection,
            tolerance: self.tolerance,
            config: self.config,
        })
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub ticker: String,
    pub chains: Vec<Chain>,
}

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub ticker: String,
    pub error: BlockError,
}

/// One redetection unit of work: a seed, the series it was found in, and
/// the series to search.
#[derive(Debug, Clone, Copy)]
pub struct RedetectJob<'a> {
    pub seed: &'a Chain,
    pub seed_series: &'a Series,
    pub target: &'a Series,
}

fn partition(results: Vec<std::result::Result<ScanResult, ScanError>>) -> (Vec<ScanResult>, Vec<ScanError>) {
    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

/// Seed detection over many tickers in parallel
pub fn scan_parallel<'a, I>(engine: &BlockEngine, instruments: I) -> (Vec<ScanResult>, Vec<ScanError>)
where
    I: IntoParallelIterator<Item = &'a Series>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|series| {
            engine
                .detect_seeds(series)
                .map(|chains| ScanResult {
                    ticker: series.ticker().to_string(),
                    chains,
                })
                .map_err(|error| ScanError {
                    ticker: series.ticker().to_string(),
                    error,
                })
        })
        .collect();

    partition(results)
}

/// Redetection for many seeds in parallel. Each job owns its matcher state.
pub fn redetect_parallel<'a, I>(engine: &BlockEngine, jobs: I) -> (Vec<ScanResult>, Vec<ScanError>)
where
    I: IntoParallelIterator<Item = RedetectJob<'a>>,
{
    let results: Vec<_> = jobs
        .into_par_iter()
        .map(|job| {
            engine
                .redetect(job.seed, job.seed_series, job.target)
                .map(|chains| ScanResult {
                    ticker: job.target.ticker().to_string(),
                    chains,
                })
                .map_err(|error| ScanError {
                    ticker: job.target.ticker().to_string(),
                    error,
                })
        })
        .collect();

    partition(results)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{Days, NaiveDate};

    use crate::{series::Series, Bar};

    pub fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(i as u64))
            .unwrap()
    }

    /// Quiet bar: small body around `close`, fixed volume.
    pub fn flat(i: usize, close: f64) -> Bar {
        Bar::new(day(i), close, close + 0.5, close - 0.5, close, 1_000.0)
    }

    pub fn series_from(bars: Vec<Bar>) -> Series {
        Series::new("TEST", bars).unwrap()
    }

    /// `n` quiet bars at 100.0.
    pub fn flat_series(n: usize) -> Vec<Bar> {
        (0..n).map(|i| flat(i, 100.0)).collect()
    }
}
