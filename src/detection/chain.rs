//! Sequential chain detection.
//!
//! One pass over the bars keeps at most one open block per level. On each
//! bar the detector, in order:
//!
//! 1. tries successor entries for levels 2..=depth, ascending. A level with
//!    no open block may attach to the open block one level below (which then
//!    ends the previous bar with `successor_started`) or to the most recently
//!    finished block one level below that has no successor yet;
//! 2. updates the peak of every other open block and evaluates its exit;
//! 3. tries a Block1 entry when Block1 is neither open nor touched this bar
//!    and no successor started on it.
//!
//! A successor start therefore dominates a same-bar exit of its predecessor,
//! and a bar never starts both a successor and a new chain.
//! Blocks still open after the last bar end with `data_end`.

use std::collections::HashMap;

use tracing::{debug, info, trace, warn};

use crate::{
    condition::{BlockCondition, ConditionSet},
    series::{RollingContext, Series},
    BlockDetection, BlockId, BlockLevel, Chain, ExitReason, Provenance, Result, OHLCV,
};

use super::{
    evaluator::{evaluate_entry, evaluate_exit, EntryLink, Predecessor},
    peak::OpenBlock,
    window::{check_forward, check_lookback},
};

/// Most recently finished block of a level.
#[derive(Debug, Clone, Copy)]
struct Finished {
    id: BlockId,
    link: Predecessor,
    has_child: bool,
}

#[derive(Debug, Default)]
struct LevelState {
    open: Option<OpenBlock>,
    last_finished: Option<Finished>,
    last_start: Option<usize>,
}

/// Seed-mode detector over a [`ConditionSet`].
#[derive(Debug, Clone, Copy)]
pub struct ChainDetector<'c> {
    conditions: &'c ConditionSet,
}

impl<'c> ChainDetector<'c> {
    pub fn new(conditions: &'c ConditionSet) -> Self {
        Self { conditions }
    }

    /// Detect every chain in `series`, ordered by root start.
    ///
    /// # Errors
    /// Config errors only: invalid or contradictory thresholds, or a window
    /// longer than the series. Per-bar insufficient history is not an error.
    pub fn detect(&self, series: &Series) -> Result<Vec<Chain>> {
        self.conditions.validate()?;
        if series.is_empty() {
            return Ok(Vec::new());
        }
        self.conditions.validate_against(series.len())?;

        let records = Scan::new(self.conditions, series).run();
        let chains = assemble(series.ticker(), records);
        info!(
            ticker = series.ticker(),
            bars = series.len(),
            chains = chains.len(),
            "seed detection finished"
        );
        Ok(chains)
    }
}

/// Mutable state of one detection pass.
struct Scan<'a> {
    conditions: &'a ConditionSet,
    series: &'a Series,
    levels: Vec<LevelState>,
    records: Vec<BlockDetection>,
    next_id: usize,
}

impl<'a> Scan<'a> {
    fn new(conditions: &'a ConditionSet, series: &'a Series) -> Self {
        Self {
            conditions,
            series,
            levels: (0..conditions.depth()).map(|_| LevelState::default()).collect(),
            records: Vec::new(),
            next_id: 0,
        }
    }

    fn run(mut self) -> Vec<BlockDetection> {
        for index in 0..self.series.len() {
            self.step(index);
        }
        if let Some(last) = self.series.len().checked_sub(1) {
            for k in 0..self.levels.len() {
                if let Some(open) = self.levels[k].open.take() {
                    self.close(open, last, ExitReason::DataEnd);
                }
            }
        }
        self.records
    }

    fn step(&mut self, index: usize) {
        let series = self.series;
        let ctx = series.context_at(index);
        let mut touched = [false; 4];
        let mut successor_started = false;

        // successors
        for k in 1..self.levels.len() {
            if self.levels[k].open.is_none() {
                successor_started |= self.try_successor(&ctx, k, &mut touched);
            }
        }

        // own exits
        for k in 0..self.levels.len() {
            if touched[k] {
                continue;
            }
            let condition = &self.conditions.blocks[k];
            let reason = match self.levels[k].open.as_mut() {
                Some(open) => {
                    open.track(index, ctx.bar());
                    evaluate_exit(&ctx, open, condition)
                }
                None => continue,
            };
            if let Some(reason) = reason {
                if let Some(open) = self.levels[k].open.take() {
                    self.close(open, index, reason);
                    touched[k] = true;
                }
            }
        }

        // root
        if self.levels[0].open.is_none() && !touched[0] && !successor_started {
            let link = EntryLink {
                predecessor: None,
                last_start: self.levels[0].last_start,
            };
            if entry_fires(&ctx, &self.conditions.blocks[0], &link, BlockLevel::Block1) {
                self.open(&ctx, 0, None);
            }
        }
    }

    /// Attach a level `k` block to level `k - 1` at this bar if it qualifies.
    /// Returns whether the block was opened.
    fn try_successor(&mut self, ctx: &RollingContext<'_>, k: usize, touched: &mut [bool; 4]) -> bool {
        let index = ctx.index();
        let below = &self.levels[k - 1];
        let (pred_id, pred, pred_open) = match (&below.open, &below.last_finished) {
            (Some(open), _) if open.start_index < index => (open.id, Predecessor::from(open), true),
            (Some(_), _) => return false,
            (None, Some(finished)) if !finished.has_child => (finished.id, finished.link, false),
            (None, _) => return false,
        };

        let level = BlockLevel::ALL[k];
        let condition = &self.conditions.blocks[k];
        let date = ctx.bar().date;
        let pred_start = self.series.bars()[pred.start_index].date;
        if !check_forward(
            self.series,
            pred_start,
            date,
            condition.min_candles_after,
            condition.max_candles_after,
        ) {
            return false;
        }
        if !check_lookback(
            self.series,
            date,
            Some(pred_start),
            condition.lookback_min,
            condition.lookback_max,
        ) {
            trace!(%level, index, "outside lookback window");
            return false;
        }
        let link = EntryLink {
            predecessor: Some(pred),
            last_start: self.levels[k].last_start,
        };
        if !entry_fires(ctx, condition, &link, level) {
            return false;
        }

        if pred_open {
            if let Some(open) = self.levels[k - 1].open.take() {
                debug!(
                    level = %open.level,
                    id = open.id.0,
                    successor = %level,
                    index,
                    "transition to successor"
                );
                // start_index < index checked above
                self.close(open, index - 1, ExitReason::SuccessorStarted);
                touched[k - 1] = true;
            }
        }
        if let Some(finished) = self.levels[k - 1].last_finished.as_mut() {
            finished.has_child = true;
        }
        self.open(ctx, k, Some(pred_id));
        touched[k] = true;
        true
    }

    fn open(&mut self, ctx: &RollingContext<'_>, k: usize, predecessor: Option<BlockId>) {
        let index = ctx.index();
        let bar = ctx.bar();
        let level = BlockLevel::ALL[k];
        let id = BlockId(self.next_id);
        self.next_id += 1;
        if bar.volume() <= 0.0 {
            warn!(ticker = self.series.ticker(), %level, date = %bar.date, "block opened on a zero-volume bar");
        }
        debug!(%level, id = id.0, date = %bar.date, "block opened");
        self.levels[k].open = Some(OpenBlock::open(id, level, index, bar, predecessor));
        self.levels[k].last_start = Some(index);
    }

    fn close(&mut self, open: OpenBlock, end_index: usize, reason: ExitReason) {
        let k = open.level.index();
        let finished = Finished {
            id: open.id,
            link: Predecessor::from(&open),
            has_child: reason == ExitReason::SuccessorStarted,
        };
        let record = open.finalize(self.series, end_index, reason);
        debug!(
            level = %record.level,
            id = record.id.0,
            ended_at = %record.ended_at,
            reason = %reason,
            "block closed"
        );
        self.levels[k].last_finished = Some(finished);
        self.records.push(record);
    }
}

fn entry_fires(ctx: &RollingContext<'_>, condition: &BlockCondition, link: &EntryLink, level: BlockLevel) -> bool {
    match evaluate_entry(ctx, condition, link) {
        Ok(fired) => fired,
        Err(e) => {
            trace!(%level, index = ctx.index(), error = %e, "entry skipped");
            false
        }
    }
}

/// Group finished blocks into chains by following predecessor links.
fn assemble(ticker: &str, mut records: Vec<BlockDetection>) -> Vec<Chain> {
    records.sort_by_key(|r| r.id);
    let child_of: HashMap<BlockId, usize> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.predecessor_id.map(|p| (p, i)))
        .collect();

    let mut chains: Vec<Chain> = records
        .iter()
        .filter(|r| r.predecessor_id.is_none())
        .map(|root| {
            let mut blocks = vec![root.clone()];
            let mut current = root.id;
            while let Some(&i) = child_of.get(&current) {
                blocks.push(records[i].clone());
                current = records[i].id;
            }
            Chain {
                ticker: ticker.to_string(),
                blocks,
                provenance: Provenance::seed(),
            }
        })
        .collect();
    chains.sort_by_key(|c| c.root().started_at);
    chains
}
